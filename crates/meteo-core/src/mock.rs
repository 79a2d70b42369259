//! Test doubles for the bus, delay, clock and network time traits

use core::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error, ErrorKind, ErrorType, I2c, Operation};

use crate::time::{Clock, NetworkTime, TimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockError;

impl Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Byte-addressed register map per device address.
///
/// A write sets the device's register pointer to its first byte and stores any
/// following bytes at consecutive registers. A read returns bytes starting at
/// the current pointer without moving it.
#[derive(Default)]
pub(crate) struct MockBus {
    registers: BTreeMap<(u8, u8), u8>,
    pointers: BTreeMap<u8, u8>,
    writes: Vec<(u8, u8, u8)>,
    reads: Vec<(u8, u8)>,
    failing: bool,
}

impl MockBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, address: u8, reg: u8, value: u8) {
        self.registers.insert((address, reg), value);
    }

    pub(crate) fn set_block(&mut self, address: u8, start: u8, values: &[u8]) {
        for (i, value) in values.iter().enumerate() {
            self.set(address, start.wrapping_add(i as u8), *value);
        }
    }

    pub(crate) fn get(&self, address: u8, reg: u8) -> u8 {
        self.registers.get(&(address, reg)).copied().unwrap_or(0)
    }

    /// Every transaction fails from now on.
    pub(crate) fn fail_all(&mut self) {
        self.failing = true;
    }

    pub(crate) fn writes(&self) -> &[(u8, u8, u8)] {
        &self.writes
    }

    /// Number of read operations (successful or not) that started at `reg`.
    pub(crate) fn reads_of(&self, address: u8, reg: u8) -> usize {
        self.reads
            .iter()
            .filter(|(a, r)| *a == address && *r == reg)
            .count()
    }
}

impl ErrorType for MockBus {
    type Error = MockError;
}

impl I2c for MockBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    self.pointers.insert(address, reg);
                    if self.failing {
                        continue;
                    }
                    for (i, value) in data.iter().enumerate() {
                        let target = reg.wrapping_add(i as u8);
                        self.registers.insert((address, target), *value);
                        self.writes.push((address, target, *value));
                    }
                }
                Operation::Read(buf) => {
                    let start = self.pointers.get(&address).copied().unwrap_or(0);
                    self.reads.push((address, start));
                    if self.failing {
                        continue;
                    }
                    for (i, slot) in buf.iter_mut().enumerate() {
                        *slot = self.get(address, start.wrapping_add(i as u8));
                    }
                }
            }
        }

        if self.failing {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

/// Records requested delays instead of waiting.
#[derive(Default)]
pub(crate) struct MockDelay {
    pub(crate) calls_ms: Vec<u32>,
    pub(crate) total_ns: u64,
}

impl MockDelay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    async fn delay_us(&mut self, us: u32) {
        self.total_ns += u64::from(us) * 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls_ms.push(ms);
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

/// Manually advanced millisecond clock.
pub(crate) struct FakeClock(Cell<u64>);

impl FakeClock {
    pub(crate) fn at(ms: u64) -> Self {
        Self(Cell::new(ms))
    }

    pub(crate) fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

/// Network time source whose answer and call count are shared with clones.
#[derive(Clone)]
pub(crate) struct FakeNtp {
    pub(crate) epoch: Rc<Cell<Option<u64>>>,
    pub(crate) calls: Rc<Cell<usize>>,
}

impl FakeNtp {
    pub(crate) fn answering(epoch: u64) -> Self {
        Self {
            epoch: Rc::new(Cell::new(Some(epoch))),
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn silent() -> Self {
        Self {
            epoch: Rc::new(Cell::new(None)),
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl NetworkTime for FakeNtp {
    async fn fetch_epoch(&mut self) -> Result<u64, TimeError> {
        self.calls.set(self.calls.get() + 1);
        self.epoch.get().ok_or(TimeError::NoResponse)
    }
}
