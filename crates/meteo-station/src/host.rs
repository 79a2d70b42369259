//! Host implementations of the station's platform traits

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_hal_async::delay::DelayNs;
use log::debug;
use meteo_core::storage::DataLog;
use meteo_core::time::{Clock, NetworkTime, TimeError};

/// Milliseconds since the station started.
pub struct StdClock {
    started: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Blocks the thread; the station runs a single task.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    async fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Takes the host's wall clock as network time.
pub struct SystemNetworkTime {
    link_up: bool,
}

impl SystemNetworkTime {
    pub fn new(link_up: bool) -> Self {
        Self { link_up }
    }
}

impl NetworkTime for SystemNetworkTime {
    async fn fetch_epoch(&mut self) -> Result<u64, TimeError> {
        if !self.link_up {
            return Err(TimeError::LinkDown);
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs())
            .map_err(|_| TimeError::NoResponse)
    }
}

/// Sample log in a regular file, opened per operation.
pub struct FileLog {
    path: PathBuf,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataLog for FileLog {
    type Error = io::Error;

    fn append_line(&mut self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        debug!("Appended to {}", self.path.display());
        Ok(())
    }

    fn read_all(&mut self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            other => other,
        }
    }

    fn is_empty(&mut self) -> io::Result<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        }
    }
}
