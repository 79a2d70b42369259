//! Async I2C bus sharing
//!
//! All four station sensors hang off one two-wire bus. Each driver owns an
//! [`AsyncI2cDevice`] handle; the handles serialize access through an Embassy
//! mutex so a transaction is never interleaved with another driver's.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// Handle onto a shared async I2C bus.
///
/// The lock is held for exactly one `transaction`, so a register write/read
/// pair issued through `write_read` is atomic with respect to other handles.
///
/// # Example
///
/// ```ignore
/// use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
/// use embassy_sync::mutex::Mutex;
/// use static_cell::StaticCell;
///
/// static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, Bus>> = StaticCell::new();
/// let bus = I2C_BUS.init(Mutex::new(i2c));
///
/// let climate = Hdc1000::new(AsyncI2cDevice::new(bus), Delay);
/// let light = LightSensor::new(AsyncI2cDevice::new(bus), Delay);
/// ```
pub struct AsyncI2cDevice<'a, M: RawMutex, T> {
    bus: &'a Mutex<M, T>,
}

impl<'a, M: RawMutex, T> AsyncI2cDevice<'a, M, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<M, T>) -> Self {
        Self { bus }
    }
}

impl<M: RawMutex, T> ErrorType for AsyncI2cDevice<'_, M, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<M: RawMutex, T> I2c for AsyncI2cDevice<'_, M, T>
where
    T: I2c,
{
    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}
