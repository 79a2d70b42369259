//! Single-byte register access over an async I2C bus

use embedded_hal_async::i2c::I2c;

/// Register-addressed view of an I2C bus.
///
/// Every transfer is a write of the register pointer followed by a repeated
/// start read, which is what all sensors on the station accept.
pub struct RegisterBus<I> {
    i2c: I,
}

impl<I: I2c> RegisterBus<I> {
    pub const fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Read one byte from `reg` of the device at `address`.
    pub async fn read_register(&mut self, address: u8, reg: u8) -> Result<u8, I::Error> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(address, &[reg], &mut buf).await?;
        Ok(buf[0])
    }

    /// Read `buf.len()` consecutive registers starting at `reg`.
    ///
    /// Relies on the device auto-incrementing its register pointer.
    pub async fn read_registers(
        &mut self,
        address: u8,
        reg: u8,
        buf: &mut [u8],
    ) -> Result<(), I::Error> {
        self.i2c.write_read(address, &[reg], buf).await
    }

    /// Write one byte `value` to `reg` of the device at `address`.
    pub async fn write_register(&mut self, address: u8, reg: u8, value: u8) -> Result<(), I::Error> {
        self.i2c.write(address, &[reg, value]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;
    use embassy_futures::block_on;

    #[test]
    fn test_read_register_uses_pointer() {
        let mut mock = MockBus::new();
        mock.set(0x29, 0x8A, 0xA4);

        let mut bus = RegisterBus::new(&mut mock);
        assert_eq!(block_on(bus.read_register(0x29, 0x8A)).unwrap(), 0xA4);

        assert_eq!(mock.reads_of(0x29, 0x8A), 1);
    }

    #[test]
    fn test_write_then_burst_read() {
        let mut mock = MockBus::new();
        {
            let mut bus = RegisterBus::new(&mut mock);
            block_on(bus.write_register(0x40, 0x10, 0x11)).unwrap();
            block_on(bus.write_register(0x40, 0x11, 0x22)).unwrap();

            let mut buf = [0u8; 2];
            block_on(bus.read_registers(0x40, 0x10, &mut buf)).unwrap();
            assert_eq!(buf, [0x11, 0x22]);
        }
        assert_eq!(mock.writes(), &[(0x40, 0x10, 0x11), (0x40, 0x11, 0x22)]);
    }

    #[test]
    fn test_errors_propagate() {
        let mut mock = MockBus::new();
        mock.fail_all();

        let mut bus = RegisterBus::new(&mut mock);
        assert!(block_on(bus.read_register(0x29, 0x8A)).is_err());
        assert!(block_on(bus.write_register(0x29, 0x80, 0x03)).is_err());
    }
}
