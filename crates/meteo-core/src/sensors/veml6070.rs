//! Vishay VEML6070 UVA light sensor
//!
//! The part has no register map. It occupies three bus addresses: commands are
//! written to, and the low byte read from, 0x38; the high byte is read from
//! 0x39; reading 0x0C (the SMBus alert response address) clears a pending ACK.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{info, warn};

use super::{Sensor, SensorError, UvReading};

const ADDR_COMMAND_LSB: u8 = 0x38;
const ADDR_MSB: u8 = 0x39;
const ADDR_ALERT_RESPONSE: u8 = 0x0C;

/// Integration time field of the command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationTime {
    Half = 0,
    T1 = 1,
    T2 = 2,
    T4 = 3,
}

impl IntegrationTime {
    /// Conversion time with the 270 kΩ RSET resistor.
    pub const fn millis(self) -> u32 {
        match self {
            Self::Half => 63,
            Self::T1 => 125,
            Self::T2 => 250,
            Self::T4 => 500,
        }
    }
}

/// Bit 1 of the command byte must always be written as one.
const COMMAND_RESERVED: u8 = 0x02;

/// µW/cm² per count at 1T with RSET = 270 kΩ.
pub const MICROWATTS_PER_COUNT: f32 = 5.625;

pub struct Veml6070<I, D> {
    i2c: I,
    delay: D,
    integration: IntegrationTime,
    initialized: bool,
}

impl<I: I2c, D: DelayNs> Veml6070<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            integration: IntegrationTime::T1,
            initialized: false,
        }
    }

    const fn command(&self) -> u8 {
        ((self.integration as u8) << 2) | COMMAND_RESERVED
    }

    async fn read_byte(&mut self, address: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(address, &mut buf)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "VEML6070",
                operation: "read counts",
            })?;
        Ok(buf[0])
    }
}

/// Scale raw counts to irradiance.
pub fn to_microwatts(counts: u16) -> f32 {
    f32::from(counts) * MICROWATTS_PER_COUNT
}

impl<I: I2c, D: DelayNs> Sensor for Veml6070<I, D> {
    type Reading = UvReading;

    fn name(&self) -> &'static str {
        "VEML6070"
    }

    async fn init(&mut self) -> Result<(), SensorError> {
        // Nothing answers here unless an interrupt is pending
        let mut ack = [0u8; 1];
        if let Err(e) = self.i2c.read(ADDR_ALERT_RESPONSE, &mut ack).await {
            warn!("VEML6070: clearing ACK state failed: {:?}", e);
        }

        let command = self.command();
        self.i2c
            .write(ADDR_COMMAND_LSB, &[command])
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "VEML6070",
                operation: "write command",
            })?;
        self.delay.delay_ms(self.integration.millis()).await;

        self.initialized = true;
        info!("VEML6070: continuous mode, {:?}", self.integration);
        Ok(())
    }

    async fn read(&mut self) -> Result<UvReading, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized { sensor: "VEML6070" });
        }

        let high = self.read_byte(ADDR_MSB).await?;
        let low = self.read_byte(ADDR_COMMAND_LSB).await?;
        let counts = u16::from_be_bytes([high, low]);

        Ok(UvReading {
            counts,
            microwatts_per_cm2: to_microwatts(counts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockDelay};
    use embassy_futures::block_on;

    #[test]
    fn test_command_byte() {
        let mut bus = MockBus::new();
        let mut veml = Veml6070::new(&mut bus, MockDelay::new());
        assert_eq!(veml.command(), 0x06);
        veml.integration = IntegrationTime::T4;
        assert_eq!(veml.command(), 0x0E);
    }

    #[test]
    fn test_init_waits_one_integration() {
        let mut bus = MockBus::new();
        let mut delay = MockDelay::new();
        {
            let mut veml = Veml6070::new(&mut bus, &mut delay);
            block_on(veml.init()).unwrap();
        }
        assert_eq!(bus.reads_of(ADDR_ALERT_RESPONSE, 0x00), 1);
        assert_eq!(delay.calls_ms, [125]);
    }

    #[test]
    fn test_read_combines_both_addresses() {
        let mut bus = MockBus::new();
        bus.set(ADDR_MSB, 0x00, 0x01);
        // The command write leaves the 0x38 pointer at the command value
        bus.set(ADDR_COMMAND_LSB, 0x06, 0x02);

        let mut veml = Veml6070::new(&mut bus, MockDelay::new());
        block_on(veml.init()).unwrap();
        let reading = block_on(veml.read()).unwrap();

        assert_eq!(reading.counts, 0x0102);
        assert_eq!(reading.microwatts_per_cm2, 258.0 * 5.625);
    }

    #[test]
    fn test_read_requires_init() {
        let mut bus = MockBus::new();
        let mut veml = Veml6070::new(&mut bus, MockDelay::new());
        assert_eq!(
            block_on(veml.read()),
            Err(SensorError::NotInitialized { sensor: "VEML6070" })
        );
    }

    #[test]
    fn test_bus_failure_during_init() {
        let mut bus = MockBus::new();
        bus.fail_all();
        let mut veml = Veml6070::new(&mut bus, MockDelay::new());
        assert!(matches!(
            block_on(veml.init()),
            Err(SensorError::Bus { .. })
        ));
    }
}
