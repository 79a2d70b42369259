use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{ClimateReading, Sensor, SensorError};

pub const DEFAULT_ADDRESS: u8 = 0x40;

const REG_TEMPERATURE: u8 = 0x00;
const REG_CONFIG: u8 = 0x02;
const REG_MANUFACTURER_ID: u8 = 0xFE;
const REG_DEVICE_ID: u8 = 0xFF;

const MANUFACTURER_TI: u16 = 0x5449;
const DEVICE_HDC1000: u16 = 0x1000;

/// Soft reset, temperature and humidity acquired in sequence, 14-bit each.
const CONFIG_RESET_SEQUENTIAL: u16 = 0x9000;

const RESET_MS: u32 = 15;
/// Both 14-bit conversions back to back.
const CONVERSION_MS: u32 = 20;

/// TI HDC1000 temperature/humidity sensor
pub struct Hdc1000<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    initialized: bool,
}

impl<I: I2c, D: DelayNs> Hdc1000<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            initialized: false,
        }
    }

    async fn read_u16(&mut self, reg: u8, operation: &'static str) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .await
            .map_err(|e| {
                error!("HDC1000 {} ({:#04x}) failed: {:?}", operation, reg, e);
                SensorError::Bus {
                    sensor: "HDC1000",
                    operation,
                }
            })?;
        Ok(u16::from_be_bytes(buf))
    }
}

/// Convert the raw 16-bit conversion results.
pub fn convert(raw_temperature: u16, raw_humidity: u16) -> ClimateReading {
    ClimateReading {
        temperature_celsius: f32::from(raw_temperature) / 65536.0 * 165.0 - 40.0,
        humidity_percent: f32::from(raw_humidity) / 65536.0 * 100.0,
    }
}

impl<I: I2c, D: DelayNs> Sensor for Hdc1000<I, D> {
    type Reading = ClimateReading;

    fn name(&self) -> &'static str {
        "HDC1000"
    }

    async fn init(&mut self) -> Result<(), SensorError> {
        let manufacturer = self
            .read_u16(REG_MANUFACTURER_ID, "read manufacturer id")
            .await?;
        if manufacturer != MANUFACTURER_TI {
            return Err(SensorError::UnexpectedId {
                sensor: "HDC1000",
                found: manufacturer,
            });
        }
        let device = self.read_u16(REG_DEVICE_ID, "read device id").await?;
        if device != DEVICE_HDC1000 {
            return Err(SensorError::UnexpectedId {
                sensor: "HDC1000",
                found: device,
            });
        }

        let [high, low] = CONFIG_RESET_SEQUENTIAL.to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, high, low])
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "HDC1000",
                operation: "write config",
            })?;
        self.delay.delay_ms(RESET_MS).await;

        self.initialized = true;
        info!("HDC1000: ready");
        Ok(())
    }

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized { sensor: "HDC1000" });
        }

        // Pointing at the temperature register triggers both conversions
        self.i2c
            .write(self.address, &[REG_TEMPERATURE])
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "HDC1000",
                operation: "trigger measurement",
            })?;
        self.delay.delay_ms(CONVERSION_MS).await;

        let mut buf = [0u8; 4];
        self.i2c
            .read(self.address, &mut buf)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "HDC1000",
                operation: "read measurement",
            })?;

        Ok(convert(
            u16::from_be_bytes([buf[0], buf[1]]),
            u16::from_be_bytes([buf[2], buf[3]]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockDelay};
    use embassy_futures::block_on;

    fn hdc_bus() -> MockBus {
        let mut bus = MockBus::new();
        bus.set_block(DEFAULT_ADDRESS, 0xFE, &[0x54, 0x49]);
        bus.set(DEFAULT_ADDRESS, 0xFF, 0x10);
        bus
    }

    #[test]
    fn test_conversion_formulas() {
        let reading = convert(0x6666, 0x8000);
        assert!((reading.temperature_celsius - 26.0).abs() < 0.01);
        assert!((reading.humidity_percent - 50.0).abs() < 0.01);

        let cold = convert(0x0000, 0x0000);
        assert_eq!(cold.temperature_celsius, -40.0);
        assert_eq!(cold.humidity_percent, 0.0);
    }

    #[test]
    fn test_init_checks_ids_and_resets() {
        let mut bus = hdc_bus();
        let mut delay = MockDelay::new();
        {
            let mut hdc = Hdc1000::new(&mut bus, &mut delay);
            block_on(hdc.init()).unwrap();
        }

        assert_eq!(bus.writes(), &[(0x40, 0x02, 0x90), (0x40, 0x03, 0x00)]);
        assert_eq!(delay.calls_ms, [15]);
    }

    #[test]
    fn test_init_rejects_foreign_device() {
        let mut bus = MockBus::new();
        bus.set_block(DEFAULT_ADDRESS, 0xFE, &[0x12, 0x34]);

        let mut hdc = Hdc1000::new(&mut bus, MockDelay::new());
        assert_eq!(
            block_on(hdc.init()),
            Err(SensorError::UnexpectedId {
                sensor: "HDC1000",
                found: 0x1234
            })
        );
    }

    #[test]
    fn test_bus_failure_names_the_step() {
        let mut bus = MockBus::new();
        bus.fail_all();

        let mut hdc = Hdc1000::new(&mut bus, MockDelay::new());
        assert_eq!(
            block_on(hdc.init()),
            Err(SensorError::Bus {
                sensor: "HDC1000",
                operation: "read manufacturer id"
            })
        );
    }

    #[test]
    fn test_device_id_is_checked_after_manufacturer() {
        let mut bus = MockBus::new();
        bus.set_block(DEFAULT_ADDRESS, 0xFE, &[0x54, 0x49]);
        bus.set(DEFAULT_ADDRESS, 0xFF, 0x20);

        let mut hdc = Hdc1000::new(&mut bus, MockDelay::new());
        assert_eq!(
            block_on(hdc.init()),
            Err(SensorError::UnexpectedId {
                sensor: "HDC1000",
                found: 0x2000
            })
        );
    }

    #[test]
    fn test_read_requires_init() {
        let mut bus = hdc_bus();
        let mut hdc = Hdc1000::new(&mut bus, MockDelay::new());
        assert!(matches!(
            block_on(hdc.read()),
            Err(SensorError::NotInitialized { .. })
        ));
    }

    #[test]
    fn test_read_converts_both_channels() {
        let mut bus = hdc_bus();
        let mut hdc = Hdc1000::new(&mut bus, MockDelay::new());
        block_on(hdc.init()).unwrap();
        drop(hdc);

        bus.set_block(DEFAULT_ADDRESS, 0x00, &[0x66, 0x66, 0x80, 0x00]);
        let mut delay = MockDelay::new();
        let mut hdc = Hdc1000::new(&mut bus, &mut delay);
        hdc.initialized = true;

        let reading = block_on(hdc.read()).unwrap();
        assert!((reading.temperature_celsius - 26.0).abs() < 0.01);
        assert!((reading.humidity_percent - 50.0).abs() < 0.01);
        drop(hdc);
        assert_eq!(delay.calls_ms, [20]);
    }
}
