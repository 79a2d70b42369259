//! TSL45315 ambient light sensor (Family A)

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{info, warn};

use super::LIGHT_SENSOR_ADDRESS;
use crate::bus::RegisterBus;
use crate::sensors::SensorError;

const COMMAND: u8 = 0x80;
const REG_CONTROL: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;
const REG_DATA_LOW: u8 = 0x04;
const REG_DATA_HIGH: u8 = 0x05;
const REG_ID: u8 = 0x0A;

/// ID register, addressed through the command bit.
pub const ID_REGISTER: u8 = COMMAND | REG_ID;
/// High nibble of the ID register on every TSL4531x part.
pub const ID_PATTERN: u8 = 0xA0;
pub const ID_MASK: u8 = 0xF0;

const CONTROL_POWER_ON: u8 = 0x03;
/// M=4, T=100 ms
const CONFIG_M4: u8 = 0x02;

/// Lux per count for the M=4 / 100 ms configuration.
pub const LUX_PER_COUNT: u32 = 4;
/// Time for the first 100 ms conversion to land after power on.
pub const SETTLE_MS: u32 = 120;

pub struct Tsl45315<I> {
    bus: RegisterBus<I>,
}

impl<I: I2c> Tsl45315<I> {
    pub fn new(bus: RegisterBus<I>) -> Self {
        Self { bus }
    }

    /// Power on, select M=4 / 100 ms and wait for the first conversion.
    pub async fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), SensorError> {
        self.bus
            .write_register(LIGHT_SENSOR_ADDRESS, COMMAND | REG_CONTROL, CONTROL_POWER_ON)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "TSL45315",
                operation: "power on",
            })?;
        self.bus
            .write_register(LIGHT_SENSOR_ADDRESS, COMMAND | REG_CONFIG, CONFIG_M4)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "TSL45315",
                operation: "write config",
            })?;

        delay.delay_ms(SETTLE_MS).await;
        info!("TSL45315: powered on (M=4, T=100ms)");
        Ok(())
    }

    /// Single read of the 16-bit data registers, scaled to lux.
    ///
    /// A failed register read contributes zero to the result.
    pub async fn illuminance(&mut self) -> u32 {
        let low = self.read_or_zero(REG_DATA_LOW).await;
        let high = self.read_or_zero(REG_DATA_HIGH).await;
        u32::from(u16::from_le_bytes([low, high])) * LUX_PER_COUNT
    }

    async fn read_or_zero(&mut self, reg: u8) -> u8 {
        self.bus
            .read_register(LIGHT_SENSOR_ADDRESS, COMMAND | reg)
            .await
            .unwrap_or_else(|e| {
                warn!("TSL45315: read of register {:#04x} failed: {:?}", reg, e);
                0
            })
    }
}
