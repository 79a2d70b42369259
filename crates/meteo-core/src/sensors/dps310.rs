//! Infineon DPS310 barometric pressure sensor
//!
//! Runs in continuous pressure + temperature mode at 64 Hz with 64x
//! oversampling. Raw values are compensated with the factory coefficients
//! read once during [`Sensor::init`].

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info};

use super::{PressureReading, Sensor, SensorError};
use crate::bus::RegisterBus;

pub const DEFAULT_ADDRESS: u8 = 0x77;
/// SDO pulled low; the station board uses this one.
pub const ALTERNATE_ADDRESS: u8 = 0x76;

const REG_PSR_B2: u8 = 0x00;
const REG_PRS_CFG: u8 = 0x06;
const REG_TMP_CFG: u8 = 0x07;
const REG_MEAS_CFG: u8 = 0x08;
const REG_CFG_REG: u8 = 0x09;
const REG_RESET: u8 = 0x0C;
const REG_PRODUCT_ID: u8 = 0x0D;
const REG_COEF: u8 = 0x10;
const REG_COEF_SRCE: u8 = 0x28;

const PRODUCT_ID: u8 = 0x10;
const SOFT_RESET: u8 = 0x09;

const MEAS_COEF_RDY: u8 = 0x80;
const MEAS_SENSOR_RDY: u8 = 0x40;
const MEAS_TMP_RDY: u8 = 0x20;
const MEAS_PRS_RDY: u8 = 0x10;
const MEAS_CONTINUOUS_BOTH: u8 = 0x07;

/// 64 measurements per second, 64x oversampling
const RATE_64_PRC_64: u8 = 0x66;
const TMP_EXTERNAL: u8 = 0x80;
/// Result bit-shift is mandatory above 8x oversampling.
const CFG_SHIFT_BOTH: u8 = 0x0C;

/// Compensation scale factor for 64x oversampling.
const SCALE_64X: f32 = 1_040_384.0;

const RESET_MS: u32 = 40;
const READY_POLL_MS: u32 = 10;
const READY_ATTEMPTS: usize = 20;

/// Factory calibration coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coefficients {
    pub c0: i32,
    pub c1: i32,
    pub c00: i32,
    pub c10: i32,
    pub c01: i32,
    pub c11: i32,
    pub c20: i32,
    pub c21: i32,
    pub c30: i32,
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

impl Coefficients {
    /// Unpack the 18 coefficient bytes starting at register 0x10.
    pub fn parse(b: &[u8; 18]) -> Self {
        let byte = |i: usize| u32::from(b[i]);
        let word = |i: usize| sign_extend((byte(i) << 8) | byte(i + 1), 16);

        Self {
            c0: sign_extend((byte(0) << 4) | (byte(1) >> 4), 12),
            c1: sign_extend(((byte(1) & 0x0F) << 8) | byte(2), 12),
            c00: sign_extend((byte(3) << 12) | (byte(4) << 4) | (byte(5) >> 4), 20),
            c10: sign_extend(((byte(5) & 0x0F) << 16) | (byte(6) << 8) | byte(7), 20),
            c01: word(8),
            c11: word(10),
            c20: word(12),
            c21: word(14),
            c30: word(16),
        }
    }

    /// Temperature in °C and pressure in hPa from 24-bit raw results.
    pub fn compensate(&self, raw_pressure: i32, raw_temperature: i32) -> PressureReading {
        let t = raw_temperature as f32 / SCALE_64X;
        let p = raw_pressure as f32 / SCALE_64X;

        let temperature_celsius = self.c0 as f32 * 0.5 + self.c1 as f32 * t;
        let pascal = self.c00 as f32
            + p * (self.c10 as f32 + p * (self.c20 as f32 + p * self.c30 as f32))
            + t * self.c01 as f32
            + t * p * (self.c11 as f32 + p * self.c21 as f32);

        PressureReading {
            pressure_hpa: pascal / 100.0,
            temperature_celsius,
        }
    }
}

pub struct Dps310<I, D> {
    bus: RegisterBus<I>,
    delay: D,
    address: u8,
    coefficients: Option<Coefficients>,
}

impl<I: I2c, D: DelayNs> Dps310<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self {
            bus: RegisterBus::new(i2c),
            delay,
            address,
            coefficients: None,
        }
    }

    async fn read_reg(&mut self, reg: u8, operation: &'static str) -> Result<u8, SensorError> {
        self.bus
            .read_register(self.address, reg)
            .await
            .map_err(|e| {
                error!("DPS310 {} failed: {:?}", operation, e);
                SensorError::Bus {
                    sensor: "DPS310",
                    operation,
                }
            })
    }

    async fn write_reg(
        &mut self,
        reg: u8,
        value: u8,
        operation: &'static str,
    ) -> Result<(), SensorError> {
        self.bus
            .write_register(self.address, reg, value)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "DPS310",
                operation,
            })
    }

    /// Poll MEAS_CFG until all bits in `mask` are set.
    async fn wait_for(&mut self, mask: u8, operation: &'static str) -> Result<(), SensorError> {
        for _ in 0..READY_ATTEMPTS {
            let status = self.read_reg(REG_MEAS_CFG, "read status").await?;
            if status & mask == mask {
                return Ok(());
            }
            self.delay.delay_ms(READY_POLL_MS).await;
        }
        Err(SensorError::Timeout {
            sensor: "DPS310",
            operation,
        })
    }
}

fn raw24(bytes: &[u8]) -> i32 {
    sign_extend(
        (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]),
        24,
    )
}

impl<I: I2c, D: DelayNs> Sensor for Dps310<I, D> {
    type Reading = PressureReading;

    fn name(&self) -> &'static str {
        "DPS310"
    }

    async fn init(&mut self) -> Result<(), SensorError> {
        let id = self.read_reg(REG_PRODUCT_ID, "read product id").await?;
        if id != PRODUCT_ID {
            return Err(SensorError::UnexpectedId {
                sensor: "DPS310",
                found: u16::from(id),
            });
        }

        self.write_reg(REG_RESET, SOFT_RESET, "soft reset").await?;
        self.delay.delay_ms(RESET_MS).await;
        self.wait_for(MEAS_COEF_RDY | MEAS_SENSOR_RDY, "coefficients")
            .await?;

        let mut raw = [0u8; 18];
        self.bus
            .read_registers(self.address, REG_COEF, &mut raw)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "DPS310",
                operation: "read coefficients",
            })?;
        let coefficients = Coefficients::parse(&raw);
        debug!("DPS310 coefficients: {:?}", coefficients);

        // Temperature must be measured with the sensor the coefficients came from
        let source = self.read_reg(REG_COEF_SRCE, "read coefficient source").await? & TMP_EXTERNAL;

        self.write_reg(REG_PRS_CFG, RATE_64_PRC_64, "configure pressure")
            .await?;
        self.write_reg(REG_TMP_CFG, RATE_64_PRC_64 | source, "configure temperature")
            .await?;
        self.write_reg(REG_CFG_REG, CFG_SHIFT_BOTH, "configure result shift")
            .await?;
        self.write_reg(REG_MEAS_CFG, MEAS_CONTINUOUS_BOTH, "start continuous mode")
            .await?;

        self.coefficients = Some(coefficients);
        info!("DPS310: continuous mode at 64Hz, 64x oversampling");
        Ok(())
    }

    async fn read(&mut self) -> Result<PressureReading, SensorError> {
        let coefficients = self
            .coefficients
            .ok_or(SensorError::NotInitialized { sensor: "DPS310" })?;

        self.wait_for(MEAS_TMP_RDY | MEAS_PRS_RDY, "measurement").await?;

        let mut raw = [0u8; 6];
        self.bus
            .read_registers(self.address, REG_PSR_B2, &mut raw)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "DPS310",
                operation: "read results",
            })?;

        Ok(coefficients.compensate(raw24(&raw[0..3]), raw24(&raw[3..6])))
    }
}
