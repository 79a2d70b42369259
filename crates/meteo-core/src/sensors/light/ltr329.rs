//! LTR-329ALS-01 dual-channel ambient light sensor (Family B)

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, info};

use super::LIGHT_SENSOR_ADDRESS;
use crate::bus::RegisterBus;
use crate::sensors::SensorError;

const REG_ALS_CONTR: u8 = 0x80;
const REG_ALS_MEAS_RATE: u8 = 0x85;
const REG_PART_ID: u8 = 0x86;
const REG_ALS_DATA_CH1_0: u8 = 0x88;

const CONTR_ACTIVE: u8 = 0x01;
const CONTR_SW_RESET: u8 = 0x02;

/// Standby to active transition time.
pub const WAKE_MS: u32 = 10;
/// Wait for a fresh integration before sampling the channels.
pub const INTEGRATION_WAIT_MS: u32 = 100;
pub const RETRY_DELAY_MS: u32 = 10;
pub const MAX_READ_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X48 = 6,
    X96 = 7,
}

impl Gain {
    pub const fn factor(self) -> f32 {
        match self {
            Self::X1 => 1.0,
            Self::X2 => 2.0,
            Self::X4 => 4.0,
            Self::X8 => 8.0,
            Self::X48 => 48.0,
            Self::X96 => 96.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationTime {
    Ms100 = 0,
    Ms50 = 1,
    Ms200 = 2,
    Ms400 = 3,
    Ms150 = 4,
    Ms250 = 5,
    Ms300 = 6,
    Ms350 = 7,
}

impl IntegrationTime {
    /// Integration time in units of 100 ms, as used by the lux formula.
    pub const fn factor(self) -> f32 {
        match self {
            Self::Ms100 => 1.0,
            Self::Ms50 => 0.5,
            Self::Ms200 => 2.0,
            Self::Ms400 => 4.0,
            Self::Ms150 => 1.5,
            Self::Ms250 => 2.5,
            Self::Ms300 => 3.0,
            Self::Ms350 => 3.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementRate {
    Ms50 = 0,
    Ms100 = 1,
    Ms200 = 2,
    Ms500 = 3,
    Ms1000 = 4,
    Ms2000 = 5,
}

/// Raw channel counts. CH0 is visible + IR, CH1 is IR only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub ch0: u16,
    pub ch1: u16,
}

pub struct Ltr329<I> {
    bus: RegisterBus<I>,
    gain: Gain,
    integration: IntegrationTime,
}

impl<I: I2c> Ltr329<I> {
    pub fn new(bus: RegisterBus<I>) -> Self {
        Self {
            bus,
            gain: Gain::X1,
            integration: IntegrationTime::Ms100,
        }
    }

    /// Check the part answers. The part id is only logged, never enforced.
    pub async fn begin(&mut self) -> Result<(), SensorError> {
        let part = self
            .bus
            .read_register(LIGHT_SENSOR_ADDRESS, REG_PART_ID)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "LTR-329",
                operation: "read part id",
            })?;
        debug!("LTR-329: part id {:#04x}", part);
        Ok(())
    }

    pub async fn set_control(
        &mut self,
        gain: Gain,
        reset: bool,
        active: bool,
    ) -> Result<(), SensorError> {
        let mut value = (gain as u8) << 2;
        if reset {
            value |= CONTR_SW_RESET;
        }
        if active {
            value |= CONTR_ACTIVE;
        }

        self.bus
            .write_register(LIGHT_SENSOR_ADDRESS, REG_ALS_CONTR, value)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "LTR-329",
                operation: "write control",
            })?;
        self.gain = gain;
        Ok(())
    }

    pub async fn set_measurement_rate(
        &mut self,
        integration: IntegrationTime,
        rate: MeasurementRate,
    ) -> Result<(), SensorError> {
        let value = ((integration as u8) << 3) | rate as u8;
        self.bus
            .write_register(LIGHT_SENSOR_ADDRESS, REG_ALS_MEAS_RATE, value)
            .await
            .map_err(|_| SensorError::Bus {
                sensor: "LTR-329",
                operation: "write measurement rate",
            })?;
        self.integration = integration;
        Ok(())
    }

    /// Switch to active mode, keeping the configured gain.
    pub async fn power_up(&mut self) -> Result<(), SensorError> {
        self.set_control(self.gain, false, true).await
    }

    /// Unity gain, 100 ms integration every 500 ms, then wake up.
    pub async fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), SensorError> {
        self.begin().await?;
        self.set_control(Gain::X1, false, false).await?;
        self.set_measurement_rate(IntegrationTime::Ms100, MeasurementRate::Ms500)
            .await?;
        self.power_up().await?;
        delay.delay_ms(WAKE_MS).await;
        info!("LTR-329: active (gain 1x, 100ms / 500ms)");
        Ok(())
    }

    /// Read both channels. CH1 must be read before CH0 for a coherent pair.
    pub async fn read_channels(&mut self) -> Result<Channels, SensorError> {
        let mut bytes = [0u8; 4];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = self
                .bus
                .read_register(LIGHT_SENSOR_ADDRESS, REG_ALS_DATA_CH1_0 + offset as u8)
                .await
                .map_err(|_| SensorError::Bus {
                    sensor: "LTR-329",
                    operation: "read channel data",
                })?;
        }

        Ok(Channels {
            ch1: u16::from_le_bytes([bytes[0], bytes[1]]),
            ch0: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }

    /// Sample the channels until a positive lux value comes back.
    ///
    /// Returns the last computed value, zero when every attempt failed.
    pub async fn illuminance<D: DelayNs>(&mut self, delay: &mut D) -> u32 {
        delay.delay_ms(INTEGRATION_WAIT_MS).await;

        let mut lux = 0;
        for attempt in 1..=MAX_READ_ATTEMPTS {
            match self.read_channels().await {
                Ok(channels) => match compute_lux(self.gain, self.integration, channels) {
                    Some(value) => {
                        lux = value as u32;
                        if lux > 0 {
                            break;
                        }
                        debug!("LTR-329: attempt {} gave 0 lux", attempt);
                    }
                    None => debug!("LTR-329: attempt {} saturated: {:?}", attempt, channels),
                },
                Err(e) => debug!("LTR-329: attempt {} failed: {}", attempt, e),
            }

            if attempt < MAX_READ_ATTEMPTS {
                delay.delay_ms(RETRY_DELAY_MS).await;
            }
        }

        lux
    }
}

/// Lux from raw channel counts (LTR-329 appendix A).
///
/// `None` when either channel is saturated.
pub fn compute_lux(gain: Gain, integration: IntegrationTime, channels: Channels) -> Option<f32> {
    if channels.ch0 == u16::MAX || channels.ch1 == u16::MAX {
        return None;
    }

    let ch0 = f32::from(channels.ch0);
    let ch1 = f32::from(channels.ch1);
    let sum = ch0 + ch1;
    if sum == 0.0 {
        return Some(0.0);
    }

    let ratio = ch1 / sum;
    let raw = if ratio < 0.45 {
        1.7743 * ch0 + 1.1059 * ch1
    } else if ratio < 0.64 {
        4.2785 * ch0 - 1.9548 * ch1
    } else if ratio < 0.85 {
        0.5926 * ch0 + 0.1185 * ch1
    } else {
        0.0
    };

    Some(raw / gain.factor() / integration.factor())
}
