//! Light sensor auto-detection
//!
//! Two incompatible chips can sit at the same bus address: the TSL45315
//! (Family A) and the LTR-329ALS-01 (Family B). [`LightSensor::begin`] reads
//! the TSL45315 ID register once, configures whichever part was found and
//! from then on dispatches every read to that family's driver.
//!
//! Detection has no negative confirmation: anything that does not look like a
//! TSL45315, including a bus with no sensor on it, is treated as an LTR-329.

pub mod ltr329;
pub mod tsl45315;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::bus::RegisterBus;
use ltr329::Ltr329;
use tsl45315::Tsl45315;

/// Both light sensor families answer on this address.
pub const LIGHT_SENSOR_ADDRESS: u8 = 0x29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightSensorKind {
    /// TSL45315
    FamilyA,
    /// LTR-329ALS-01
    FamilyB,
}

impl LightSensorKind {
    /// Classify the value read from the TSL45315 ID register.
    pub const fn from_id(id: u8) -> Self {
        if id & tsl45315::ID_MASK == tsl45315::ID_PATTERN {
            Self::FamilyA
        } else {
            Self::FamilyB
        }
    }

    pub const fn chip(self) -> &'static str {
        match self {
            Self::FamilyA => "TSL45315",
            Self::FamilyB => "LTR-329",
        }
    }
}

enum Driver<I> {
    Undetected(RegisterBus<I>),
    FamilyA(Tsl45315<I>),
    FamilyB(Ltr329<I>),
    /// Only present between taking the bus and storing the chosen driver.
    Switching,
}

/// Illuminance source over whichever light sensor is fitted.
pub struct LightSensor<I, D> {
    driver: Driver<I>,
    delay: D,
}

impl<I: I2c, D: DelayNs> LightSensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            driver: Driver::Undetected(RegisterBus::new(i2c)),
            delay,
        }
    }

    /// The detected family, `None` until [`begin`](Self::begin) ran.
    pub fn kind(&self) -> Option<LightSensorKind> {
        match self.driver {
            Driver::FamilyA(_) => Some(LightSensorKind::FamilyA),
            Driver::FamilyB(_) => Some(LightSensorKind::FamilyB),
            Driver::Undetected(_) | Driver::Switching => None,
        }
    }

    /// Detect and configure the sensor.
    ///
    /// Only the first call touches the ID register; later calls return the
    /// family chosen then.
    pub async fn begin(&mut self) -> LightSensorKind {
        let id = match &mut self.driver {
            Driver::Undetected(bus) => bus
                .read_register(LIGHT_SENSOR_ADDRESS, tsl45315::ID_REGISTER)
                .await
                .unwrap_or_else(|e| {
                    warn!("Light sensor: ID read failed ({:?}), assuming LTR-329", e);
                    0
                }),
            Driver::FamilyA(_) => return LightSensorKind::FamilyA,
            Driver::FamilyB(_) => return LightSensorKind::FamilyB,
            Driver::Switching => return LightSensorKind::FamilyB,
        };

        let kind = LightSensorKind::from_id(id);
        info!("Light sensor: ID register {:#04x}, using {}", id, kind.chip());
        self.select(kind);

        let configured = match &mut self.driver {
            Driver::FamilyA(tsl) => tsl.configure(&mut self.delay).await,
            Driver::FamilyB(ltr) => ltr.configure(&mut self.delay).await,
            Driver::Undetected(_) | Driver::Switching => Ok(()),
        };
        if let Err(e) = configured {
            error!("Light sensor: {} configuration failed: {}", kind.chip(), e);
        }

        kind
    }

    fn select(&mut self, kind: LightSensorKind) {
        if let Driver::Undetected(bus) = core::mem::replace(&mut self.driver, Driver::Switching) {
            self.driver = match kind {
                LightSensorKind::FamilyA => Driver::FamilyA(Tsl45315::new(bus)),
                LightSensorKind::FamilyB => Driver::FamilyB(Ltr329::new(bus)),
            };
        }
    }

    /// Illuminance in lux. Failures read as zero.
    pub async fn illuminance(&mut self) -> u32 {
        match &mut self.driver {
            Driver::FamilyA(tsl) => tsl.illuminance().await,
            Driver::FamilyB(ltr) => ltr.illuminance(&mut self.delay).await,
            Driver::Undetected(_) | Driver::Switching => {
                warn!("Light sensor: read before detection");
                0
            }
        }
    }
}
