//! Sensor drivers and the station's consolidated reading

pub mod dps310;
pub mod hdc1000;
pub mod light;
pub mod manager;
pub mod veml6070;

use core::fmt::Write;
use core::future::Future;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::storage::RecordWriter;

pub use dps310::Dps310;
pub use hdc1000::Hdc1000;
pub use light::{LightSensor, LightSensorKind};
pub use manager::{SensorManager, SnapshotSource};
pub use veml6070::Veml6070;

/// Sea-level reference used for the barometric altitude, in hPa.
pub const DEFAULT_SEA_LEVEL_HPA: f32 = 1013.0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: bus transfer failed during {operation}")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: unexpected device id {found:#06x}")]
    UnexpectedId { sensor: &'static str, found: u16 },
    #[error("{sensor}: timed out waiting for {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: not initialized")]
    NotInitialized { sensor: &'static str },
}

/// A driver that needs a one-time bring-up and then produces typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Reading;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check the device ID and configure it.
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Take one measurement.
    fn read(&mut self) -> impl Future<Output = Result<Self::Reading, SensorError>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateReading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PressureReading {
    pub pressure_hpa: f32,
    pub temperature_celsius: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UvReading {
    /// Raw 16-bit count from the sensor.
    pub counts: u16,
    /// Irradiance in µW/cm².
    pub microwatts_per_cm2: f32,
}

/// One consolidated, timestamped set of all sensor readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
    pub altitude_m: f32,
    pub illuminance_lux: u32,
    pub uv_microwatts_per_cm2: f32,
    /// Seconds, either Unix time or uptime when the clock was never synced.
    pub timestamp: u64,
}

impl SensorSnapshot {
    /// Append this snapshot as one CSV log row, led by `timestamp`.
    pub fn write_csv_row<W: Write>(&self, out: &mut W, timestamp: &str) -> core::fmt::Result {
        let mut row = RecordWriter::new(out);
        row.field(timestamp)?;
        row.field(format_args!("{:.2}", self.temperature_celsius))?;
        row.field(format_args!("{:.2}", self.humidity_percent))?;
        row.field(format_args!("{:.2}", self.pressure_hpa))?;
        row.field(format_args!("{:.2}", self.altitude_m))?;
        row.field(self.illuminance_lux)?;
        row.field(format_args!("{:.2}", self.uv_microwatts_per_cm2))?;
        row.finish().map(|_| ())
    }
}

/// International barometric formula.
pub fn altitude_from_pressure(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44_330.0 * (1.0 - libm::powf(pressure_hpa / sea_level_hpa, 0.1903))
}
