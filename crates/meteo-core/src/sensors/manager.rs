//! Sensor aggregation

use core::future::Future;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info, warn};

use super::{
    ClimateReading, DEFAULT_SEA_LEVEL_HPA, LightSensor, PressureReading, Sensor, SensorSnapshot,
    UvReading, altitude_from_pressure,
};

/// Anything that can produce timestamped station snapshots.
pub trait SnapshotSource {
    /// Bring up all sensors. `true` when every mandatory sensor came up.
    fn initialize(&mut self) -> impl Future<Output = bool>;

    /// Read every sensor once and stamp the result with `timestamp`.
    fn read_data(&mut self, timestamp: u64) -> impl Future<Output = SensorSnapshot>;
}

/// Owns the station's four sensors and combines their readings.
///
/// Initialization is best-effort: every driver is brought up even when an
/// earlier one failed. Individual read failures are logged and leave their
/// fields at zero, so a snapshot is always produced.
pub struct SensorManager<H, P, U, I, D> {
    climate: H,
    barometer: P,
    uv: U,
    light: LightSensor<I, D>,
    sea_level_hpa: f32,
}

impl<H, P, U, I, D> SensorManager<H, P, U, I, D>
where
    H: Sensor<Reading = ClimateReading>,
    P: Sensor<Reading = PressureReading>,
    U: Sensor<Reading = UvReading>,
    I: I2c,
    D: DelayNs,
{
    pub fn new(climate: H, barometer: P, uv: U, light: LightSensor<I, D>) -> Self {
        Self {
            climate,
            barometer,
            uv,
            light,
            sea_level_hpa: DEFAULT_SEA_LEVEL_HPA,
        }
    }

    /// Reference pressure for the altitude estimate.
    pub fn with_sea_level(mut self, sea_level_hpa: f32) -> Self {
        self.sea_level_hpa = sea_level_hpa;
        self
    }

    pub fn light(&self) -> &LightSensor<I, D> {
        &self.light
    }
}

async fn init_logged<S: Sensor>(sensor: &mut S) -> bool {
    match sensor.init().await {
        Ok(()) => true,
        Err(e) => {
            error!("{} not detected: {}", sensor.name(), e);
            false
        }
    }
}

async fn read_logged<S: Sensor>(sensor: &mut S) -> Option<S::Reading> {
    sensor
        .read()
        .await
        .map_err(|e| warn!("{} read failed: {}", sensor.name(), e))
        .ok()
}

impl<H, P, U, I, D> SnapshotSource for SensorManager<H, P, U, I, D>
where
    H: Sensor<Reading = ClimateReading>,
    P: Sensor<Reading = PressureReading>,
    U: Sensor<Reading = UvReading>,
    I: I2c,
    D: DelayNs,
{
    async fn initialize(&mut self) -> bool {
        let climate = init_logged(&mut self.climate).await;
        let barometer = init_logged(&mut self.barometer).await;

        // Always settles on a family, so it does not count towards success
        let kind = self.light.begin().await;
        debug!("Light sensor family: {:?}", kind);

        let uv = init_logged(&mut self.uv).await;

        let success = climate && barometer && uv;
        if success {
            info!("All sensors initialized");
        }
        success
    }

    async fn read_data(&mut self, timestamp: u64) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot {
            timestamp,
            ..SensorSnapshot::default()
        };

        if let Some(pressure) = read_logged(&mut self.barometer).await {
            debug!(
                "{}: {:.2} hPa at {:.2}°C",
                self.barometer.name(),
                pressure.pressure_hpa,
                pressure.temperature_celsius
            );
            snapshot.pressure_hpa = pressure.pressure_hpa;
            snapshot.altitude_m = altitude_from_pressure(pressure.pressure_hpa, self.sea_level_hpa);
        }

        if let Some(climate) = read_logged(&mut self.climate).await {
            snapshot.temperature_celsius = climate.temperature_celsius;
            snapshot.humidity_percent = climate.humidity_percent;
        }

        snapshot.illuminance_lux = self.light.illuminance().await;

        if let Some(uv) = read_logged(&mut self.uv).await {
            snapshot.uv_microwatts_per_cm2 = uv.microwatts_per_cm2;
        }

        snapshot
    }
}
