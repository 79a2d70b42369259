use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::sensors::DEFAULT_SEA_LEVEL_HPA;
use crate::time::{DEFAULT_RESYNC_INTERVAL_MS, DEFAULT_ZONE, Tz};
use crate::web::CLIENT_TIMEOUT_MS;

/// Station configuration. Every field has a default, so an empty document is
/// a valid configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub station: StationConfig,
    pub time: TimeConfig,
    pub web: WebConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    /// Reference pressure for the altitude estimate, hPa.
    pub sea_level_hpa: f32,
    /// Seconds between two saved samples.
    pub save_interval_secs: u64,
    /// Rows shown on the dashboard.
    pub dashboard_points: usize,
    pub log_file: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            sea_level_hpa: DEFAULT_SEA_LEVEL_HPA,
            save_interval_secs: 300,
            dashboard_points: 10,
            log_file: String::from("data.txt"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimeConfig {
    pub resync_interval_secs: u64,
    /// IANA zone name, e.g. `"Europe/Berlin"`.
    pub zone: Tz,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_MS / 1000,
            zone: DEFAULT_ZONE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WebConfig {
    pub port: u16,
    pub client_timeout_ms: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 80,
            client_timeout_ms: CLIENT_TIMEOUT_MS,
        }
    }
}
