//! Host build of the meteo-rs weather station.
//!
//! Runs the complete station loop, real sensor drivers included, against a
//! simulated I2C bus. Samples go to a CSV file and are served over HTTP:
//!
//! | Path          | Page                         |
//! |---------------|------------------------------|
//! | `/dashboard`  | Sampled history from the log |
//! | anything else | Live readings                |
//!
//! Logging is configured through `RUST_LOG` and defaults to `info`.

mod args;
mod host;
mod server;
mod sim;

use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use log::{info, warn};
use meteo_core::app_state::AppState;
use meteo_core::async_i2c_bus::AsyncI2cDevice;
use meteo_core::config::Config;
use meteo_core::sensors::{Dps310, Hdc1000, LightSensor, SensorManager, Veml6070, dps310};
use meteo_core::time::TimeKeeper;

use args::Args;
use host::{FileLog, StdClock, StdDelay, SystemNetworkTime};
use sim::{LightChip, SimulatedBus};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

fn run() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if let Some(path) = &args.log_file {
        config.station.log_file = path.display().to_string();
    }
    let link_up = !args.offline;

    let chip = LightChip::from(args.light_family);
    info!("Simulated light sensor: {:?}", chip);
    let bus: Mutex<CriticalSectionRawMutex, _> = Mutex::new(SimulatedBus::daylight(chip));

    let sensors = SensorManager::new(
        Hdc1000::new(AsyncI2cDevice::new(&bus), StdDelay),
        Dps310::new(AsyncI2cDevice::new(&bus), StdDelay, dps310::ALTERNATE_ADDRESS),
        Veml6070::new(AsyncI2cDevice::new(&bus), StdDelay),
        LightSensor::new(AsyncI2cDevice::new(&bus), StdDelay),
    )
    .with_sea_level(config.station.sea_level_hpa);

    let time = TimeKeeper::new(
        StdClock::new(),
        SystemNetworkTime::new(link_up),
        config.time.resync_interval_secs * 1000,
        config.time.zone,
    );
    let log = FileLog::new(&config.station.log_file);
    info!("Logging samples to {}", config.station.log_file);

    let mut app = AppState::new(sensors, time, log, &config.station);
    if !block_on(app.start(link_up)) {
        warn!("Starting with missing sensors");
    }

    let listener = TcpListener::bind(("0.0.0.0", config.web.port))
        .with_context(|| format!("failed to bind HTTP port {}", config.web.port))?;

    server::serve(
        &mut app,
        &listener,
        link_up,
        Duration::from_millis(config.web.client_timeout_ms),
    )
    .context("HTTP server stopped")
}

/// Built-in defaults when no file is given.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}
