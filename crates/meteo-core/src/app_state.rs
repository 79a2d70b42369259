//! Application-wide state and error types for the station

use core::fmt::{self, Write};

use alloc::string::String;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::StationConfig;
use crate::sensors::{SensorSnapshot, SnapshotSource};
use crate::storage::{self, DataLog, sample_history};
use crate::time::{Clock, NetworkTime, Periodic, TimeKeeper};
use crate::web::{Response, Route, render_dashboard, render_live};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    TimeSyncing,
    TimeKnown,
    SensorsRunning,
    /// The last sample could not be saved.
    Error,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(heapless::String<64>),
}

/// Render `message` into a bounded string, dropping whatever does not fit.
pub fn truncated<const N: usize>(message: impl fmt::Display) -> heapless::String<N> {
    struct Truncating<'a, const M: usize>(&'a mut heapless::String<M>);

    impl<const M: usize> Write for Truncating<'_, M> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for c in s.chars() {
                if self.0.push(c).is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    let mut out = heapless::String::new();
    let _ = write!(Truncating(&mut out), "{message}");
    out
}

/// Main application state container
///
/// Ties the sensors, the time keeper and the sample log together. The
/// caller drives it: [`start`](Self::start) once, then
/// [`tick`](Self::tick) from the main loop and
/// [`handle_request`](Self::handle_request) per HTTP client.
pub struct AppState<S, C, N, L> {
    pub run_state: AppRunState,
    pub sensors_ok: bool,
    sensors: S,
    time: TimeKeeper<C, N>,
    log: L,
    save: Periodic,
    dashboard_points: usize,
}

impl<S, C, N, L> AppState<S, C, N, L>
where
    S: SnapshotSource,
    C: Clock,
    N: NetworkTime,
    L: DataLog,
{
    pub fn new(sensors: S, time: TimeKeeper<C, N>, log: L, config: &StationConfig) -> Self {
        let now = time.clock().now_millis();
        Self {
            run_state: AppRunState::Uninitialized,
            sensors_ok: false,
            sensors,
            time,
            log,
            save: Periodic::new(config.save_interval_secs * 1000, now),
            dashboard_points: config.dashboard_points,
        }
    }

    pub fn time(&self) -> &TimeKeeper<C, N> {
        &self.time
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    /// Initial time sync (when the link is up) and sensor bring-up.
    ///
    /// Returns whether every mandatory sensor initialized. The station keeps
    /// running either way.
    pub async fn start(&mut self, link_up: bool) -> bool {
        if link_up {
            self.run_state = AppRunState::TimeSyncing;
            if self.time.sync_time().await {
                self.run_state = AppRunState::TimeKnown;
            } else {
                warn!("Continuing with uptime timestamps");
            }
        } else {
            warn!("Network down, skipping initial time sync");
        }

        self.sensors_ok = self.sensors.initialize().await;
        if !self.sensors_ok {
            warn!("Some sensors failed to initialize");
        }

        self.run_state = AppRunState::SensorsRunning;
        info!("Station running");
        self.sensors_ok
    }

    /// A fresh snapshot stamped with the current timestamp.
    pub async fn poll(&mut self) -> SensorSnapshot {
        let timestamp = self.time.current_timestamp();
        self.sensors.read_data(timestamp).await
    }

    /// Periodic housekeeping: time resync, then a saved sample when due.
    pub async fn tick(&mut self, link_up: bool) -> Result<Option<SensorSnapshot>, AppError> {
        self.time.update(link_up).await;

        let now = self.time.clock().now_millis();
        if !self.save.is_due(now) {
            return Ok(None);
        }
        self.save.mark(now);

        let snapshot = self.poll().await;
        match self.persist(&snapshot) {
            Ok(()) => {
                self.run_state = AppRunState::SensorsRunning;
                Ok(Some(snapshot))
            }
            Err(e) => {
                self.run_state = AppRunState::Error;
                Err(e)
            }
        }
    }

    /// Append `snapshot` to the log under the current local timestamp.
    pub fn persist(&mut self, snapshot: &SensorSnapshot) -> Result<(), AppError> {
        let timestamp = self.time.formatted_timestamp();
        storage::append_sample(&mut self.log, &timestamp, snapshot)
            .map_err(|e| AppError::Storage(truncated(e)))
    }

    pub async fn handle_request(&mut self, route: Route) -> Response {
        match route {
            Route::Live => {
                let snapshot = self.poll().await;
                Response::render("live", |out| render_live(out, &snapshot))
            }
            Route::Dashboard => {
                let history = self.log.read_all().unwrap_or_else(|e| {
                    warn!("Could not read sample log: {}", e);
                    String::new()
                });
                let rows = sample_history(&history, self.dashboard_points);
                Response::render("dashboard", |out| render_dashboard(out, &rows))
            }
        }
    }
}
