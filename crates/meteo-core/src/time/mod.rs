//! Network-corrected wall-clock time
//!
//! [`TimeKeeper`] pairs a monotonic millisecond [`Clock`] with a
//! [`NetworkTime`] source. A successful sync stores the difference between
//! network epoch and local uptime; every later timestamp is uptime plus that
//! offset, so no network round trip is needed per sample.

pub mod zone;

use core::fmt::Write;
use core::future::Future;

use log::{info, warn};
use thiserror_no_std::Error;

pub use chrono_tz::Tz;
pub use zone::{DEFAULT_ZONE, is_summer_time, is_summer_time_in};

/// Default NTP resync interval.
pub const DEFAULT_RESYNC_INTERVAL_MS: u64 = 3_600_000;

/// `DD.MM.YYYY;HH:MM:SS`
pub type Timestamp = heapless::String<24>;

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Uptime from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_millis(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("no response from time server")]
    NoResponse,
    #[error("network link is down")]
    LinkDown,
    #[error("time server error: {0}")]
    Server(heapless::String<64>),
}

/// Source of the current Unix time in seconds, typically an NTP client.
pub trait NetworkTime {
    fn fetch_epoch(&mut self) -> impl Future<Output = Result<u64, TimeError>>;
}

impl<T: NetworkTime + ?Sized> NetworkTime for &mut T {
    fn fetch_epoch(&mut self) -> impl Future<Output = Result<u64, TimeError>> {
        (**self).fetch_epoch()
    }
}

/// Fixed-interval schedule over a millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodic {
    interval_ms: u64,
    last_ms: u64,
}

impl Periodic {
    /// A schedule whose first period starts at `now_ms`.
    pub const fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: now_ms,
        }
    }

    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_ms) >= self.interval_ms
    }

    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }
}

pub struct TimeKeeper<C, N> {
    clock: C,
    network: N,
    offset_ms: i64,
    initialized: bool,
    resync: Periodic,
    zone: Tz,
}

impl<C: Clock, N: NetworkTime> TimeKeeper<C, N> {
    /// Boot counts as the reference point for the first resync.
    pub fn new(clock: C, network: N, resync_interval_ms: u64, zone: Tz) -> Self {
        let now = clock.now_millis();
        Self {
            clock,
            network,
            offset_ms: 0,
            initialized: false,
            resync: Periodic::new(resync_interval_ms, now),
            zone,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// One network time request. Keeps the previous offset on failure.
    pub async fn sync_time(&mut self) -> bool {
        info!("Attempting NTP time sync...");
        match self.network.fetch_epoch().await {
            Ok(epoch_secs) => {
                let now = self.clock.now_millis();
                self.offset_ms = epoch_secs as i64 * 1000 - now as i64;
                self.initialized = true;
                self.resync.mark(now);
                info!("Time sync successful: epoch {}", epoch_secs);
                true
            }
            Err(e) => {
                warn!("Time sync failed: {}", e);
                false
            }
        }
    }

    /// Resync when the link is up and the resync interval has elapsed.
    pub async fn update(&mut self, link_up: bool) -> bool {
        if !link_up || !self.resync.is_due(self.clock.now_millis()) {
            return false;
        }
        self.sync_time().await
    }

    /// Unix seconds once synced, seconds since boot before that.
    pub fn current_timestamp(&self) -> u64 {
        let now = self.clock.now_millis();
        if self.initialized {
            (now as i64 + self.offset_ms).max(0) as u64 / 1000
        } else {
            now / 1000
        }
    }

    /// Local `DD.MM.YYYY;HH:MM:SS`, or `00.00.0000;HH:MM:SS` of uptime before
    /// the first sync.
    pub fn formatted_timestamp(&self) -> Timestamp {
        let mut out = Timestamp::new();
        let written = if self.initialized {
            zone::write_timestamp(&mut out, self.zone, self.current_timestamp() as i64)
        } else {
            let secs = self.clock.now_millis() / 1000;
            write!(
                out,
                "00.00.0000;{:02}:{:02}:{:02}",
                (secs / 3600) % 24,
                (secs / 60) % 60,
                secs % 60
            )
        };
        if written.is_err() {
            warn!("Timestamp did not fit the buffer");
        }
        out
    }

    /// Summer time in the configured zone at the current instant; `false`
    /// until synced.
    pub fn is_summer_time(&self) -> bool {
        self.initialized && is_summer_time_in(self.zone, self.current_timestamp() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeClock, FakeNtp};
    use embassy_futures::block_on;

    const EPOCH: u64 = 1_700_000_000;

    #[test]
    fn test_periodic() {
        let mut schedule = Periodic::new(1000, 500);
        assert!(!schedule.is_due(1499));
        assert!(schedule.is_due(1500));
        schedule.mark(1500);
        assert!(!schedule.is_due(2000));
        // Clock going backwards never fires
        assert!(!schedule.is_due(0));
    }

    #[test]
    fn test_embassy_clock_advances() {
        let clock = EmbassyClock;
        let first = clock.now_millis();
        std::thread::sleep(std::time::Duration::from_millis(3));
        assert!(clock.now_millis() > first);
    }

    #[test]
    fn test_timestamp_before_sync_is_uptime() {
        let clock = FakeClock::at(42_500);
        let keeper = TimeKeeper::new(&clock, FakeNtp::silent(), 3_600_000, DEFAULT_ZONE);
        assert_eq!(keeper.current_timestamp(), 42);
        assert!(!keeper.is_summer_time());
    }

    #[test]
    fn test_timestamp_after_sync_is_epoch_plus_elapsed() {
        let clock = FakeClock::at(10_000);
        let mut keeper =
            TimeKeeper::new(&clock, FakeNtp::answering(EPOCH), 3_600_000, DEFAULT_ZONE);

        assert!(block_on(keeper.sync_time()));
        assert!(keeper.is_initialized());
        assert_eq!(keeper.current_timestamp(), EPOCH);

        clock.advance(61_000);
        assert_eq!(keeper.current_timestamp(), EPOCH + 61);
    }

    #[test]
    fn test_failed_sync_keeps_previous_offset() {
        let clock = FakeClock::at(0);
        let ntp = FakeNtp::answering(EPOCH);
        let mut keeper = TimeKeeper::new(&clock, ntp.clone(), 1000, DEFAULT_ZONE);
        assert!(block_on(keeper.sync_time()));

        ntp.epoch.set(None);
        clock.advance(5_000);
        assert!(!block_on(keeper.sync_time()));
        assert!(keeper.is_initialized());
        assert_eq!(keeper.current_timestamp(), EPOCH + 5);
    }

    #[test]
    fn test_update_waits_for_interval() {
        let clock = FakeClock::at(0);
        let ntp = FakeNtp::answering(EPOCH);
        let mut keeper = TimeKeeper::new(&clock, ntp.clone(), 3_600_000, DEFAULT_ZONE);

        for _ in 0..100 {
            clock.advance(1_000);
            assert!(!block_on(keeper.update(true)));
        }
        assert_eq!(ntp.calls.get(), 0);

        clock.advance(3_500_000);
        assert!(block_on(keeper.update(true)));
        assert_eq!(ntp.calls.get(), 1);

        // The successful sync restarts the interval
        clock.advance(1_000);
        assert!(!block_on(keeper.update(true)));
        assert_eq!(ntp.calls.get(), 1);
    }

    #[test]
    fn test_update_never_syncs_with_link_down() {
        let clock = FakeClock::at(0);
        let ntp = FakeNtp::answering(EPOCH);
        let mut keeper = TimeKeeper::new(&clock, ntp.clone(), 1_000, DEFAULT_ZONE);

        clock.advance(10_000_000);
        assert!(!block_on(keeper.update(false)));
        assert_eq!(ntp.calls.get(), 0);
        assert!(!keeper.is_initialized());
    }

    #[test]
    fn test_failed_resync_is_retried_next_update() {
        let clock = FakeClock::at(0);
        let ntp = FakeNtp::silent();
        let mut keeper = TimeKeeper::new(&clock, ntp.clone(), 1_000, DEFAULT_ZONE);

        clock.advance(1_000);
        assert!(!block_on(keeper.update(true)));
        assert!(!block_on(keeper.update(true)));
        assert_eq!(ntp.calls.get(), 2);
    }

    #[test]
    fn test_formatted_uptime_before_sync() {
        // 25h 3m 9s of uptime
        let clock = FakeClock::at((25 * 3600 + 3 * 60 + 9) * 1000);
        let keeper = TimeKeeper::new(&clock, FakeNtp::silent(), 1_000, DEFAULT_ZONE);
        assert_eq!(keeper.formatted_timestamp().as_str(), "00.00.0000;01:03:09");
    }

    #[test]
    fn test_formatted_local_time_after_sync() {
        let clock = FakeClock::at(0);
        let mut keeper =
            TimeKeeper::new(&clock, FakeNtp::answering(EPOCH), 1_000, DEFAULT_ZONE);
        block_on(keeper.sync_time());
        assert_eq!(keeper.formatted_timestamp().as_str(), "14.11.2023;23:13:20");
    }

    #[test]
    fn test_summer_time_follows_synced_clock() {
        let clock = FakeClock::at(0);
        let mut keeper = TimeKeeper::new(
            &clock,
            FakeNtp::answering(1_721_044_800),
            1_000,
            DEFAULT_ZONE,
        );
        block_on(keeper.sync_time());
        assert!(keeper.is_summer_time());
        assert_eq!(keeper.formatted_timestamp().as_str(), "15.07.2024;14:00:00");
    }

    #[test]
    fn test_configured_zone_drives_local_time() {
        let clock = FakeClock::at(0);
        let mut keeper = TimeKeeper::new(
            &clock,
            FakeNtp::answering(1_721_044_800),
            1_000,
            Tz::America__New_York,
        );
        block_on(keeper.sync_time());
        assert!(keeper.is_summer_time());
        assert_eq!(keeper.formatted_timestamp().as_str(), "15.07.2024;08:00:00");
    }
}
