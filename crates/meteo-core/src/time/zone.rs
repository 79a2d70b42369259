//! Local wall-clock time from the tz database

use core::fmt::Write;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use chrono_tz::{OffsetComponents, Tz};

/// The station's home zone.
pub const DEFAULT_ZONE: Tz = Tz::Europe__Berlin;

/// `utc` in `zone`, `None` outside chrono's range.
pub fn local_time(zone: Tz, utc: i64) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(utc, 0).map(|instant| instant.with_timezone(&zone))
}

/// Write `DD.MM.YYYY;HH:MM:SS` for `utc` in `zone`.
pub fn write_timestamp<W: Write>(out: &mut W, zone: Tz, utc: i64) -> core::fmt::Result {
    let Some(local) = local_time(zone, utc) else {
        return Err(core::fmt::Error);
    };
    write!(
        out,
        "{:02}.{:02}.{:04};{:02}:{:02}:{:02}",
        local.day(),
        local.month(),
        local.year(),
        local.hour(),
        local.minute(),
        local.second()
    )
}

/// Whether `zone` observes daylight saving time at `utc`.
pub fn is_summer_time_in(zone: Tz, utc: i64) -> bool {
    match DateTime::from_timestamp(utc, 0) {
        Some(instant) => !zone
            .offset_from_utc_datetime(&instant.naive_utc())
            .dst_offset()
            .is_zero(),
        None => false,
    }
}

/// Whether EU summer time is in effect at `utc`.
///
/// Summer time starts on the last Sunday of March at 01:00 UTC and ends on the
/// last Sunday of October at 01:00 UTC.
pub fn is_summer_time(utc: i64) -> bool {
    is_summer_time_in(DEFAULT_ZONE, utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    const JAN_15_2024: i64 = 1_705_320_000;
    const JUL_15_2024: i64 = 1_721_044_800;
    const MAR_31_2024_0100: i64 = 1_711_846_800;
    const OCT_27_2024_0100: i64 = 1_729_990_800;

    fn formatted(zone: Tz, utc: i64) -> String {
        let mut out = String::new();
        write_timestamp(&mut out, zone, utc).unwrap();
        out
    }

    #[test]
    fn test_mid_season() {
        assert!(is_summer_time(JUL_15_2024));
        assert!(!is_summer_time(JAN_15_2024));
    }

    #[test]
    fn test_transition_instants() {
        assert!(!is_summer_time(MAR_31_2024_0100 - 1));
        assert!(is_summer_time(MAR_31_2024_0100));
        assert!(is_summer_time(OCT_27_2024_0100 - 1));
        assert!(!is_summer_time(OCT_27_2024_0100));
    }

    #[test]
    fn test_transitions_move_with_the_year() {
        // 2025: March 30 and October 26
        assert!(!is_summer_time(1_743_296_400 - 1));
        assert!(is_summer_time(1_743_296_400));
        assert!(!is_summer_time(1_761_440_400));
        // The Saturday before
        assert!(!is_summer_time(1_743_210_000));
    }

    #[test]
    fn test_local_format() {
        assert_eq!(formatted(DEFAULT_ZONE, 1_700_000_000), "14.11.2023;23:13:20");
        assert_eq!(formatted(DEFAULT_ZONE, JUL_15_2024), "15.07.2024;14:00:00");
    }

    #[test]
    fn test_wall_clock_jumps_at_transitions() {
        assert_eq!(formatted(DEFAULT_ZONE, MAR_31_2024_0100 - 1), "31.03.2024;01:59:59");
        assert_eq!(formatted(DEFAULT_ZONE, MAR_31_2024_0100), "31.03.2024;03:00:00");
        assert_eq!(formatted(DEFAULT_ZONE, OCT_27_2024_0100 - 1), "27.10.2024;02:59:59");
        assert_eq!(formatted(DEFAULT_ZONE, OCT_27_2024_0100), "27.10.2024;02:00:00");
    }

    #[test]
    fn test_zone_without_summer_time() {
        assert!(!is_summer_time_in(Tz::UTC, JUL_15_2024));
        assert_eq!(formatted(Tz::UTC, JUL_15_2024), "15.07.2024;12:00:00");
    }

    #[test]
    fn test_other_zones_follow_their_own_rules() {
        // US daylight saving time started on March 10 2024, Europe's on March 31
        let mar_20_2024 = 1_710_936_000;
        assert!(is_summer_time_in(Tz::America__New_York, mar_20_2024));
        assert!(!is_summer_time(mar_20_2024));
        assert_eq!(formatted(Tz::America__New_York, mar_20_2024), "20.03.2024;08:00:00");
    }

    #[test]
    fn test_date_rollover_into_new_year() {
        // 2023-12-31 23:30:00 UTC is already January 1st in CET
        assert_eq!(formatted(DEFAULT_ZONE, 1_704_065_400), "01.01.2024;00:30:00");
    }
}
