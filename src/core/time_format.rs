//! Parsing and display of reminder times
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Clock times (`HH:MM`) and RFC 3339 instants in `resolve_fire_time`
//! - 1.0.0: Relative durations like `30m`, `1h30m`

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Parse a time duration string like "30m", "2h", "1d", "1h30m" into seconds
pub fn parse_duration(time_str: &str) -> Option<i64> {
    let time_str = time_str.trim().to_lowercase();
    let mut total_seconds: i64 = 0;
    let mut current_number = String::new();

    for c in time_str.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if !current_number.is_empty() {
            let value: i64 = current_number.parse().ok()?;
            current_number.clear();

            let unit: i64 = match c {
                's' => 1,
                'm' => 60,
                'h' => 60 * 60,
                'd' => 60 * 60 * 24,
                'w' => 60 * 60 * 24 * 7,
                _ => return None,
            };
            let seconds = value.checked_mul(unit)?;
            total_seconds = total_seconds.checked_add(seconds)?;
        } else {
            return None;
        }
    }

    // Trailing digits without a unit
    if !current_number.is_empty() {
        return None;
    }

    if total_seconds > 0 {
        Some(total_seconds)
    } else {
        None
    }
}

/// Format a duration in seconds into a human-readable string
pub fn format_duration(seconds: i64) -> String {
    let plural = |n: i64| if n == 1 { "" } else { "s" };

    if seconds < 60 {
        format!("{} second{}", seconds, plural(seconds))
    } else if seconds < 3600 {
        let mins = seconds / 60;
        format!("{} minute{}", mins, plural(mins))
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!("{} hour{} {} minute{}", hours, plural(hours), mins, plural(mins))
        } else {
            format!("{} hour{}", hours, plural(hours))
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!("{} day{} {} hour{}", days, plural(days), hours, plural(hours))
        } else {
            format!("{} day{}", days, plural(days))
        }
    }
}

/// Resolve user input into an absolute fire time.
///
/// Accepts a relative duration (`45m`), a clock time (`07:30`, resolved to its
/// next occurrence in `now`'s timezone, rolling over to tomorrow when already
/// passed today) or an RFC 3339 instant.
pub fn resolve_fire_time<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Some(seconds) = parse_duration(input) {
        return now
            .with_timezone(&Utc)
            .checked_add_signed(Duration::try_seconds(seconds)?);
    }

    if let Ok(time) = NaiveTime::parse_from_str(input, "%H:%M") {
        let tz = now.timezone();
        let today = now.date_naive().and_time(time);
        let mut candidate = tz.from_local_datetime(&today).earliest()?;
        if candidate <= *now {
            let tomorrow = (now.date_naive() + Duration::days(1)).and_time(time);
            candidate = tz.from_local_datetime(&tomorrow).earliest()?;
        }
        return Some(candidate.with_timezone(&Utc));
    }

    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Describe an epoch-millisecond instant relative to `now_millis`
pub fn describe_until(fire_at_epoch_millis: i64, now_millis: i64) -> String {
    let diff_seconds = (fire_at_epoch_millis - now_millis) / 1000;
    if diff_seconds > 0 {
        format!("in {}", format_duration(diff_seconds))
    } else {
        "overdue".to_string()
    }
}

/// Render epoch milliseconds as `YYYY-MM-DD HH:MM:SS` UTC
pub fn format_epoch_millis(epoch_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(epoch_millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => epoch_millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(30));
        assert_eq!(parse_duration("30m"), Some(1800));
        assert_eq!(parse_duration("2h"), Some(7200));
        assert_eq!(parse_duration("1d"), Some(86400));
        assert_eq!(parse_duration("1w"), Some(604800));
        assert_eq!(parse_duration("1h30m"), Some(5400));
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("15"), None);
        assert_eq!(parse_duration("07:30"), None);
    }

    #[test]
    fn test_parse_duration_overflow_is_rejected() {
        assert_eq!(parse_duration("99999999999999999w"), None);
        assert_eq!(parse_duration("9223372036854775807s1s"), None);
        assert_eq!(parse_duration("99999999999999999999s"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30 seconds");
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(60), "1 minute");
        assert_eq!(format_duration(120), "2 minutes");
        assert_eq!(format_duration(3600), "1 hour");
        assert_eq!(format_duration(3660), "1 hour 1 minute");
        assert_eq!(format_duration(86400), "1 day");
        assert_eq!(format_duration(90000), "1 day 1 hour");
    }

    #[test]
    fn test_resolve_relative() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let resolved = resolve_fire_time("1h30m", &now).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 10, 13, 30, 0).unwrap());
    }

    #[test]
    fn test_resolve_relative_beyond_calendar_range() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert!(resolve_fire_time("9000000000000s", &now).is_none());
        assert!(resolve_fire_time("99999999999999999w", &now).is_none());
    }

    #[test]
    fn test_resolve_clock_time_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let resolved = resolve_fire_time("18:15", &now).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 10, 18, 15, 0).unwrap());
    }

    #[test]
    fn test_resolve_clock_time_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let resolved = resolve_fire_time("08:00", &now).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap());

        // Exactly now counts as passed
        let resolved = resolve_fire_time("12:00", &now).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_rfc3339() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let resolved = resolve_fire_time("2024-03-12T09:00:00+02:00", &now).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 3, 12, 7, 0, 0).unwrap());
        assert!(resolve_fire_time("next tuesday", &now).is_none());
    }

    #[test]
    fn test_describe_until() {
        assert_eq!(describe_until(3_600_000, 0), "in 1 hour");
        assert_eq!(describe_until(0, 5_000), "overdue");
    }

    #[test]
    fn test_format_epoch_millis() {
        assert_eq!(format_epoch_millis(0), "1970-01-01 00:00:00 UTC");
    }
}
