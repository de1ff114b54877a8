//! Time parsing and formatting utilities

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{TimemarkError, TimemarkResult};

/// Accepted layouts for a watermark anchor
const ANCHOR_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Layout used in generated file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Parse a calendar date+time used to seed the overlay clock
///
/// A bare date is taken as midnight.
pub fn parse_anchor(value: &str) -> TimemarkResult<NaiveDateTime> {
    let value = value.trim();

    for format in ANCHOR_FORMATS {
        if let Ok(anchor) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(anchor);
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }

    Err(TimemarkError::InvalidTimeFormat {
        time: value.to_string(),
    })
}

/// Format a duration as `HH:MM:SS.CC`
pub fn format_clock(duration: Duration) -> String {
    let total_centis = duration.as_millis() / 10;
    let centis = total_centis % 100;
    let total_seconds = total_centis / 100;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anchor_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_anchor("2024-01-01 00:00:00").unwrap(), expected);
        assert_eq!(parse_anchor("2024-01-01T00:00:00").unwrap(), expected);
        assert_eq!(parse_anchor("2024-01-01").unwrap(), expected);
        assert_eq!(parse_anchor(" 2024/01/01 00:00:00 ").unwrap(), expected);
    }

    #[test]
    fn test_parse_anchor_rejects_garbage() {
        assert!(matches!(
            parse_anchor("yesterday"),
            Err(TimemarkError::InvalidTimeFormat { .. })
        ));
        assert!(parse_anchor("2024-13-01 00:00:00").is_err());
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_millis(3_723_450)), "01:02:03.45");
        assert_eq!(format_clock(Duration::ZERO), "00:00:00.00");
    }
}
