//! Progress extraction from the transcoder's diagnostic stream

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::ProgressEvent;

/// `time=HH:MM:SS.CC` as printed on ffmpeg status lines
static TIME_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2})\.(\d{2})").expect("time token pattern is valid")
});

/// `HH:MM:SS.CC` fields as whole centiseconds; `None` when out of range
pub(crate) fn clock_centiseconds(hours: &str, minutes: &str, seconds: &str, centis: &str) -> Option<u64> {
    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let centis: u64 = centis.parse().ok()?;
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?
        .checked_mul(100)?
        .checked_add(centis)
}

/// Elapsed media time in whole centiseconds
fn parse_centiseconds(line: &str) -> Option<u64> {
    let caps = TIME_TOKEN.captures(line)?;
    clock_centiseconds(&caps[1], &caps[2], &caps[3], &caps[4])
}

/// Elapsed media time in seconds, if the line carries a time token
pub fn parse_elapsed_seconds(line: &str) -> Option<f64> {
    parse_centiseconds(line).map(|centis| centis as f64 / 100.0)
}

/// Elapsed media time as a duration, if the line carries a time token
pub fn parse_elapsed(line: &str) -> Option<Duration> {
    parse_centiseconds(line)
        .and_then(|centis| centis.checked_mul(10))
        .map(Duration::from_millis)
}

/// Completion percentage, clamped to [0, 100]; zero when the total is unknown
pub fn percent_complete(elapsed_seconds: f64, total: Duration) -> f64 {
    let total_seconds = total.as_secs_f64();
    if total_seconds <= 0.0 {
        return 0.0;
    }
    let percent = 100.0 * elapsed_seconds / total_seconds;
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Convert one diagnostic line into a progress event
///
/// Most lines carry no time token and yield `None`.
pub fn parse_progress(line: &str, total: Duration) -> Option<ProgressEvent> {
    let elapsed = parse_elapsed_seconds(line)?;
    let percent = percent_complete(elapsed, total);
    Some(ProgressEvent::new(percent, format!("processing: {:.1}%", percent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_LINE: &str =
        "frame=  250 fps= 48 q=28.0 size=    1024kB time=00:00:05.00 bitrate=1677.7kbits/s speed=1.9x";

    #[test]
    fn test_recovers_exact_seconds() {
        assert_eq!(parse_elapsed_seconds("time=01:02:03.45"), Some(3723.45));
        assert_eq!(parse_elapsed("time=01:02:03.45"), Some(Duration::from_millis(3_723_450)));
    }

    #[test]
    fn test_status_line_percent() {
        let event = parse_progress(STATUS_LINE, Duration::from_secs(10)).unwrap();
        assert_eq!(event.percent, 50.0);
        assert_eq!(event.message, "processing: 50.0%");
    }

    #[test]
    fn test_lines_without_token_are_ignored() {
        let total = Duration::from_secs(10);
        assert!(parse_progress("Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'a.mp4':", total).is_none());
        assert!(parse_progress("frame=    0 fps=0.0 time=N/A bitrate=N/A", total).is_none());
        assert!(parse_progress("", total).is_none());
    }

    #[test]
    fn test_zero_total_yields_zero() {
        let event = parse_progress(STATUS_LINE, Duration::ZERO).unwrap();
        assert_eq!(event.percent, 0.0);
        assert!(!event.percent.is_nan());
    }

    #[test]
    fn test_clamps_past_the_end() {
        let event = parse_progress("time=00:00:12.00", Duration::from_secs(10)).unwrap();
        assert_eq!(event.percent, 100.0);
    }

    #[test]
    fn test_oversized_hours_are_ignored() {
        let total = Duration::from_secs(10);
        assert!(parse_progress("time=99999999999999999:00:00.00", total).is_none());
        assert!(parse_progress("time=999999999999999999999999:00:00.00", total).is_none());
        assert_eq!(parse_elapsed("time=1844674407370955:00:00.00"), None);
        assert_eq!(parse_elapsed_seconds("time=100:00:00.00"), Some(360_000.0));
    }

    #[test]
    fn test_percent_is_monotonic_and_bounded() {
        let total = Duration::from_millis(7_310);
        let mut previous = 0.0;
        for centis in (0..1_000u64).step_by(7) {
            let line = format!(
                "time=00:{:02}:{:02}.{:02}",
                centis / 6000,
                (centis / 100) % 60,
                centis % 100
            );
            let event = parse_progress(&line, total).unwrap();
            assert!((0.0..=100.0).contains(&event.percent));
            assert!(event.percent >= previous);
            previous = event.percent;
        }
        assert_eq!(previous, 100.0);
    }
}
