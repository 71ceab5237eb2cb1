//! Timestamp and duration wire formats
//!
//! Timestamps are RFC 3339 in UTC with seconds resolution
//! (`2024-05-01T12:00:00Z`). Durations use the XSD / ISO 8601 duration
//! notation (`PT4S`, `PT0.8S`, `PT1H30M`).

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

use crate::error::{Error, Result};

/// Render an instant in the wire timestamp format
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a wire timestamp into UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("invalid timestamp '{}': {}", value, e)))
}

/// Render a duration in XSD duration notation, millisecond precision
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = duration.subsec_millis();

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if millis > 0 {
        let fraction = format!("{:03}", millis);
        out.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
    } else if seconds > 0 || (hours == 0 && minutes == 0) {
        out.push_str(&format!("{}S", seconds));
    }
    out
}

/// Parse an XSD duration
///
/// Supports days, hours, minutes and (fractional) seconds. Years and
/// months have no fixed length and are rejected, as are negative values.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || Error::Validation(format!("invalid duration: {}", value));

    let rest = value.strip_prefix('P').ok_or_else(invalid)?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((_, "")) => return Err(invalid()),
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };
    if date_part.is_empty() && time_part.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;

    for (amount, unit) in split_components(date_part).ok_or_else(invalid)? {
        match unit {
            'D' => total += Duration::from_secs(parse_whole(amount).ok_or_else(invalid)? * 86_400),
            _ => return Err(invalid()),
        }
    }

    let mut last_rank = 0;
    for (amount, unit) in split_components(time_part).ok_or_else(invalid)? {
        let rank = match unit {
            'H' => 1,
            'M' => 2,
            'S' => 3,
            _ => return Err(invalid()),
        };
        if rank <= last_rank {
            return Err(invalid());
        }
        last_rank = rank;

        total += match unit {
            'H' => Duration::from_secs(parse_whole(amount).ok_or_else(invalid)? * 3600),
            'M' => Duration::from_secs(parse_whole(amount).ok_or_else(invalid)? * 60),
            _ => parse_seconds(amount).ok_or_else(invalid)?,
        };
    }

    Ok(total)
}

/// Split `1H30M` into `[("1", 'H'), ("30", 'M')]`
fn split_components(s: &str) -> Option<Vec<(&str, char)>> {
    let mut components = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if c.is_ascii_alphabetic() {
            if i == start {
                return None;
            }
            components.push((&s[start..i], c));
            start = i + c.len_utf8();
        }
    }
    if start != s.len() {
        return None;
    }
    Some(components)
}

fn parse_whole(amount: &str) -> Option<u64> {
    if !amount.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    amount.parse().ok()
}

fn parse_seconds(amount: &str) -> Option<Duration> {
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };
    let secs = parse_whole(whole)?;
    if fraction.is_empty() {
        return Some(Duration::from_secs(secs));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits: String = fraction.chars().take(9).collect();
    let nanos: u32 = format!("{:0<9}", digits).parse().ok()?;
    Some(Duration::new(secs, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_is_utc_seconds() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(format_timestamp(t), "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_parse_timestamp_normalizes_offset() {
        let t = parse_timestamp("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(format_timestamp(t), "2024-05-01T12:00:00Z");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(4)), "PT4S");
        assert_eq!(format_duration(Duration::from_millis(800)), "PT0.8S");
        assert_eq!(format_duration(Duration::from_millis(1250)), "PT1.25S");
        assert_eq!(format_duration(Duration::from_secs(90)), "PT1M30S");
        assert_eq!(format_duration(Duration::from_secs(3600)), "PT1H");
        assert_eq!(format_duration(Duration::ZERO), "PT0S");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT4S").unwrap(), Duration::from_secs(4));
        assert_eq!(parse_duration("PT0.8S").unwrap(), Duration::from_millis(800));
        assert_eq!(parse_duration("PT1M30S").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("P1DT1H").unwrap(), Duration::from_secs(90_000));
        assert_eq!(parse_duration("P2D").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_parse_duration_rejects_malformed() {
        for bad in ["", "P", "PT", "4S", "PT4", "PTS", "P1Y", "PT1S1M", "PT-1S", "PT1.xS", "P1H"] {
            assert!(parse_duration(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
