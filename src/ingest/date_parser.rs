use chrono::{NaiveDate, NaiveDateTime};

/// Slow-path layouts tried after the fixed-width fast path fails.
const FALLBACK_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a naive trip timestamp into microseconds since the epoch, treating
/// the wall-clock value as UTC.
///
/// Fast path: `YYYY-MM-DD HH:MM:SS[.ffffff]`, also with `/` date separators
/// or a `T` between date and time. Falls back to [`FALLBACK_FORMATS`], then
/// to a bare `YYYY-MM-DD` at midnight.
pub fn parse_timestamp_micros(s: &str) -> Option<i64> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    if let Some(dt) = parse_fixed_width(s) {
        return Some(dt.and_utc().timestamp_micros());
    }
    for fmt in FALLBACK_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_micros())
}

fn parse_fixed_width(s: &str) -> Option<NaiveDateTime> {
    let b = s.as_bytes();
    // minimal length + separators check
    if b.len() < 19 {
        return None;
    }
    let date_sep = b[4];
    if !matches!(date_sep, b'-' | b'/') || b[7] != date_sep {
        return None;
    }
    if !matches!(b[10], b' ' | b'T') || b[13] != b':' || b[16] != b':' {
        return None;
    }
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(5..7)?.parse().ok()?;
    let day: u32 = s.get(8..10)?.parse().ok()?;
    let hour: u32 = s.get(11..13)?.parse().ok()?;
    let min: u32 = s.get(14..16)?.parse().ok()?;
    let sec: u32 = s.get(17..19)?.parse().ok()?;

    // optional fractional seconds, up to 6 digits
    let mut micros = 0u32;
    if b.len() > 19 {
        if b[19] != b'.' {
            return None;
        }
        let frac = &b[20..];
        if frac.is_empty() || !frac.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let mut factor = 100_000;
        for &d in frac.iter().take(6) {
            micros += (d - b'0') as u32 * factor;
            factor /= 10;
        }
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_micro_opt(hour, min, sec, micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn micros(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .unwrap()
            .timestamp_micros()
    }

    #[test]
    fn test_fast_path_layouts() {
        let want = micros(2013, 9, 1, 0, 2, 34);
        assert_eq!(parse_timestamp_micros("2013-09-01 00:02:34"), Some(want));
        assert_eq!(parse_timestamp_micros("2013/09/01 00:02:34"), Some(want));
        assert_eq!(parse_timestamp_micros("2013-09-01T00:02:34"), Some(want));
        assert_eq!(parse_timestamp_micros("  \"2013-09-01 00:02:34\" "), Some(want));
    }

    #[test]
    fn test_fractional_seconds() {
        let base = micros(2013, 9, 30, 23, 59, 59);
        assert_eq!(
            parse_timestamp_micros("2013-09-30 23:59:59.5"),
            Some(base + 500_000)
        );
        assert_eq!(
            parse_timestamp_micros("2013-09-30 23:59:59.123456789"),
            Some(base + 123_456)
        );
        assert_eq!(parse_timestamp_micros("2013-09-30 23:59:59."), None);
        assert_eq!(parse_timestamp_micros("2013-09-30 23:59:59Z"), None);
    }

    #[test]
    fn test_fallback_layouts() {
        assert_eq!(
            parse_timestamp_micros("09/01/2013 13:05:00"),
            Some(micros(2013, 9, 1, 13, 5, 0))
        );
        assert_eq!(
            parse_timestamp_micros("09/01/2013 13:05"),
            Some(micros(2013, 9, 1, 13, 5, 0))
        );
        assert_eq!(
            parse_timestamp_micros("2013-09-01"),
            Some(micros(2013, 9, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_timestamp_micros(""), None);
        assert_eq!(parse_timestamp_micros("N"), None);
        assert_eq!(parse_timestamp_micros("2013-02-30 00:00:00"), None);
        assert_eq!(parse_timestamp_micros("2013-09-01 24:00:00"), None);
        assert_eq!(parse_timestamp_micros("2013-09-01 0a:00:00"), None);
    }
}
