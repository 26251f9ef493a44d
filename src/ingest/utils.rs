/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Cleaned UTF-8 view of a raw field, or `None` when the field is absent or
/// blank. Blank fields are nulls, not coercion failures.
pub fn non_blank(raw: Option<&[u8]>) -> Option<Result<&str, &[u8]>> {
    let raw = raw?;
    match std::str::from_utf8(raw) {
        Ok(s) => {
            let c = clean_str(s);
            if c.is_empty() {
                None
            } else {
                Some(Ok(c))
            }
        }
        Err(_) if raw.iter().all(u8::is_ascii_whitespace) => None,
        Err(_) => Some(Err(raw)),
    }
}

/// Integer fields accept plain decimals and integral float literals ("1.0").
pub fn parse_int(s: &str) -> Option<i32> {
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

pub fn parse_double(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_str() {
        assert_eq!(clean_str("  1.5 "), "1.5");
        assert_eq!(clean_str("\" N \""), "N");
        assert_eq!(clean_str("\""), "\"");
        assert_eq!(clean_str(""), "");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(&b"   "[..])), None);
        assert_eq!(non_blank(Some(&b"\"\""[..])), None);
        assert_eq!(non_blank(Some(&b" 7 "[..])), Some(Ok("7")));
        assert_eq!(non_blank(Some(&b"\xff"[..])), Some(Err(&b"\xff"[..])));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("2"), Some(2));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("1.0"), Some(1));
        assert_eq!(parse_int("1.5"), None);
        assert_eq!(parse_int("NaN"), None);
        assert_eq!(parse_int("1e12"), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn test_parse_double() {
        assert_eq!(parse_double("-73.952407836914062"), Some(-73.952407836914062));
        assert_eq!(parse_double("0"), Some(0.0));
        assert_eq!(parse_double("x"), None);
    }
}
