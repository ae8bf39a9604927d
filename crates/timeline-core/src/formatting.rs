use chrono::TimeDelta;

/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use timeline_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Format a window width compactly.
///
/// # Examples
///
/// ```
/// use chrono::TimeDelta;
/// use timeline_core::formatting::format_window;
///
/// assert_eq!(format_window(TimeDelta::seconds(45)), "45s");
/// assert_eq!(format_window(TimeDelta::seconds(60)), "1m");
/// assert_eq!(format_window(TimeDelta::seconds(90)), "1m 30s");
/// assert_eq!(format_window(TimeDelta::seconds(5400)), "1h 30m");
/// ```
pub fn format_window(width: TimeDelta) -> String {
    let secs = width.num_seconds().max(0);
    let (hours, mins, rem) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (hours, mins, rem) {
        (0, 0, s) => format!("{}s", s),
        (0, m, 0) => format!("{}m", m),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, 0, _) => format!("{}h", h),
        (h, m, _) => format!("{}h {}m", h, m),
    }
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero.
///
/// # Examples
///
/// ```
/// use timeline_core::formatting::percentage;
///
/// assert!((percentage(50, 200, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0, 0, 2), 0.0);
/// ```
pub fn percentage(part: u64, whole: u64, decimal_places: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = (part as f64 / whole as f64) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = s.len() % 3;
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count_small() {
        assert_eq!(format_count(5), "5");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn test_format_count_exact_thousands() {
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(100_000), "100,000");
    }

    #[test]
    fn test_format_window_hours() {
        assert_eq!(format_window(TimeDelta::hours(2)), "2h");
        assert_eq!(format_window(TimeDelta::minutes(75)), "1h 15m");
    }

    #[test]
    fn test_format_window_zero() {
        assert_eq!(format_window(TimeDelta::zero()), "0s");
    }

    #[test]
    fn test_percentage_rounding() {
        let p = percentage(1, 3, 2);
        assert!((p - 33.33).abs() < 1e-9, "percentage = {p}");
    }

    #[test]
    fn test_percentage_full() {
        assert!((percentage(7, 7, 0) - 100.0).abs() < 1e-9);
    }
}
