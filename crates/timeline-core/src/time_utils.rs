use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, TimelineError};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses the timestamp encodings used by the two chat export formats.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse a microsecond Unix epoch, given as a JSON number or a numeric
    /// string, truncated to whole seconds.
    pub fn from_epoch_micros(value: &Value) -> Result<DateTime<Utc>> {
        let micros = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| TimelineError::TimestampParse(value.to_string()))?;

        DateTime::from_timestamp(micros.div_euclid(1_000_000), 0)
            .ok_or_else(|| TimelineError::TimestampParse(value.to_string()))
    }

    /// Parse an ISO 8601 / RFC 3339 timestamp into UTC.
    ///
    /// Strings without an offset are taken to be UTC already.
    pub fn parse_iso(s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f%:z",
            "%Y-%m-%dT%H:%M:%S%.f%z",
            "%Y-%m-%d %H:%M:%S%.f%:z",
        ];
        for fmt in FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(dt.with_timezone(&Utc));
            }
        }

        const NAIVE_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }

        Err(TimelineError::TimestampParse(s.to_string()))
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Converts UTC instants into the timezone used for display.
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// `"auto"` resolves to the system timezone. Unknown names fall back to
    /// UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let resolved = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = resolved.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                resolved
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn convert(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.tz)
    }

    /// `MM/DD HH:MM` in the display timezone, the axis format of the charts.
    pub fn format_short(&self, dt: DateTime<Utc>) -> String {
        self.convert(dt).format("%m/%d %H:%M").to_string()
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }
}
