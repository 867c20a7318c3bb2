//! Time source for first-observation timestamps.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use cashwatch_core::{Error, Result};

/// `MM/DD/YYYY, HH:MM:SS`, e.g. `03/14/2025, 09:26:53`.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %H:%M:%S";

/// Injectable "now". The merge engine reads it once per call.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock rendered in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Central European standard time, `+01:00`.
    pub fn central_european() -> Self {
        Self::new(FixedOffset::east_opt(3600).expect("one hour is a valid offset"))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::central_european()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }

    /// Convenience constructor in UTC+01:00. Panics on an impossible date.
    pub fn at_cet(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        let offset = FixedOffset::east_opt(3600).expect("one hour is a valid offset");
        let at = offset
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .expect("valid calendar date");
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid_offset(raw));
    }

    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(invalid_offset(raw)),
    };
    let [h1, h2, m1, m2] = match rest.as_bytes() {
        [h1, h2, b':', m1, m2] | [h1, h2, m1, m2] => [*h1, *h2, *m1, *m2],
        _ => return Err(invalid_offset(raw)),
    };
    if ![h1, h2, m1, m2].iter().all(u8::is_ascii_digit) {
        return Err(invalid_offset(raw));
    }

    let hours = i32::from(h1 - b'0') * 10 + i32::from(h2 - b'0');
    let minutes = i32::from(m1 - b'0') * 10 + i32::from(m2 - b'0');
    if minutes >= 60 {
        return Err(invalid_offset(raw));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| invalid_offset(raw))
}

fn invalid_offset(raw: &str) -> Error {
    Error::Config(format!("invalid UTC offset: {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let clock = FixedClock::at_cet(2025, 3, 14, 9, 26, 53);
        assert_eq!(format_timestamp(&clock.now()), "03/14/2025, 09:26:53");
    }

    #[test]
    fn test_system_clock_uses_offset() {
        let clock = SystemClock::central_european();
        assert_eq!(clock.now().offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(parse_utc_offset("+01:00").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_utc_offset("-0530").unwrap().local_minus_utc(), -19800);
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_offset_rejects_garbage() {
        assert!(parse_utc_offset("CET").is_err());
        assert!(parse_utc_offset("+1").is_err());
        assert!(parse_utc_offset("+01:75").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("+0:1:0:0").is_err());
        assert!(parse_utc_offset("+0100:").is_err());
        assert!(parse_utc_offset("+01::00").is_err());
        assert!(parse_utc_offset("+010:0").is_err());
    }
}
