//! Clock string parsing and time ranges.
//!
//! Users type times as `SS`, `MM:SS` or `HH:MM:SS`. Components are not
//! range-checked, so `"1:75"` is 135 seconds.

use crate::error::{Result, SkrivError};
use serde::{Deserialize, Serialize};

/// Parse a clock string into whole seconds.
pub fn parse_time(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let invalid = || SkrivError::InvalidTimeFormat(trimmed.to_string());

    let parts = trimmed
        .split(':')
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<u64>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [s] => (0, 0, *s),
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };

    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(invalid)
}

/// An optional `[start, end)` window into a media file.
///
/// `None` on either side means "from the beginning" or "to the end".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_seconds: Option<u64>,
    pub end_seconds: Option<u64>,
}

impl TimeRange {
    /// The whole file.
    pub fn full() -> Self {
        Self::default()
    }

    /// Parse raw user input for both bounds. Blank strings count as missing.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let parse_bound = |raw: Option<&str>| -> Result<Option<u64>> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                Some(s) => match parse_time(s)? {
                    secs if secs.checked_mul(1000).is_none() => {
                        Err(SkrivError::InvalidTimeFormat(s.to_string()))
                    }
                    secs => Ok(Some(secs)),
                },
                None => Ok(None),
            }
        };

        let range = Self {
            start_seconds: parse_bound(start)?,
            end_seconds: parse_bound(end)?,
        };

        if let (Some(start), Some(end)) = (range.start_seconds, range.end_seconds) {
            if end <= start {
                return Err(SkrivError::InvalidTimeRange { start, end });
            }
        }

        Ok(range)
    }

    /// Start offset in milliseconds, saturating at `u64::MAX`.
    pub fn start_millis(&self) -> Option<u64> {
        self.start_seconds.map(|s| s.saturating_mul(1000))
    }

    /// End offset in milliseconds, saturating at `u64::MAX`.
    pub fn end_millis(&self) -> Option<u64> {
        self.end_seconds.map(|s| s.saturating_mul(1000))
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_bound = |b: Option<u64>, fallback: &str| match b {
            Some(s) => format!("{}s", s),
            None => fallback.to_string(),
        };
        write!(
            f,
            "{} - {}",
            fmt_bound(self.start_seconds, "start"),
            fmt_bound(self.end_seconds, "end")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(parse_time("1:30").unwrap(), 90);
        assert_eq!(parse_time("00:05").unwrap(), 5);
        assert_eq!(parse_time("1:75").unwrap(), 135);
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert_eq!(parse_time("1:02:03").unwrap(), 3723);
        assert_eq!(parse_time(" 0:00:10 ").unwrap(), 10);
    }

    #[test]
    fn test_parse_bare_seconds() {
        assert_eq!(parse_time("45").unwrap(), 45);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", ":", "1:2:3:4", "0:0:0:0:0", "ab:10", "1:x", "-1:30", "1.5:00", "::"] {
            let err = parse_time(input).unwrap_err();
            assert!(
                matches!(err, SkrivError::InvalidTimeFormat(_)),
                "expected InvalidTimeFormat for {:?}, got {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_time("18446744073709551615:00:00").is_err());
    }

    #[test]
    fn test_range_parse() {
        let range = TimeRange::parse(Some("1:00"), Some("2:30")).unwrap();
        assert_eq!(range.start_seconds, Some(60));
        assert_eq!(range.end_seconds, Some(150));
        assert_eq!(range.start_millis(), Some(60_000));
        assert_eq!(range.end_millis(), Some(150_000));

        let open = TimeRange::parse(None, Some("  ")).unwrap();
        assert_eq!(open, TimeRange::full());
    }

    #[test]
    fn test_range_rejects_bounds_too_large_for_millis() {
        let err = TimeRange::parse(Some("99999999999999999"), None).unwrap_err();
        assert!(matches!(err, SkrivError::InvalidTimeFormat(ref s) if s == "99999999999999999"));

        let err = TimeRange::parse(None, Some("18446744073709551:00")).unwrap_err();
        assert!(matches!(err, SkrivError::InvalidTimeFormat(_)));

        let largest = (u64::MAX / 1000).to_string();
        let range = TimeRange::parse(Some(&largest), None).unwrap();
        assert_eq!(range.start_millis(), Some(u64::MAX / 1000 * 1000));
    }

    #[test]
    fn test_millis_saturate_for_constructed_ranges() {
        let range = TimeRange {
            start_seconds: Some(u64::MAX),
            end_seconds: Some(u64::MAX / 2),
        };
        assert_eq!(range.start_millis(), Some(u64::MAX));
        assert_eq!(range.end_millis(), Some(u64::MAX));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let err = TimeRange::parse(Some("2:00"), Some("1:00")).unwrap_err();
        assert!(matches!(err, SkrivError::InvalidTimeRange { start: 120, end: 60 }));
    }

    #[test]
    fn test_range_display() {
        assert_eq!(TimeRange::full().to_string(), "start - end");
        let range = TimeRange { start_seconds: Some(5), end_seconds: None };
        assert_eq!(range.to_string(), "5s - end");
    }
}
