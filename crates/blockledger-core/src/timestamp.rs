//! Fixed-width UTC block timestamps with second precision.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, SubsecRound, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// `strftime` layout of the wire form (`YYYYMMDDHHmmss`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Length of the wire form.
pub const TIMESTAMP_LEN: usize = 14;

/// Years whose wire form is exactly four digits.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

/// Seconds from the Unix epoch to the genesis time, 1979-09-05 23:09:00 UTC.
const GENESIS_UNIX_SECONDS: i64 = 305_420_940;

/// A UTC point in time truncated to whole seconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, truncated to the second.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }

    /// Wrap a caller-supplied time, dropping sub-second precision.
    ///
    /// Fails for years outside 0000-9999, whose wire form would not be
    /// 14 digits and could not be read back.
    pub fn try_from_datetime<Tz: TimeZone>(time: DateTime<Tz>) -> Result<Self, CoreError> {
        let utc = time.with_timezone(&Utc).trunc_subsecs(0);
        if !YEAR_RANGE.contains(&utc.year()) {
            return Err(CoreError::TimestampOutOfRange(utc.to_rfc3339()));
        }
        Ok(Self(utc))
    }

    /// 1979-09-05 23:09:00 UTC, the time of every genesis block.
    pub(crate) fn genesis() -> Self {
        Self(DateTime::<Utc>::default() + Duration::seconds(GENESIS_UNIX_SECONDS))
    }

    /// Parse the wire form. Exactly 14 ASCII digits forming a valid date-time.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidTimestamp(s.to_string());

        if s.len() != TIMESTAMP_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
        Ok(Self(Utc.from_utc_datetime(&naive)))
    }

    /// The underlying UTC time.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// ISO-8601 rendering for outer boundaries, e.g. `2024-01-02T03:04:05Z`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<DateTime<Utc>> for Timestamp {
    type Error = CoreError;

    fn try_from(time: DateTime<Utc>) -> Result<Self, Self::Error> {
        Self::try_from_datetime(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_parse_and_format() {
        let ts = Timestamp::parse("19790905230900").unwrap();
        assert_eq!(ts.to_string(), "19790905230900");
        assert_eq!(ts.to_rfc3339(), "1979-09-05T23:09:00Z");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Timestamp::parse("1979090523090").is_err());
        assert!(Timestamp::parse("197909052309000").is_err());
        assert!(Timestamp::parse("1979-09-05T23:0").is_err());
        assert!(Timestamp::parse("19791305230900").is_err());
        assert!(Timestamp::parse(" 9790905230900").is_err());
    }

    #[test]
    fn test_truncates_subseconds() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(750);
        let ts = Timestamp::try_from_datetime(time).unwrap();
        assert_eq!(ts.to_string(), "20240102030405");
    }

    #[test]
    fn test_converts_to_utc() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 1, 2, 5, 4, 5).unwrap();
        assert_eq!(
            Timestamp::try_from_datetime(local).unwrap().to_string(),
            "20240102030405"
        );
    }

    #[test]
    fn test_rejects_years_without_four_digits() {
        let far_future = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            Timestamp::try_from(far_future),
            Err(CoreError::TimestampOutOfRange(_))
        ));

        let before_year_zero = Utc.with_ymd_and_hms(-1, 12, 31, 23, 59, 59).unwrap();
        assert!(Timestamp::try_from_datetime(before_year_zero).is_err());
    }

    #[test]
    fn test_range_edges_round_trip() {
        for time in [
            Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap(),
        ] {
            let ts = Timestamp::try_from_datetime(time).unwrap();
            let wire = ts.to_string();
            assert_eq!(wire.len(), TIMESTAMP_LEN);
            assert_eq!(Timestamp::parse(&wire).unwrap(), ts);
        }
    }

    #[test]
    fn test_genesis_time() {
        assert_eq!(Timestamp::genesis().to_string(), "19790905230900");
        assert_eq!(Timestamp::genesis(), Timestamp::parse("19790905230900").unwrap());
    }

    #[test]
    fn test_now_has_fixed_width() {
        assert_eq!(Timestamp::now().to_string().len(), TIMESTAMP_LEN);
    }
}
