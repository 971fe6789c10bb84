use std::{borrow::Borrow, fmt::Display};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

/// A UTC timestamp with subsecond precision.
///
/// Submission creation times come from store metadata, which (depending on the
/// backend) reports them either as an RFC3339 string or as milliseconds since
/// the Unix epoch. Both are accepted on input; output is always RFC3339.
///
/// # Examples
///
/// ```
/// # use qz_core::models::DateTime;
/// let a = DateTime::parse("2025-05-24T20:58:07.102Z").unwrap();
/// let b = DateTime::from_unix_millis(1_748_120_287_102).unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawDateTime", into = "RawDateTime")]
pub struct DateTime(OffsetDateTime);

impl DateTime {
    /// Parse an RFC3339 timestamp.
    pub fn parse(value: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(value, &Rfc3339).map(Self::from)
    }

    /// Interpret `millis` as milliseconds since the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Result<Self, time::error::ComponentRange> {
        OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000).map(Self::from)
    }

    /// The current system time.
    pub fn now() -> Self {
        OffsetDateTime::now_utc().into()
    }

    /// The underlying `OffsetDateTime`, always at UTC.
    pub fn as_offset(&self) -> OffsetDateTime {
        self.0
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| std::fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl<T: Borrow<OffsetDateTime>> From<T> for DateTime {
    fn from(value: T) -> Self {
        Self(value.borrow().to_offset(UtcOffset::UTC))
    }
}

impl From<DateTime> for OffsetDateTime {
    fn from(value: DateTime) -> Self {
        value.0
    }
}

/// The wire forms a timestamp may take.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RawDateTime {
    /// An RFC3339 string, e.g. `2025-05-24T20:58:07.102Z`
    Text(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    /// Milliseconds since the Unix epoch, as produced by `Date.now()`
    Millis(i64),
}

impl TryFrom<RawDateTime> for DateTime {
    type Error = time::error::ComponentRange;

    fn try_from(value: RawDateTime) -> Result<Self, Self::Error> {
        match value {
            RawDateTime::Text(datetime) => Ok(datetime.into()),
            RawDateTime::Millis(millis) => Self::from_unix_millis(millis),
        }
    }
}

impl From<DateTime> for RawDateTime {
    fn from(value: DateTime) -> Self {
        RawDateTime::Text(value.0)
    }
}
