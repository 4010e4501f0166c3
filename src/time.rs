//! Time values of buckets and objects.
use std::fmt;

use aws_sdk_s3::primitives::DateTime as SdkDateTime;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// wrap of `chrono::Utc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct UtcTime(DateTime<Utc>);

impl UtcTime {
    #[inline]
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns current utc time
    #[inline]
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Build from seconds (and nanoseconds) since the unix epoch.
    pub fn from_timestamp(secs: i64, nanos: u32) -> Option<Self> {
        Utc.timestamp_opt(secs, nanos).single().map(Self)
    }

    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    #[inline]
    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// format date to ISO8601, like`2023-09-10T08:26:43.296Z`
    #[inline]
    pub fn format_time(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl From<DateTime<Utc>> for UtcTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl From<&SdkDateTime> for UtcTime {
    fn from(value: &SdkDateTime) -> Self {
        Self::from_timestamp(value.secs(), value.subsec_nanos()).unwrap_or_else(Self::now)
    }
}

impl Serialize for UtcTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.format_time())
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_time())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::DateTime as SdkDateTime;

    use super::UtcTime;

    #[test]
    fn test_format_time() {
        let t = UtcTime::from_timestamp(1_694_334_403, 296_000_000).unwrap();
        assert_eq!(t.format_time(), "2023-09-10T08:26:43.296Z");
        assert_eq!(t.to_string(), "2023-09-10T08:26:43.296Z");
    }

    #[test]
    fn test_from_sdk() {
        let sdk = SdkDateTime::from_secs_and_nanos(1_694_334_403, 0);
        let t = UtcTime::from(&sdk);
        assert_eq!(t.timestamp(), 1_694_334_403);
    }
}
