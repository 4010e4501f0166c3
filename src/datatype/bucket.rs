use std::fmt;

use serde::Serialize;

use crate::time::UtcTime;
use crate::transport::BucketEntry;

/// A bucket as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<UtcTime>,
}

impl BucketData {
    pub fn new<S: Into<String>>(name: S, creation_time: Option<UtcTime>) -> Self {
        Self {
            name: name.into(),
            creation_time,
        }
    }
}

impl From<BucketEntry> for BucketData {
    fn from(entry: BucketEntry) -> Self {
        Self::new(entry.name, entry.creation_date)
    }
}

impl fmt::Display for BucketData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::write_json(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::BucketData;
    use crate::time::UtcTime;

    #[test]
    fn test_display() {
        let time = UtcTime::from_timestamp(1_694_334_403, 296_000_000);
        let bucket = BucketData::new("root", time);
        assert_eq!(
            bucket.to_string(),
            r#"{"name":"root","creationTime":"2023-09-10T08:26:43.296Z"}"#
        );
        assert_eq!(BucketData::new("root", None).to_string(), r#"{"name":"root"}"#);
    }
}
