use std::fmt;

use serde::Serialize;

use super::{resolve_content_type, MetaData, DEFAULT_CONTENT_TYPE};
use crate::time::UtcTime;
use crate::transport::ObjectHead;

/// Point in time snapshot of an object.
///
/// Missing objects and directory entries are reported with `file == false`,
/// a size of 0 and the default content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub name: String,
    pub bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub file: bool,
    pub content_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<UtcTime>,
    #[serde(skip_serializing_if = "MetaData::is_empty")]
    pub meta_data: MetaData,
    content_type: String,
}

impl StatusData {
    /// Status of an existing object, the content type is resolved against the name.
    pub fn from_head<N, B>(name: N, bucket: B, head: ObjectHead) -> Self
    where
        N: Into<String>,
        B: Into<String>,
    {
        let name = name.into();
        let content_type =
            resolve_content_type(&name, head.content_type.as_deref().unwrap_or_default());
        Self {
            name,
            bucket: bucket.into(),
            etag: Some(head.etag),
            file: true,
            content_size: head.size,
            creation_time: head.last_modified,
            meta_data: head.metadata,
            content_type,
        }
    }

    /// Status of something that is not a regular object.
    pub fn missing<N, B>(name: N, bucket: B) -> Self
    where
        N: Into<String>,
        B: Into<String>,
    {
        Self {
            name: name.into(),
            bucket: bucket.into(),
            etag: None,
            file: false,
            content_size: 0,
            creation_time: None,
            meta_data: MetaData::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_file(&self) -> bool {
        self.file
    }
}

impl fmt::Display for StatusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::write_json(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::StatusData;
    use crate::datatype::{MetaData, DEFAULT_CONTENT_TYPE};
    use crate::transport::ObjectHead;

    #[test]
    fn test_from_head() {
        let head = ObjectHead {
            etag: "abc".to_owned(),
            size: 12,
            last_modified: None,
            content_type: Some(DEFAULT_CONTENT_TYPE.to_owned()),
            metadata: MetaData::from([("color", "red")]),
        };
        let status = StatusData::from_head("dir/file.json", "root", head);
        assert!(status.is_file());
        assert_eq!(status.content_type(), "application/json");
        assert_eq!(status.content_size, 12);
        assert_eq!(
            status.to_string(),
            r#"{"name":"dir/file.json","bucket":"root","etag":"abc","file":true,"contentSize":12,"metaData":{"x-amz-meta-color":"red"},"contentType":"application/json"}"#
        );
    }

    #[test]
    fn test_missing() {
        let status = StatusData::missing("dir/", "root");
        assert!(!status.is_file());
        assert_eq!(status.content_size, 0);
        assert_eq!(status.content_type(), DEFAULT_CONTENT_TYPE);
        assert_eq!(
            status.to_string(),
            r#"{"name":"dir/","bucket":"root","file":false,"contentSize":0,"contentType":"application/octet-stream"}"#
        );
    }
}
