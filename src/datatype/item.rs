use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::Serialize;

use super::{MetaData, StatusData};
use crate::errors::{Error, Result, ValueError};
use crate::time::UtcTime;
use crate::transport::{read_all, ByteStream, ObjectEntry};

/// Reads the details of an object on behalf of an [`ItemData`].
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Status of the object; never fails, a missing object has `file == false`.
    async fn fetch_status(&self, key: &str, bucket: &str) -> StatusData;

    async fn fetch_metadata(&self, key: &str, bucket: &str) -> Result<MetaData>;

    async fn open_stream(&self, key: &str, bucket: &str) -> Result<ByteStream>;
}

/// An entry of an object listing.
///
/// Details beyond the listing (status, metadata, content) are fetched on
/// demand through the [`ItemSource`] the item was listed by. The content
/// read by [`ItemData::bytes`] is kept, later calls do not hit the service.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    pub name: String,
    pub bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    pub file: bool,
    pub content_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<UtcTime>,
    #[serde(skip)]
    source: Arc<dyn ItemSource>,
    #[serde(skip)]
    content: OnceCell<Bytes>,
}

impl ItemData {
    pub fn from_entry<B: Into<String>>(
        bucket: B,
        entry: ObjectEntry,
        source: Arc<dyn ItemSource>,
    ) -> Self {
        Self {
            name: entry.key,
            bucket: bucket.into(),
            etag: entry.etag,
            storage_class: entry.storage_class,
            file: !entry.is_dir,
            content_size: if entry.is_dir { 0 } else { entry.size },
            last_modified: if entry.is_dir {
                None
            } else {
                entry.last_modified
            },
            source,
            content: OnceCell::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.file
    }

    /// Whether the content was already read.
    pub fn is_materialized(&self) -> bool {
        self.content.get().is_some()
    }

    pub async fn meta(&self) -> Result<MetaData> {
        if !self.file {
            return Ok(MetaData::new());
        }
        self.source.fetch_metadata(&self.name, &self.bucket).await
    }

    pub async fn stat(&self) -> StatusData {
        if !self.file {
            return StatusData::missing(&self.name, &self.bucket);
        }
        self.source.fetch_status(&self.name, &self.bucket).await
    }

    /// Live content of the object, empty for directories.
    pub async fn stream(&self) -> Result<ByteStream> {
        if !self.file {
            return Ok(Box::pin(futures_util::stream::empty::<Result<Bytes>>()));
        }
        if let Some(content) = self.content.get() {
            let content = content.clone();
            return Ok(Box::pin(futures_util::stream::once(async move { Ok::<_, Error>(content) })));
        }
        self.source.open_stream(&self.name, &self.bucket).await
    }

    pub async fn bytes(&self) -> Result<Bytes> {
        if let Some(content) = self.content.get() {
            return Ok(content.clone());
        }
        let content = read_all(self.stream().await?).await?;
        Ok(self.content.get_or_init(|| content).clone())
    }

    /// Content decoded as utf-8.
    pub async fn text(&self) -> Result<String> {
        let content = self.bytes().await?;
        Ok(String::from_utf8(content.to_vec()).map_err(ValueError::from)?)
    }

    pub async fn lines(&self) -> Result<Vec<String>> {
        Ok(self.text().await?.lines().map(str::to_owned).collect())
    }

    /// Equal listing fields and equal content, reading both sides if needed.
    pub async fn same_content(&self, other: &ItemData) -> Result<bool> {
        if self != other {
            return Ok(false);
        }
        Ok(self.bytes().await? == other.bytes().await?)
    }

    fn identity(&self) -> (&str, &str, &Option<String>, &Option<String>, bool, u64, &Option<UtcTime>) {
        (
            &self.name,
            &self.bucket,
            &self.etag,
            &self.storage_class,
            self.file,
            self.content_size,
            &self.last_modified,
        )
    }
}

/// Items are equal when their listing fields are; content is compared by
/// [`ItemData::same_content`].
impl PartialEq for ItemData {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ItemData {}

impl Hash for ItemData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ItemData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemData")
            .field("name", &self.name)
            .field("bucket", &self.bucket)
            .field("etag", &self.etag)
            .field("storage_class", &self.storage_class)
            .field("file", &self.file)
            .field("content_size", &self.content_size)
            .field("last_modified", &self.last_modified)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

impl fmt::Display for ItemData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::write_json(self, f)
    }
}
