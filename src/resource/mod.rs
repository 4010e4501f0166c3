//! Named content resources and the loader resolving them.
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::header;

use crate::datatype::resolve_content_type;
use crate::errors::Result;
use crate::time::UtcTime;

mod loader;
mod resolver;

pub use loader::{ProtocolResolver, ResourceLoader};
pub use resolver::MinioResolver;

/// How a resolver turns an object into a [`ContentResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveStrategy {
    /// Download the object body.
    #[default]
    Download,
    /// Sign a GET url valid for `expires` and load the resource from it.
    Presigned { expires: Duration },
}

/// An immutable resource held in memory.
#[derive(Clone)]
pub struct ContentResource {
    path: String,
    content_type: String,
    data: Bytes,
    last_modified: Option<UtcTime>,
}

impl ContentResource {
    pub fn new<P, T>(path: P, content_type: T, data: Bytes, last_modified: Option<UtcTime>) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            data,
            last_modified,
        }
    }

    /// The content type is guessed from the extension of `path`.
    pub fn from_bytes<P: Into<String>, D: Into<Bytes>>(path: P, data: D) -> Self {
        let path = path.into();
        let content_type = resolve_content_type(&path, "");
        Self::new(path, content_type, data.into(), Some(UtcTime::now()))
    }

    /// Read a local file.
    #[cfg(feature = "fs-tokio")]
    pub async fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let modified = tokio::fs::metadata(path).await?.modified().ok();
        let name = path.to_string_lossy().into_owned();
        let content_type = resolve_content_type(&name, "");
        Ok(Self::new(
            name,
            content_type,
            Bytes::from(data),
            modified.map(|t| UtcTime::new(DateTime::<Utc>::from(t))),
        ))
    }

    /// Download the resource behind an http(s) url.
    pub async fn from_url(url: &str) -> Result<Self> {
        let response = reqwest::get(url).await?.error_for_status()?;
        let headers = response.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let path = response.url().path().to_owned();
        let content_type = resolve_content_type(&path, content_type);
        let last_modified = headers
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|t| UtcTime::new(t.with_timezone(&Utc)));
        let data = response.bytes().await?;
        Ok(Self::new(url, content_type, data, last_modified))
    }

    /// Whether there is something to read.
    pub fn is_content_there(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn content_data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content_length(&self) -> usize {
        self.data.len()
    }

    pub fn last_modified(&self) -> Option<UtcTime> {
        self.last_modified
    }
}

impl PartialEq for ContentResource {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.data == other.data
    }
}

impl Eq for ContentResource {}

impl fmt::Debug for ContentResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentResource")
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("content_length", &self.data.len())
            .field("last_modified", &self.last_modified)
            .finish()
    }
}
