//! The S3 calls the template is built on.
//!
//! [`Transport`] is implemented by [`S3Transport`] for a real S3 compatible
//! service and by [`MemoryTransport`] for tests and local use.
use std::fmt;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::TryStreamExt;
use parking_lot::Mutex;

use crate::datatype::MetaData;
use crate::errors::Result;
use crate::time::UtcTime;

mod memory;
mod s3;

pub use memory::MemoryTransport;
pub use s3::S3Transport;

/// A live object body. Dropping it releases the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Destination of wire traces.
pub type TraceSink = Box<dyn Write + Send>;

/// The S3 operations issued by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Operation {
    HeadBucket,
    CreateBucket,
    ListBuckets,
    ListObjects,
    HeadObject,
    PutObject,
    GetObject,
    DeleteObject,
    DeleteObjects,
    CopyObject,
    PresignGetObject,
}

/// Whether a copy keeps the source headers or replaces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataDirective {
    #[default]
    Copy,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub name: String,
    pub creation_date: Option<UtcTime>,
}

/// One entry of an object listing.
///
/// Common prefixes of a non recursive listing are reported with `is_dir`
/// set, no etag, size 0 and no timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
    pub size: u64,
    pub last_modified: Option<UtcTime>,
    pub is_dir: bool,
}

impl ObjectEntry {
    pub fn dir<S: Into<String>>(prefix: S) -> Self {
        Self {
            key: prefix.into(),
            etag: None,
            storage_class: None,
            size: 0,
            last_modified: None,
            is_dir: true,
        }
    }
}

/// A single page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub entries: Vec<ObjectEntry>,
    /// Token of the next page, `None` on the last one.
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub prefix: Option<String>,
    pub recursive: bool,
    pub continuation_token: Option<String>,
}

impl ListArgs {
    pub fn new(prefix: Option<String>, recursive: bool) -> Self {
        Self {
            prefix,
            recursive,
            continuation_token: None,
        }
    }

    pub fn continuation_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// Response of a head object call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub etag: String,
    pub size: u64,
    pub last_modified: Option<UtcTime>,
    pub content_type: Option<String>,
    pub metadata: MetaData,
}

#[derive(Debug, Clone)]
pub struct CopyArgs {
    pub src_bucket: String,
    pub src_key: String,
    pub dst_bucket: String,
    pub dst_key: String,
    pub directive: MetadataDirective,
    /// Only sent with [`MetadataDirective::Replace`].
    pub content_type: Option<String>,
    /// Only sent with [`MetadataDirective::Replace`].
    pub metadata: MetaData,
}

impl CopyArgs {
    pub fn new<S: Into<String>>(src_bucket: S, src_key: S, dst_bucket: S, dst_key: S) -> Self {
        Self {
            src_bucket: src_bucket.into(),
            src_key: src_key.into(),
            dst_bucket: dst_bucket.into(),
            dst_key: dst_key.into(),
            directive: MetadataDirective::Copy,
            content_type: None,
            metadata: MetaData::new(),
        }
    }

    /// Replace the headers of the copy.
    pub fn replace(mut self, content_type: Option<String>, metadata: MetaData) -> Self {
        self.directive = MetadataDirective::Replace;
        self.content_type = content_type;
        self.metadata = metadata;
        self
    }
}

/// Per key result of a batch delete; `error` is set when the service refused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    pub key: String,
    pub error: Option<String>,
}

impl DeleteResult {
    pub fn is_deleted(&self) -> bool {
        self.error.is_none()
    }
}

/// The S3 calls needed by [`MinioTemplate`](crate::MinioTemplate).
///
/// Implementations are shared between tasks and must be thread safe.
/// Every call is a single attempt, retries are left to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Endpoint the transport talks to.
    fn endpoint(&self) -> &str;

    fn region(&self) -> &str;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn make_bucket(&self, bucket: &str, object_lock: bool) -> Result<()>;

    async fn list_buckets(&self) -> Result<Vec<BucketEntry>>;

    async fn list_objects(&self, bucket: &str, args: ListArgs) -> Result<ObjectListing>;

    /// `Ok(None)` when the object does not exist.
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ByteStream>;

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<DeleteResult>>;

    async fn copy_object(&self, args: CopyArgs) -> Result<()>;

    async fn presigned_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String>;

    /// Start writing one line per call to `sink`.
    fn trace_on(&self, sink: TraceSink) -> Result<()>;

    fn trace_off(&self) -> Result<()>;
}

/// Collect a whole body in memory.
pub async fn read_all(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.try_next().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Wire trace shared by the transports.
///
/// The registration lock is only held to fetch the sink. Writes lock the
/// sink alone, so a slow sink never blocks `trace_on` or `trace_off`.
#[derive(Default)]
pub(crate) struct WireTrace {
    sink: Mutex<Option<Arc<Mutex<TraceSink>>>>,
}

impl WireTrace {
    pub fn enable(&self, sink: TraceSink) {
        *self.sink.lock() = Some(Arc::new(Mutex::new(sink)));
    }

    pub fn disable(&self) {
        let sink = self.sink.lock().take();
        if let Some(sink) = sink {
            let _ = sink.lock().flush();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Write one line for a finished call.
    pub fn record<T>(&self, op: Operation, bucket: &str, key: &str, outcome: &Result<T>) {
        let Some(sink) = self.sink.lock().clone() else {
            return;
        };
        let status = match outcome {
            Ok(_) => "ok".to_owned(),
            Err(err) => format!("error: {err}"),
        };
        let line = if key.is_empty() {
            format!("{} {op} {bucket} {status}\n", UtcTime::now())
        } else {
            format!("{} {op} {bucket}/{key} {status}\n", UtcTime::now())
        };
        if let Err(err) = sink.lock().write_all(line.as_bytes()) {
            tracing::warn!(error = %err, "failed to write wire trace");
        };
    }
}

impl fmt::Debug for WireTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireTrace")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
