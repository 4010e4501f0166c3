use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use super::{
    BucketEntry, ByteStream, CopyArgs, DeleteResult, ListArgs, MetadataDirective, ObjectEntry,
    ObjectHead, ObjectListing, Operation, TraceSink, Transport, WireTrace,
};
use crate::datatype::MetaData;
use crate::errors::{Error, Result};
use crate::time::UtcTime;

const DEFAULT_PAGE_SIZE: usize = 1000;
const CHUNK_SIZE: usize = 64 * 1024;
const DELIMITER: &str = "/";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    content_type: Option<String>,
    metadata: MetaData,
    last_modified: UtcTime,
}

impl StoredObject {
    fn new(data: Bytes, content_type: Option<String>, metadata: MetaData) -> Self {
        let etag = hex::encode(md5::compute(&data).0);
        Self {
            data,
            etag,
            content_type,
            metadata,
            last_modified: UtcTime::now(),
        }
    }

    fn head(&self) -> ObjectHead {
        ObjectHead {
            etag: self.etag.clone(),
            size: self.data.len() as u64,
            last_modified: Some(self.last_modified),
            content_type: self.content_type.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug)]
struct StoredBucket {
    created: UtcTime,
    object_lock: bool,
    objects: BTreeMap<String, StoredObject>,
}

/// An S3 service kept in process memory.
///
/// Behaves like a single node MinIO for the calls of [`Transport`]:
/// listings are sorted by key and paged, etags are the md5 of the body,
/// deleting a missing key succeeds. Failures can be injected per
/// operation and per key to exercise error paths.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use minio_template::transport::{MemoryTransport, Operation};
/// use minio_template::MinioTemplate;
///
/// let transport = Arc::new(MemoryTransport::new());
/// transport.fail_operation(Operation::PutObject);
/// let template = MinioTemplate::with_transport("memory", transport.clone());
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    endpoint: String,
    region: String,
    page_size: usize,
    buckets: RwLock<BTreeMap<String, StoredBucket>>,
    failing: RwLock<HashSet<Operation>>,
    rejected_keys: RwLock<HashSet<String>>,
    calls: Mutex<HashMap<Operation, usize>>,
    trace: WireTrace,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            endpoint: "memory://localhost".to_owned(),
            region: "us-east-1".to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
            buckets: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(HashSet::new()),
            rejected_keys: RwLock::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
            trace: WireTrace::default(),
        }
    }

    /// Max entries returned by one list call.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    /// Every later call of `op` fails with a transport error.
    pub fn fail_operation(&self, op: Operation) {
        self.failing.write().insert(op);
    }

    /// Batch deletes report an `AccessDenied` error for `key` and keep it.
    pub fn reject_key_delete<S: Into<String>>(&self, key: S) {
        self.rejected_keys.write().insert(key.into());
    }

    pub fn clear_failures(&self) {
        self.failing.write().clear();
        self.rejected_keys.write().clear();
    }

    /// Number of calls of `op` issued so far, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Whether the bucket was created with object lock enabled.
    pub fn is_object_lock(&self, bucket: &str) -> Option<bool> {
        self.buckets.read().get(bucket).map(|b| b.object_lock)
    }

    /// Raw stored body, bypassing call counting and fault injection.
    pub fn object_data(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.data.clone())
    }

    fn begin(&self, op: Operation) -> Result<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        if self.failing.read().contains(&op) {
            return Err(Error::transport(op, "injected failure"));
        }
        Ok(())
    }

    fn finish<T>(&self, op: Operation, bucket: &str, key: &str, result: Result<T>) -> Result<T> {
        self.trace.record(op, bucket, key, &result);
        result
    }

    fn no_such_bucket(op: Operation, bucket: &str) -> Error {
        Error::transport(
            op,
            format!("NoSuchBucket: The specified bucket does not exist: {bucket}"),
        )
    }

    fn list_page(&self, bucket: &str, args: &ListArgs) -> Result<ObjectListing> {
        let buckets = self.buckets.read();
        let stored = buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(Operation::ListObjects, bucket))?;
        let prefix = args.prefix.as_deref().unwrap_or("");
        let after = args.continuation_token.as_deref().unwrap_or("");

        let mut listing = ObjectListing::default();
        let mut seen_prefixes = HashSet::new();
        for (key, object) in stored.objects.range(prefix.to_owned()..) {
            if !key.starts_with(prefix) {
                break;
            }
            let entry = match key[prefix.len()..].find(DELIMITER) {
                Some(pos) if !args.recursive => {
                    let common = format!("{prefix}{}{DELIMITER}", &key[prefix.len()..][..pos]);
                    if !seen_prefixes.insert(common.clone()) {
                        continue;
                    }
                    ObjectEntry::dir(common)
                }
                _ => ObjectEntry {
                    key: key.clone(),
                    etag: Some(object.etag.clone()),
                    storage_class: Some("STANDARD".to_owned()),
                    size: object.data.len() as u64,
                    last_modified: Some(object.last_modified),
                    is_dir: false,
                },
            };
            // skip everything up to and including the last name of the previous page
            if !after.is_empty() && entry.key.as_str() <= after {
                continue;
            }
            if listing.entries.len() >= self.page_size {
                listing.next_token = listing.entries.last().map(|e| e.key.clone());
                break;
            }
            listing.entries.push(entry);
        }
        Ok(listing)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let op = Operation::HeadBucket;
        let result = self
            .begin(op)
            .map(|_| self.buckets.read().contains_key(bucket));
        self.finish(op, bucket, "", result)
    }

    async fn make_bucket(&self, bucket: &str, object_lock: bool) -> Result<()> {
        let op = Operation::CreateBucket;
        let result = self.begin(op).and_then(|_| {
            let mut buckets = self.buckets.write();
            if buckets.contains_key(bucket) {
                return Err(Error::transport(
                    op,
                    format!("BucketAlreadyOwnedByYou: {bucket}"),
                ));
            }
            buckets.insert(
                bucket.to_owned(),
                StoredBucket {
                    created: UtcTime::now(),
                    object_lock,
                    objects: BTreeMap::new(),
                },
            );
            Ok(())
        });
        self.finish(op, bucket, "", result)
    }

    async fn list_buckets(&self) -> Result<Vec<BucketEntry>> {
        let op = Operation::ListBuckets;
        let result = self.begin(op).map(|_| {
            self.buckets
                .read()
                .iter()
                .map(|(name, b)| BucketEntry {
                    name: name.clone(),
                    creation_date: Some(b.created),
                })
                .collect()
        });
        self.finish(op, "", "", result)
    }

    async fn list_objects(&self, bucket: &str, args: ListArgs) -> Result<ObjectListing> {
        let op = Operation::ListObjects;
        let result = self
            .begin(op)
            .and_then(|_| self.list_page(bucket, &args));
        self.finish(op, bucket, args.prefix.as_deref().unwrap_or(""), result)
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        let op = Operation::HeadObject;
        let result = self.begin(op).map(|_| {
            self.buckets
                .read()
                .get(bucket)
                .and_then(|b| b.objects.get(key))
                .map(StoredObject::head)
        });
        self.finish(op, bucket, key, result)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()> {
        let op = Operation::PutObject;
        let result = self.begin(op).and_then(|_| {
            let mut buckets = self.buckets.write();
            let stored = buckets
                .get_mut(bucket)
                .ok_or_else(|| Self::no_such_bucket(op, bucket))?;
            let object = StoredObject::new(body, content_type.map(str::to_owned), MetaData::new());
            stored.objects.insert(key.to_owned(), object);
            Ok(())
        });
        self.finish(op, bucket, key, result)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let op = Operation::GetObject;
        let result = self.begin(op).and_then(|_| {
            let buckets = self.buckets.read();
            let object = buckets
                .get(bucket)
                .ok_or_else(|| Self::no_such_bucket(op, bucket))?
                .objects
                .get(key)
                .ok_or_else(|| Error::not_found(bucket, key))?;
            let data = object.data.clone();
            let chunks: Vec<Result<Bytes>> = (0..data.len())
                .step_by(CHUNK_SIZE)
                .map(|start| Ok(data.slice(start..data.len().min(start + CHUNK_SIZE))))
                .collect();
            let stream: ByteStream = Box::pin(futures_util::stream::iter(chunks));
            Ok(stream)
        });
        self.finish(op, bucket, key, result)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        let op = Operation::DeleteObject;
        let result = self.begin(op).and_then(|_| {
            let mut buckets = self.buckets.write();
            let stored = buckets
                .get_mut(bucket)
                .ok_or_else(|| Self::no_such_bucket(op, bucket))?;
            stored.objects.remove(key);
            Ok(())
        });
        self.finish(op, bucket, key, result)
    }

    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<DeleteResult>> {
        let op = Operation::DeleteObjects;
        let result = self.begin(op).and_then(|_| {
            let rejected = self.rejected_keys.read();
            let mut buckets = self.buckets.write();
            let stored = buckets
                .get_mut(bucket)
                .ok_or_else(|| Self::no_such_bucket(op, bucket))?;
            let results = keys
                .iter()
                .map(|key| {
                    if rejected.contains(key) {
                        return DeleteResult {
                            key: key.clone(),
                            error: Some("AccessDenied: Access Denied.".to_owned()),
                        };
                    }
                    stored.objects.remove(key);
                    DeleteResult {
                        key: key.clone(),
                        error: None,
                    }
                })
                .collect();
            Ok(results)
        });
        self.finish(op, bucket, "", result)
    }

    async fn copy_object(&self, args: CopyArgs) -> Result<()> {
        let op = Operation::CopyObject;
        let result = self.begin(op).and_then(|_| {
            let mut buckets = self.buckets.write();
            let source = buckets
                .get(&args.src_bucket)
                .ok_or_else(|| Self::no_such_bucket(op, &args.src_bucket))?
                .objects
                .get(&args.src_key)
                .cloned()
                .ok_or_else(|| Error::not_found(&args.src_bucket, &args.src_key))?;
            let (content_type, metadata) = match args.directive {
                MetadataDirective::Copy => (source.content_type, source.metadata),
                MetadataDirective::Replace => (args.content_type.clone(), args.metadata.clone()),
            };
            let target = buckets
                .get_mut(&args.dst_bucket)
                .ok_or_else(|| Self::no_such_bucket(op, &args.dst_bucket))?;
            let object = StoredObject::new(source.data, content_type, metadata);
            target.objects.insert(args.dst_key.clone(), object);
            Ok(())
        });
        self.finish(op, &args.dst_bucket, &args.dst_key, result)
    }

    async fn presigned_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String> {
        let op = Operation::PresignGetObject;
        let result = self.begin(op).map(|_| {
            format!(
                "{}/{bucket}/{}?X-Amz-Expires={}",
                self.endpoint,
                crate::utils::urlencode(key, true),
                expires.as_secs()
            )
        });
        self.finish(op, bucket, key, result)
    }

    fn trace_on(&self, sink: TraceSink) -> Result<()> {
        self.trace.enable(sink);
        Ok(())
    }

    fn trace_off(&self) -> Result<()> {
        self.trace.disable();
        Ok(())
    }
}
