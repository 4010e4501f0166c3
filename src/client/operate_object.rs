use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use tracing::{debug, error, warn};

use crate::datatype::{ItemData, ItemSource, MetaData, StatusData};
use crate::errors::{Error, Result};
use crate::resource::{ContentResource, ResolveStrategy};
use crate::transport::{read_all, ByteStream, CopyArgs, ListArgs, ObjectHead};
use crate::MinioTemplate;

/// A lazy stream of listed objects.
pub type ItemStream = Pin<Box<dyn Stream<Item = ItemData> + Send>>;

/// Result of [`MinioTemplate::save_outcome`].
#[derive(Debug)]
pub enum SaveOutcome {
    /// Body and metadata are stored.
    Stored,
    /// The body is stored but applying the metadata failed.
    StoredWithoutMetadata(Error),
    /// Nothing was sent: the resource is empty or the bucket is unavailable.
    Rejected,
    /// Uploading the body failed.
    Failed(Error),
}

impl SaveOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }
}

/// Operating the object
impl MinioTemplate {
    async fn head(&self, key: &str, bucket: &str) -> Result<ObjectHead> {
        self.transport()
            .stat_object(bucket, key)
            .await?
            .ok_or_else(|| Error::not_found(bucket, key))
    }

    /// Whether the object exists; a failing service reads as absent.
    pub async fn is_item(&self, key: &str, bucket: &str) -> bool {
        match self.transport().stat_object(bucket, key).await {
            Ok(head) => head.is_some(),
            Err(err) => {
                debug!(bucket, key, error = %err, "stat_object failed");
                false
            }
        }
    }

    /// Upload a resource, then apply `metadata` if any, reporting each step.
    ///
    /// The bucket is created when missing.
    pub async fn save_outcome(
        &self,
        key: &str,
        bucket: &str,
        resource: &ContentResource,
        metadata: Option<&MetaData>,
    ) -> SaveOutcome {
        if !resource.is_content_there() {
            debug!(bucket, key, "nothing to save, resource is empty");
            return SaveOutcome::Rejected;
        }
        if !self.ensure_bucket(bucket, false).await {
            return SaveOutcome::Rejected;
        }
        let content_type = resource.content_type();
        let body = resource.content_data().clone();
        if let Err(err) = self
            .transport()
            .put_object(bucket, key, body, Some(content_type))
            .await
        {
            error!(bucket, key, error = %err, "put_object failed");
            return SaveOutcome::Failed(err);
        }
        let metadata = match metadata {
            Some(metadata) if !metadata.is_empty() => metadata,
            _ => return SaveOutcome::Stored,
        };
        let args = CopyArgs::new(bucket, key, bucket, key)
            .replace(Some(content_type.to_owned()), metadata.clone());
        match self.transport().copy_object(args).await {
            Ok(()) => SaveOutcome::Stored,
            Err(err) => {
                error!(bucket, key, error = %err, "metadata copy after put_object failed");
                SaveOutcome::StoredWithoutMetadata(err)
            }
        }
    }

    /// Upload a resource with optional metadata.
    ///
    /// Returns true only if both the body and the metadata were stored.
    /// ## Example
    /// ```rust
    /// # use minio_template::{MinioTemplate, MetaData, ContentResource};
    /// # async fn example(template: MinioTemplate) {
    /// let resource = ContentResource::from_bytes("hello.txt", "hello world");
    /// let meta = MetaData::from([("color", "red")]);
    /// let saved = template.save("hello.txt", "bucket-name", &resource, Some(&meta)).await;
    /// # }
    /// ```
    pub async fn save(
        &self,
        key: &str,
        bucket: &str,
        resource: &ContentResource,
        metadata: Option<&MetaData>,
    ) -> bool {
        self.save_outcome(key, bucket, resource, metadata)
            .await
            .is_stored()
    }

    pub async fn save_bytes<D: Into<Bytes>>(
        &self,
        key: &str,
        bucket: &str,
        data: D,
        metadata: Option<&MetaData>,
    ) -> bool {
        let resource = ContentResource::from_bytes(key, data);
        self.save(key, bucket, &resource, metadata).await
    }

    /// Upload a local file.
    #[cfg(feature = "fs-tokio")]
    pub async fn save_file<P: AsRef<std::path::Path>>(
        &self,
        key: &str,
        bucket: &str,
        path: P,
        metadata: Option<&MetaData>,
    ) -> bool {
        match ContentResource::from_file(path).await {
            Ok(resource) => self.save(key, bucket, &resource, metadata).await,
            Err(err) => {
                error!(bucket, key, error = %err, "reading file failed");
                false
            }
        }
    }

    /// Upload the resource behind an http(s) url.
    pub async fn save_url(
        &self,
        key: &str,
        bucket: &str,
        url: &str,
        metadata: Option<&MetaData>,
    ) -> bool {
        match ContentResource::from_url(url).await {
            Ok(resource) => self.save(key, bucket, &resource, metadata).await,
            Err(err) => {
                error!(bucket, key, url, error = %err, "downloading url failed");
                false
            }
        }
    }

    /// Remove the object; true if it existed and was removed.
    pub async fn delete(&self, key: &str, bucket: &str) -> bool {
        if !self.is_item(key, bucket).await {
            return false;
        }
        match self.transport().remove_object(bucket, key).await {
            Ok(()) => true,
            Err(err) => {
                error!(bucket, key, error = %err, "remove_object failed");
                false
            }
        }
    }

    /// Remove a batch of objects; true if every key was removed.
    ///
    /// Keys removed before a failure stay removed.
    pub async fn delete_all<I, S>(&self, keys: I, bucket: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| seen.insert(k.clone()))
            .collect();
        if keys.is_empty() {
            return true;
        }
        let results = match self.transport().remove_objects(bucket, &keys).await {
            Ok(results) => results,
            Err(err) => {
                error!(bucket, error = %err, "remove_objects failed");
                return false;
            }
        };
        let mut removed = HashSet::new();
        for result in &results {
            match &result.error {
                None => {
                    removed.insert(result.key.as_str());
                }
                Some(err) => warn!(bucket, key = %result.key, error = %err, "object not removed"),
            }
        }
        keys.iter().all(|k| removed.contains(k.as_str()))
    }

    /// Copy an object.
    ///
    /// Without metadata the source headers are kept, otherwise the user
    /// metadata is replaced by `metadata`. The content type is kept in both cases.
    pub async fn copy(
        &self,
        key: &str,
        bucket: &str,
        dest_key: &str,
        dest_bucket: &str,
        metadata: Option<&MetaData>,
    ) -> bool {
        let head = match self.head(key, bucket).await {
            Ok(head) => head,
            Err(err) => {
                debug!(bucket, key, error = %err, "copy source unavailable");
                return false;
            }
        };
        let mut args = CopyArgs::new(bucket, key, dest_bucket, dest_key);
        if let Some(metadata) = metadata.filter(|m| !m.is_empty()) {
            args = args.replace(head.content_type, metadata.clone());
        }
        match self.transport().copy_object(args).await {
            Ok(()) => true,
            Err(err) => {
                error!(bucket, key, dest_bucket, dest_key, error = %err, "copy_object failed");
                false
            }
        }
    }

    /// Status of the object, `file == false` when it is missing or the service fails.
    pub async fn stat(&self, key: &str, bucket: &str) -> StatusData {
        match self.head(key, bucket).await {
            Ok(head) => StatusData::from_head(key, bucket, head),
            Err(err) => {
                debug!(bucket, key, error = %err, "stat failed");
                StatusData::missing(key, bucket)
            }
        }
    }

    /// User metadata of the object.
    ///
    /// Unlike the other reads this fails when the object is missing or the service fails.
    pub async fn meta_of(&self, key: &str, bucket: &str) -> Result<MetaData> {
        self.head(key, bucket).await.map(|head| head.metadata).map_err(|err| {
            error!(bucket, key, error = %err, "meta_of failed");
            err
        })
    }

    /// Replace the user metadata of the object, or add to it when `merge` is set.
    ///
    /// The existing metadata is read and written back in two calls, a
    /// concurrent writer in between is overwritten.
    pub async fn set_meta(&self, key: &str, bucket: &str, metadata: &MetaData, merge: bool) -> bool {
        let head = match self.head(key, bucket).await {
            Ok(head) => head,
            Err(err) => {
                debug!(bucket, key, error = %err, "set_meta on unavailable object");
                return false;
            }
        };
        let status = StatusData::from_head(key, bucket, head);
        let metadata = if merge {
            &status.meta_data + metadata
        } else {
            metadata.clone()
        };
        let args = CopyArgs::new(bucket, key, bucket, key)
            .replace(Some(status.content_type().to_owned()), metadata);
        match self.transport().copy_object(args).await {
            Ok(()) => true,
            Err(err) => {
                error!(bucket, key, error = %err, "set_meta failed");
                false
            }
        }
    }

    /// Live content of the object.
    pub async fn stream(&self, key: &str, bucket: &str) -> Result<ByteStream> {
        self.transport().get_object(bucket, key).await
    }

    /// Lazy stream of the objects of a bucket.
    ///
    /// Pages are listed as the stream is consumed. Without `recursive` the
    /// common prefixes below `prefix` are returned as directory items.
    pub fn items(&self, bucket: &str, recursive: bool, prefix: Option<&str>) -> ItemStream {
        let template = self.clone();
        let bucket = bucket.to_owned();
        let prefix = prefix.map(str::to_owned);
        Box::pin(async_stream::stream! {
            let source: Arc<dyn ItemSource> = Arc::new(template.clone());
            let mut token = None;
            loop {
                let args = ListArgs::new(prefix.clone(), recursive).continuation_token(token.take());
                let listing = match template.transport().list_objects(&bucket, args).await {
                    Ok(listing) => listing,
                    Err(err) => {
                        error!(bucket = %bucket, error = %err, "list_objects failed");
                        break;
                    }
                };
                for entry in listing.entries {
                    yield ItemData::from_entry(bucket.clone(), entry, source.clone());
                }
                match listing.next_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        })
    }

    /// Time limited GET url of the object.
    pub async fn presigned_url(&self, key: &str, bucket: &str, expires: Duration) -> Option<String> {
        match self
            .transport()
            .presigned_get_object(bucket, key, expires)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                error!(bucket, key, error = %err, "presigned_get_object failed");
                None
            }
        }
    }

    /// Materialize an object as a resource, `None` if it is missing or unreadable.
    pub(crate) async fn fetch_resource(
        &self,
        key: &str,
        bucket: &str,
        strategy: ResolveStrategy,
    ) -> Option<ContentResource> {
        let head = match self.transport().stat_object(bucket, key).await {
            Ok(Some(head)) => head,
            Ok(None) => return None,
            Err(err) => {
                debug!(bucket, key, error = %err, "resolving resource failed");
                return None;
            }
        };
        let result = match strategy {
            ResolveStrategy::Download => self.download(key, bucket, head).await,
            ResolveStrategy::Presigned { expires } => {
                let url = self.presigned_url(key, bucket, expires).await?;
                ContentResource::from_url(&url).await
            }
        };
        match result {
            Ok(resource) => Some(resource),
            Err(err) => {
                error!(bucket, key, error = %err, "resolving resource failed");
                None
            }
        }
    }

    async fn download(&self, key: &str, bucket: &str, head: ObjectHead) -> Result<ContentResource> {
        let status = StatusData::from_head(key, bucket, head);
        let data = read_all(self.stream(key, bucket).await?).await?;
        Ok(ContentResource::new(
            format!("{bucket}/{key}"),
            status.content_type(),
            data,
            status.creation_time,
        ))
    }
}

#[async_trait]
impl ItemSource for MinioTemplate {
    async fn fetch_status(&self, key: &str, bucket: &str) -> StatusData {
        self.stat(key, bucket).await
    }

    async fn fetch_metadata(&self, key: &str, bucket: &str) -> Result<MetaData> {
        self.meta_of(key, bucket).await
    }

    async fn open_stream(&self, key: &str, bucket: &str) -> Result<ByteStream> {
        self.stream(key, bucket).await
    }
}
