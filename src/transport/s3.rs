use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use aws_sdk_s3::types::{
    self, BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::{
    BucketEntry, ByteStream, CopyArgs, DeleteResult, ListArgs, MetadataDirective, ObjectEntry,
    ObjectHead, ObjectListing, Operation, TraceSink, Transport, WireTrace,
};
use crate::datatype::MetaData;
use crate::errors::{Error, Result};
use crate::provider::StaticProvider;
use crate::time::UtcTime;
use crate::utils::{trim_etag, urlencode};

fn sdk_error<E>(op: Operation, err: E) -> Error
where
    E: std::error::Error,
{
    Error::transport(op, DisplayErrorContext(err))
}

/// [`Transport`] over the AWS S3 SDK, addressing buckets path-style so
/// that MinIO and other S3 compatible services work.
#[derive(Debug)]
pub struct S3Transport {
    client: Client,
    endpoint: String,
    region: String,
    trace: WireTrace,
}

impl S3Transport {
    /// `endpoint` is a full url like `http://localhost:9000`.
    pub fn new<E, R>(endpoint: E, region: R, provider: &StaticProvider) -> Self
    where
        E: Into<String>,
        R: Into<String>,
    {
        let endpoint = endpoint.into();
        let region = region.into();
        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(provider.credentials())
            .endpoint_url(endpoint.clone())
            .force_path_style(true)
            .build();
        Self::from_client(Client::from_conf(config), endpoint, region)
    }

    /// Wrap an already configured client.
    pub fn from_client<E, R>(client: Client, endpoint: E, region: R) -> Self
    where
        E: Into<String>,
        R: Into<String>,
    {
        Self {
            client,
            endpoint: endpoint.into(),
            region: region.into(),
            trace: WireTrace::default(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Body of a bucket creation; `us-east-1` is the default region and takes none.
    fn bucket_configuration(&self) -> Option<CreateBucketConfiguration> {
        if self.region.is_empty() || self.region == "us-east-1" {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }

    fn finish<T>(&self, op: Operation, bucket: &str, key: &str, result: Result<T>) -> Result<T> {
        self.trace.record(op, bucket, key, &result);
        result
    }

    async fn _list_objects(&self, bucket: &str, args: ListArgs) -> Result<ObjectListing> {
        let op = Operation::ListObjects;
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(args.prefix)
            .set_delimiter((!args.recursive).then(|| "/".to_owned()))
            .set_continuation_token(args.continuation_token)
            .send()
            .await
            .map_err(|e| sdk_error(op, e))?;

        let mut entries: Vec<ObjectEntry> = output
            .contents()
            .iter()
            .filter_map(|o| {
                Some(ObjectEntry {
                    key: o.key()?.to_owned(),
                    etag: o.e_tag().map(trim_etag),
                    storage_class: o.storage_class().map(|c| c.as_str().to_owned()),
                    size: o.size().unwrap_or_default().max(0) as u64,
                    last_modified: o.last_modified().map(UtcTime::from),
                    is_dir: false,
                })
            })
            .collect();
        entries.extend(
            output
                .common_prefixes()
                .iter()
                .filter_map(|p| p.prefix())
                .map(ObjectEntry::dir),
        );
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let next_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_owned)
        } else {
            None
        };
        Ok(ObjectListing {
            entries,
            next_token,
        })
    }

    async fn _stat_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        let op = Operation::HeadObject;
        let output = match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().map_or(false, |e| e.is_not_found()) => {
                return Ok(None)
            }
            Err(err) => return Err(sdk_error(op, err)),
        };
        let metadata = output
            .metadata()
            .map(|m| MetaData::from_wire(m.iter().map(|(k, v)| (k, v.clone()))))
            .unwrap_or_default();
        Ok(Some(ObjectHead {
            etag: output.e_tag().map(trim_etag).unwrap_or_default(),
            size: output.content_length().unwrap_or_default().max(0) as u64,
            last_modified: output.last_modified().map(UtcTime::from),
            content_type: output.content_type().map(str::to_owned),
            metadata,
        }))
    }

    async fn _remove_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<DeleteResult>> {
        let op = Operation::DeleteObjects;
        let objects = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sdk_error(op, e))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| sdk_error(op, e))?;
        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| sdk_error(op, e))?;

        let mut results: Vec<DeleteResult> = output
            .deleted()
            .iter()
            .filter_map(|d| d.key())
            .map(|key| DeleteResult {
                key: key.to_owned(),
                error: None,
            })
            .collect();
        results.extend(output.errors().iter().filter_map(|e| {
            Some(DeleteResult {
                key: e.key()?.to_owned(),
                error: Some(format!(
                    "{}: {}",
                    e.code().unwrap_or("Unknown"),
                    e.message().unwrap_or_default()
                )),
            })
        }));
        Ok(results)
    }

    async fn _copy_object(&self, args: &CopyArgs) -> Result<()> {
        let op = Operation::CopyObject;
        let mut request = self
            .client
            .copy_object()
            .copy_source(format!(
                "{}/{}",
                args.src_bucket,
                urlencode(&args.src_key, true)
            ))
            .bucket(&args.dst_bucket)
            .key(&args.dst_key);
        request = match args.directive {
            MetadataDirective::Copy => request.metadata_directive(types::MetadataDirective::Copy),
            MetadataDirective::Replace => request
                .metadata_directive(types::MetadataDirective::Replace)
                .set_content_type(args.content_type.clone())
                .set_metadata(Some(args.metadata.to_user_map())),
        };
        request.send().await.map_err(|e| sdk_error(op, e))?;
        Ok(())
    }
}

#[async_trait]
impl Transport for S3Transport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let op = Operation::HeadBucket;
        let result = match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().map_or(false, |e| e.is_not_found()) => Ok(false),
            Err(err) => Err(sdk_error(op, err)),
        };
        self.finish(op, bucket, "", result)
    }

    async fn make_bucket(&self, bucket: &str, object_lock: bool) -> Result<()> {
        let op = Operation::CreateBucket;
        let result = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.bucket_configuration())
            .object_lock_enabled_for_bucket(object_lock)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| sdk_error(op, e));
        self.finish(op, bucket, "", result)
    }

    async fn list_buckets(&self) -> Result<Vec<BucketEntry>> {
        let op = Operation::ListBuckets;
        let result = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| sdk_error(op, e))
            .map(|output| {
                output
                    .buckets()
                    .iter()
                    .filter_map(|b| {
                        Some(BucketEntry {
                            name: b.name()?.to_owned(),
                            creation_date: b.creation_date().map(UtcTime::from),
                        })
                    })
                    .collect()
            });
        self.finish(op, "", "", result)
    }

    async fn list_objects(&self, bucket: &str, args: ListArgs) -> Result<ObjectListing> {
        let prefix = args.prefix.clone().unwrap_or_default();
        let result = self._list_objects(bucket, args).await;
        self.finish(Operation::ListObjects, bucket, &prefix, result)
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        let result = self._stat_object(bucket, key).await;
        self.finish(Operation::HeadObject, bucket, key, result)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()> {
        let op = Operation::PutObject;
        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(SdkByteStream::from(body))
            .set_content_type(content_type.map(str::to_owned))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| sdk_error(op, e));
        self.finish(op, bucket, key, result)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let op = Operation::GetObject;
        let result = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => {
                let stream = futures_util::stream::try_unfold(output.body, move |mut body| async move {
                    match body.try_next().await {
                        Ok(Some(chunk)) => Ok(Some((chunk, body))),
                        Ok(None) => Ok(None),
                        Err(err) => Err(sdk_error(op, err)),
                    }
                });
                let stream: ByteStream = Box::pin(stream);
                Ok(stream)
            }
            Err(err) if err.as_service_error().map_or(false, |e| e.is_no_such_key()) => {
                Err(Error::not_found(bucket, key))
            }
            Err(err) => Err(sdk_error(op, err)),
        };
        self.finish(op, bucket, key, result)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        let op = Operation::DeleteObject;
        let result = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| sdk_error(op, e));
        self.finish(op, bucket, key, result)
    }

    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<DeleteResult>> {
        let result = self._remove_objects(bucket, keys).await;
        self.finish(Operation::DeleteObjects, bucket, "", result)
    }

    async fn copy_object(&self, args: CopyArgs) -> Result<()> {
        let result = self._copy_object(&args).await;
        self.finish(Operation::CopyObject, &args.dst_bucket, &args.dst_key, result)
    }

    async fn presigned_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String> {
        let op = Operation::PresignGetObject;
        let result = match PresigningConfig::expires_in(expires) {
            Ok(config) => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(config)
                .await
                .map(|request| request.uri().to_owned())
                .map_err(|e| sdk_error(op, e)),
            Err(err) => Err(sdk_error(op, err)),
        };
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

#[cfg(test)]
mod tests {
    use super::S3Transport;
    use crate::provider::StaticProvider;
    use crate::transport::Transport;

    #[test]
    fn test_new() {
        let provider = StaticProvider::new("minioadmin", "minioadmin", None);
        let transport = S3Transport::new("http://localhost:9000", "us-east-1", &provider);
        assert_eq!(transport.endpoint(), "http://localhost:9000");
        assert_eq!(transport.region(), "us-east-1");
    }

    #[test]
    fn test_bucket_configuration() {
        let provider = StaticProvider::new("minioadmin", "minioadmin", None);
        let transport = S3Transport::new("http://localhost:9000", "us-east-1", &provider);
        assert!(transport.bucket_configuration().is_none());

        let transport = S3Transport::new("http://localhost:9000", "eu-west-1", &provider);
        let config = transport.bucket_configuration().unwrap();
        assert_eq!(
            config.location_constraint().map(|c| c.as_str()),
            Some("eu-west-1")
        );
    }
}
