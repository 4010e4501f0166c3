use std::collections::HashSet;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use regex::Regex;
use tracing::{debug, error};

use crate::datatype::BucketData;
use crate::utils::{check_bucket_name, full_match};
use crate::MinioTemplate;

/// A lazy stream of buckets.
pub type BucketStream = Pin<Box<dyn Stream<Item = BucketData> + Send>>;

/// Selects the buckets returned by [`MinioTemplate::buckets`].
#[derive(Clone, Default)]
pub enum BucketFilter {
    #[default]
    All,
    /// Buckets with one of these names.
    Names(HashSet<String>),
    Predicate(Arc<dyn Fn(&BucketData) -> bool + Send + Sync>),
    /// Buckets whose whole name matches the pattern.
    Pattern(Regex),
}

impl BucketFilter {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&BucketData) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, bucket: &BucketData) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.contains(&bucket.name),
            Self::Predicate(f) => f(bucket),
            Self::Pattern(regex) => full_match(regex, &bucket.name),
        }
    }
}

impl fmt::Debug for BucketFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Names(names) => f.debug_tuple("Names").field(names).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
        }
    }
}

/// Operating the bucket
impl MinioTemplate {
    /// Create the bucket unless it exists.
    ///
    /// Returns true if the bucket exists after the call.
    /// ## Example
    /// ```rust
    /// # use minio_template::MinioTemplate;
    /// # async fn example(template: MinioTemplate) {
    /// assert!(template.ensure_bucket("bucket-name", false).await);
    /// # }
    /// ```
    pub async fn ensure_bucket(&self, bucket: &str, object_lock: bool) -> bool {
        if let Err(err) = check_bucket_name(bucket) {
            error!(bucket, error = err.message(), "invalid bucket name");
            return false;
        }
        match self.transport().bucket_exists(bucket).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                error!(bucket, error = %err, "ensure_bucket failed");
                return false;
            }
        }
        match self.transport().make_bucket(bucket, object_lock).await {
            Ok(()) => {
                debug!(bucket, "bucket created");
                true
            }
            Err(err) => {
                // lost a race with another creator
                if let Ok(true) = self.transport().bucket_exists(bucket).await {
                    return true;
                }
                error!(bucket, error = %err, "make_bucket failed");
                false
            }
        }
    }

    pub async fn is_bucket(&self, bucket: &str) -> bool {
        match self.transport().bucket_exists(bucket).await {
            Ok(exists) => exists,
            Err(err) => {
                debug!(bucket, error = %err, "bucket_exists failed");
                false
            }
        }
    }

    pub async fn bucket_of(&self, bucket: &str) -> Option<BucketData> {
        match self.transport().list_buckets().await {
            Ok(entries) => entries
                .into_iter()
                .find(|e| e.name == bucket)
                .map(BucketData::from),
            Err(err) => {
                error!(bucket, error = %err, "list_buckets failed");
                None
            }
        }
    }

    /// Lazy stream of the buckets accepted by `filter`.
    ///
    /// The listing is issued when the stream is first polled; a failure ends
    /// it without items.
    pub fn buckets(&self, filter: BucketFilter) -> BucketStream {
        let template = self.clone();
        Box::pin(async_stream::stream! {
            if let BucketFilter::Names(names) = &filter {
                if names.is_empty() {
                    return;
                }
            }
            let entries = match template.transport().list_buckets().await {
                Ok(entries) => entries,
                Err(err) => {
                    error!(error = %err, "list_buckets failed");
                    return;
                }
            };
            for entry in entries {
                let bucket = BucketData::from(entry);
                if filter.matches(&bucket) {
                    yield bucket;
                }
            }
        })
    }
}
