use async_trait::async_trait;

use super::{ContentResource, ProtocolResolver, ResolveStrategy};
use crate::utils::{normalize_path, normalize_prefix};
use crate::MinioTemplate;

/// Resolves `<prefix>bucket/key` uris to objects of a template.
///
/// `minio://root/dir/file.txt`, `minio:root/dir/file.txt` and
/// `minio:/root//dir/./file.txt` all name the object `dir/file.txt` of
/// bucket `root`. Failures of the service resolve to nothing.
#[derive(Debug, Clone)]
pub struct MinioResolver {
    prefix: String,
    template: MinioTemplate,
    strategy: ResolveStrategy,
}

impl MinioResolver {
    pub fn new(prefix: &str, template: MinioTemplate, strategy: ResolveStrategy) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            template,
            strategy,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Split a uri into bucket and key, `None` if it is not ours.
    pub fn locate(&self, path: &str) -> Option<(String, String)> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        let normalized = normalize_path(rest);
        let (bucket, key) = normalized.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some((bucket.to_owned(), key.to_owned()))
    }
}

#[async_trait]
impl ProtocolResolver for MinioResolver {
    async fn resolve(&self, path: &str) -> Option<ContentResource> {
        let (bucket, key) = self.locate(path)?;
        self.template
            .fetch_resource(&key, &bucket, self.strategy)
            .await
    }
}
