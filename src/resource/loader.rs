use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::ContentResource;
use crate::errors::{Error, Result};

/// Resolves the uris of one scheme into resources.
#[async_trait]
pub trait ProtocolResolver: Send + Sync {
    /// `None` when the uri is not handled by this resolver or nothing was found.
    async fn resolve(&self, path: &str) -> Option<ContentResource>;
}

static GLOBAL: Lazy<ResourceLoader> = Lazy::new(ResourceLoader::new);

/// Loads resources by uri.
///
/// Registered resolvers are asked in registration order, the first match
/// wins. Uris no resolver matched fall back to the local file system for
/// `file:` and to an http download for `http:` and `https:`.
#[derive(Default)]
pub struct ResourceLoader {
    resolvers: RwLock<Vec<Arc<dyn ProtocolResolver>>>,
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process wide loader.
    pub fn global() -> &'static ResourceLoader {
        &GLOBAL
    }

    pub fn register(&self, resolver: Arc<dyn ProtocolResolver>) {
        self.resolvers.write().push(resolver);
    }

    pub fn resolver_count(&self) -> usize {
        self.resolvers.read().len()
    }

    pub async fn load(&self, uri: &str) -> Result<ContentResource> {
        let resolvers: Vec<_> = self.resolvers.read().clone();
        for resolver in resolvers {
            if let Some(resource) = resolver.resolve(uri).await {
                return Ok(resource);
            }
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return ContentResource::from_url(uri).await;
        }
        if let Some(path) = uri.strip_prefix("file:") {
            return load_file(uri, path.strip_prefix("//").unwrap_or(path)).await;
        }
        Err(Error::NotResolved(uri.to_owned()))
    }
}

#[cfg(feature = "fs-tokio")]
async fn load_file(_uri: &str, path: &str) -> Result<ContentResource> {
    ContentResource::from_file(path).await
}

#[cfg(not(feature = "fs-tokio"))]
async fn load_file(uri: &str, _path: &str) -> Result<ContentResource> {
    Err(Error::NotResolved(uri.to_owned()))
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("resolvers", &self.resolver_count())
            .finish()
    }
}
