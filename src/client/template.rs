use std::env;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::{Result, ValueError};
use crate::provider::StaticProvider;
use crate::resource::{MinioResolver, ResolveStrategy, ResourceLoader};
use crate::transport::{S3Transport, TraceSink, Transport};
use crate::utils::_VALID_ENDPOINT;

/// A `MinioTemplateBuilder` can be used to create a [`MinioTemplate`] with custom configuration.
pub struct MinioTemplateBuilder {
    endpoint: Option<String>,
    region: String,
    secure: bool,
    name: Option<String>,
    provider: Option<StaticProvider>,
}

impl Default for MinioTemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MinioTemplateBuilder {
    pub fn new() -> Self {
        MinioTemplateBuilder {
            endpoint: None,
            region: "us-east-1".to_string(),
            secure: true,
            name: None,
            provider: None,
        }
    }

    /// Set endpoint of a S3 service, `host[:port]`.
    ///
    /// A `http://` or `https://` scheme sets [`secure`](Self::secure) accordingly.
    pub fn endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        let endpoint: String = endpoint.into();
        let endpoint = endpoint.trim_end_matches('/');
        if let Some(host) = endpoint.strip_prefix("http://") {
            self.secure = false;
            self.endpoint = Some(host.to_owned());
        } else if let Some(host) = endpoint.strip_prefix("https://") {
            self.secure = true;
            self.endpoint = Some(host.to_owned());
        } else {
            self.endpoint = Some(endpoint.to_owned());
        }
        self
    }

    /// Set region name of buckets in S3 service.
    ///
    /// Default: `us-east-1`
    pub fn region<T: Into<String>>(mut self, region: T) -> Self {
        self.region = region.into();
        self
    }

    /// Set flag to indicate to use secure (TLS) connection to S3 service or not.
    ///
    /// Default: `true`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the name of the template, defaults to the endpoint.
    pub fn name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set credentials provider of your account in S3 service.
    ///
    /// **Required**.
    pub fn provider(mut self, provider: StaticProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<MinioTemplate> {
        let endpoint = self.endpoint.ok_or(ValueError::from("Miss endpoint"))?;
        if !_VALID_ENDPOINT.is_match(&endpoint) {
            return Err(ValueError::from("Invalid endpoint").into());
        }
        let provider = self.provider.ok_or(ValueError::from("Miss provide"))?;
        let scheme = if self.secure { "https" } else { "http" };
        let transport = S3Transport::new(
            format!("{scheme}://{endpoint}"),
            self.region,
            &provider,
        );
        let name = self.name.unwrap_or(endpoint);
        Ok(MinioTemplate::with_transport(name, Arc::new(transport)))
    }
}

/// Operations on buckets, objects and their metadata of a S3 compatible service.
///
/// Failures of the service are logged and reported as `false`, `None` or an
/// empty value; only [`meta_of`](Self::meta_of) returns them as errors.
///
/// You do **not** have to wrap the `MinioTemplate` in an [`Arc`] to **reuse** it,
/// because it already uses an [`Arc`] internally.
///
/// ## Create a template
/// ```rust
/// use minio_template::{provider::StaticProvider, MinioTemplate};
/// let provider = StaticProvider::new("minio-access-key-test", "minio-secret-key-test", None);
/// let template = MinioTemplate::builder()
///     .endpoint("localhost:9022")
///     .provider(provider)
///     .secure(false)
///     .build()
///     .unwrap();
/// assert_eq!(template.server_of(), "http://localhost:9022");
/// ```
#[derive(Clone)]
pub struct MinioTemplate {
    inner: Arc<TemplateRef>,
}

struct TemplateRef {
    name: String,
    transport: Arc<dyn Transport>,
    placed: AtomicBool,
}

impl MinioTemplate {
    /// get a [`MinioTemplateBuilder`]
    pub fn builder() -> MinioTemplateBuilder {
        MinioTemplateBuilder::new()
    }

    /// Build from environment variables.
    /// - `MINIO_HOST`, required
    /// - `MINIO_REGION`
    /// - `MINIO_SECURE`, `true` or `false`
    /// - the credential variables of [`StaticProvider::from_env`]
    pub fn from_env() -> Result<Self> {
        let host = env::var("MINIO_HOST").map_err(|_| ValueError::from("Miss MINIO_HOST"))?;
        let provider = StaticProvider::from_env()
            .ok_or(ValueError::from("Miss MINIO_ACCESS_KEY or MINIO_SECRET_KEY"))?;
        let mut builder = Self::builder().endpoint(host).provider(provider);
        if let Ok(region) = env::var("MINIO_REGION") {
            builder = builder.region(region);
        }
        if let Ok(secure) = env::var("MINIO_SECURE") {
            builder = builder.secure(secure.trim().eq_ignore_ascii_case("true"));
        }
        builder.build()
    }

    /// Wrap any transport.
    pub fn with_transport<S: Into<String>>(name: S, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(TemplateRef {
                name: name.into(),
                transport,
                placed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub fn name_of(&self) -> &str {
        &self.inner.name
    }

    pub fn server_of(&self) -> &str {
        self.inner.transport.endpoint()
    }

    pub fn region_of(&self) -> &str {
        self.inner.transport.region()
    }

    /// Write a line per service call to `sink` until [`trace_off`](Self::trace_off).
    pub fn trace_on(&self, sink: TraceSink) -> bool {
        match self.transport().trace_on(sink) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "trace_on failed");
                false
            }
        }
    }

    pub fn trace_off(&self) -> bool {
        match self.transport().trace_off() {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "trace_off failed");
                false
            }
        }
    }

    /// Register a resolver for `prefix` uris with the global [`ResourceLoader`].
    ///
    /// Only the first registration of a template succeeds, later calls
    /// return false whatever the prefix.
    pub fn loader_on(&self, prefix: &str) -> bool {
        self.loader_on_with(ResourceLoader::global(), prefix, ResolveStrategy::Download)
    }

    pub fn loader_on_with(
        &self,
        loader: &ResourceLoader,
        prefix: &str,
        strategy: ResolveStrategy,
    ) -> bool {
        if self
            .inner
            .placed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(prefix, "resource resolver already registered");
            return false;
        }
        let resolver = MinioResolver::new(prefix, self.clone(), strategy);
        debug!(prefix = resolver.prefix(), "resource resolver registered");
        loader.register(Arc::new(resolver));
        true
    }
}

impl fmt::Debug for MinioTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinioTemplate")
            .field("name", &self.name_of())
            .field("server", &self.server_of())
            .field("region", &self.region_of())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::MinioTemplate;
    use crate::provider::StaticProvider;
    use crate::resource::{ResolveStrategy, ResourceLoader};
    use crate::transport::MemoryTransport;

    #[test]
    fn test_builder() {
        let provider = StaticProvider::new("minio-access-key-test", "minio-secret-key-test", None);
        let template = MinioTemplate::builder()
            .endpoint("https://play.min.io/")
            .region("eu-west-1")
            .provider(provider.clone())
            .build()
            .unwrap();
        assert_eq!(template.server_of(), "https://play.min.io");
        assert_eq!(template.region_of(), "eu-west-1");
        assert_eq!(template.name_of(), "play.min.io");

        let template = MinioTemplate::builder()
            .endpoint("localhost:9000")
            .secure(false)
            .name("local")
            .provider(provider.clone())
            .build()
            .unwrap();
        assert_eq!(template.server_of(), "http://localhost:9000");
        assert_eq!(template.name_of(), "local");

        assert!(MinioTemplate::builder().provider(provider.clone()).build().is_err());
        assert!(MinioTemplate::builder().endpoint("local host").provider(provider).build().is_err());
        assert!(MinioTemplate::builder().endpoint("localhost").build().is_err());
    }

    #[test]
    fn test_loader_on_once() {
        let template = MinioTemplate::with_transport("memory", Arc::new(MemoryTransport::new()));
        let loader = ResourceLoader::new();
        assert!(template.loader_on_with(&loader, "minio", ResolveStrategy::Download));
        assert!(!template.loader_on_with(&loader, "s3", ResolveStrategy::Download));
        assert_eq!(loader.resolver_count(), 1);
    }
}
