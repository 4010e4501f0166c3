#![allow(dead_code)]
use std::env;
use std::sync::{Arc, Once};

use minio_template::provider::StaticProvider;
use minio_template::transport::MemoryTransport;
use minio_template::MinioTemplate;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// A template over a fresh in-memory service.
pub fn get_test_template() -> (MinioTemplate, Arc<MemoryTransport>) {
    get_test_template_with(MemoryTransport::new())
}

pub fn get_test_template_with(transport: MemoryTransport) -> (MinioTemplate, Arc<MemoryTransport>) {
    init_tracing();
    let transport = Arc::new(transport);
    let template = MinioTemplate::with_transport("memory", transport.clone());
    (template, transport)
}

/// A template for the server configured in the environment or `.env`.
pub fn get_live_template() -> MinioTemplate {
    init_tracing();
    dotenv::dotenv().ok();
    let provider = StaticProvider::from_env().unwrap();
    let host = env::var("MINIO_HOST").unwrap_or("localhost:9022".to_owned());
    let secure = env::var("MINIO_SECURE")
        .map(|f| f.parse().unwrap_or(false))
        .unwrap_or(false);
    MinioTemplate::builder()
        .endpoint(host)
        .provider(provider)
        .secure(secure)
        .build()
        .unwrap()
}
