//! Credential provider
use std::env;

use aws_sdk_s3::config::Credentials;

const PROVIDER_NAME: &str = "minio-template";

/// Static access key / secret key pair of an account in the S3 service.
#[derive(Debug, Clone)]
pub struct StaticProvider(Credentials);

impl StaticProvider {
    pub fn new<T: Into<String>>(ak: T, sk: T, st: Option<String>) -> Self {
        Self(Credentials::new(ak, sk, st, None, PROVIDER_NAME))
    }

    /// load Credentials from MinIO environment variables.
    /// - `MINIO_ACCESS_KEY`
    /// - `MINIO_SECRET_KEY`
    /// - `MINIO_SESSION_TOKEN`
    pub fn from_env() -> Option<Self> {
        if let (Ok(ak), Ok(sk), st) = (
            env::var("MINIO_ACCESS_KEY"),
            env::var("MINIO_SECRET_KEY"),
            env::var("MINIO_SESSION_TOKEN"),
        ) {
            Some(Self::new(ak, sk, st.ok()))
        } else {
            None
        }
    }

    /// load Credentials from AWS environment variables.
    /// - `AWS_ACCESS_KEY_ID` or `AWS_ACCESS_KEY`
    /// - `AWS_SECRET_ACCESS_KEY` or `AWS_SECRET_KEY`
    /// - `AWS_SESSION_TOKEN`
    pub fn from_env_aws() -> Option<Self> {
        let ak = env::var("AWS_ACCESS_KEY_ID").or_else(|_| env::var("AWS_ACCESS_KEY"));
        let sk = env::var("AWS_SECRET_ACCESS_KEY").or_else(|_| env::var("AWS_SECRET_KEY"));
        if let (Ok(ak), Ok(sk), st) = (ak, sk, env::var("AWS_SESSION_TOKEN")) {
            Some(Self::new(ak, sk, st.ok()))
        } else {
            None
        }
    }

    pub fn access_key(&self) -> &str {
        self.0.access_key_id()
    }

    pub(crate) fn credentials(&self) -> Credentials {
        self.0.clone()
    }
}
