//! Minio template
mod operate_bucket;
mod operate_object;
mod template;

pub use operate_bucket::{BucketFilter, BucketStream};
pub use operate_object::{ItemStream, SaveOutcome};
pub use template::{MinioTemplate, MinioTemplateBuilder};
