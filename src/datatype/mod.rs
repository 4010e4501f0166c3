//! Data types
//!
//! Snapshots of buckets and objects handed out by
//! [`MinioTemplate`](crate::MinioTemplate), and the user metadata codec.
use std::fmt;

use serde::Serialize;

mod bucket;
mod item;
mod meta;
mod status;

pub use bucket::BucketData;
pub use item::{ItemData, ItemSource};
pub use meta::{MetaData, X_AMAZON_META_HEADER_START};
pub use status::StatusData;

/// Content type of objects stored without a meaningful one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether `content_type` carries no real information: empty or one of the
/// generic binary types.
pub fn is_default_content_type(content_type: &str) -> bool {
    let content_type = content_type.trim();
    content_type.is_empty()
        || content_type.eq_ignore_ascii_case(DEFAULT_CONTENT_TYPE)
        || content_type.eq_ignore_ascii_case("binary/octet-stream")
}

/// Extensions the mime database has no entry for.
const EXTRA_CONTENT_TYPES: &[(&str, &str)] = &[
    ("kt", "text/x-kotlin-source"),
    ("kts", "text/x-kotlin-script"),
];

fn guess_content_type(name: &str) -> &'static str {
    let extension = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    EXTRA_CONTENT_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, content_type)| *content_type)
        .or_else(|| mime_guess::from_path(name).first_raw())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Resolve the content type of the object `name`.
///
/// A generic type is replaced by a guess from the file extension, any
/// other type is returned lower-cased and trimmed.
pub fn resolve_content_type(name: &str, content_type: &str) -> String {
    if is_default_content_type(content_type) {
        guess_content_type(name).to_owned()
    } else {
        content_type.trim().to_lowercase()
    }
}

pub(crate) fn write_json<T: Serialize>(value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let json = serde_json::to_string(value).map_err(|_| fmt::Error)?;
    f.write_str(&json)
}
