use std::fmt::Display;
use std::result;

use crate::transport::Operation;

/// A `Result` typedef to use with the `minio-template::errors` type
pub type Result<T> = result::Result<T, Error>;

/// inducate an illegal variable was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError(String);

impl ValueError {
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl<T> From<T> for ValueError
where
    T: Display,
{
    fn from(err: T) -> Self {
        Self(err.to_string())
    }
}

/// Errors raised by the template and its transports.
///
/// Most operations of [`MinioTemplate`](crate::MinioTemplate) never return
/// this type: they log the failure and answer `false` or an empty value.
/// Only the mandatory reads (like `meta_of`) and the raw transport calls
/// hand it back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// inducate an illegal variable was used.
    #[error("invalid value: {0}")]
    ValueError(String),

    /// indicate the S3 service, or the connection to it, failed.
    #[error("{op} failed: {message}")]
    Transport { op: Operation, message: String },

    /// indicate the object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// indicate no resolver could produce a resource for the uri.
    #[error("no resource found for {0}")]
    NotResolved(String),

    /// indicate I/O error, had on local resource access.
    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),

    /// indicate an http error, had on url resource access.
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn transport<E: Display>(op: Operation, err: E) -> Self {
        Self::Transport {
            op,
            message: err.to_string(),
        }
    }

    pub(crate) fn not_found<B: Into<String>, K: Into<String>>(bucket: B, key: K) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Returns true if the error means the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The transport operation that failed, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { op, .. } => Some(*op),
            _ => None,
        }
    }
}

impl From<ValueError> for Error {
    fn from(err: ValueError) -> Self {
        Error::ValueError(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ValueError};
    use crate::transport::Operation;

    #[test]
    fn test_error_display() {
        let err = Error::transport(Operation::PutObject, "connection refused");
        assert_eq!(err.to_string(), "PutObject failed: connection refused");
        assert_eq!(err.operation(), Some(Operation::PutObject));
        assert!(!err.is_not_found());

        let err = Error::not_found("root", "file.txt");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "object not found: root/file.txt");

        let err: Error = ValueError::from("Miss endpoint").into();
        assert_eq!(err.to_string(), "invalid value: Miss endpoint");
    }
}
