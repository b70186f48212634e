//! Error kinds for the lifelog client and export pipeline.
//!
//! Callers branch on the variant instead of parsing messages. Each variant
//! carries the structured context (id, path, status) needed to report it.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifelogError>;

#[derive(Debug, Error)]
pub enum LifelogError {
    /// Transport failure or a non-success HTTP status.
    #[error("API request failed: {message}")]
    Request {
        status: Option<u16>,
        message: String,
    },

    /// Response body (or a field inside it) could not be decoded.
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    /// A by-id lookup returned zero records.
    #[error("No lifelog found for ID {id}")]
    NotFound { id: String },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cursor chain did not terminate within the page ceiling.
    #[error("Pagination did not terminate after {pages} pages (last cursor: {cursor:?})")]
    PaginationLoop { pages: usize, cursor: Option<String> },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LifelogError {
    /// Errors that abort a whole run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PaginationLoop { .. } | Self::Configuration(_)
        )
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for LifelogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::decode("response body", err);
        }
        Self::Request {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        let looping = LifelogError::PaginationLoop {
            pages: 100,
            cursor: Some("b".to_string()),
        };
        assert!(looping.is_fatal());
        assert!(LifelogError::Configuration("missing api key".to_string()).is_fatal());

        let not_found = LifelogError::NotFound {
            id: "abc".to_string(),
        };
        assert!(!not_found.is_fatal());
        assert_eq!(not_found.to_string(), "No lifelog found for ID abc");
    }

    #[test]
    fn test_filesystem_message_includes_path() {
        let err = LifelogError::filesystem(
            "/tmp/out/lifelog_x.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/lifelog_x.json"));
        assert!(msg.contains("denied"));
    }
}
