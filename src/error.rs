//! Error types for the distributed cache

use std::sync::Arc;

use thiserror::Error;

/// Opaque error produced by a caller-supplied loader.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a cache lookup.
///
/// `Error` is `Clone` so that one coalesced outcome can be handed to every
/// caller waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Empty key passed to `Group::get`
    #[error("cache key is required")]
    InvalidKey,

    /// The loader could not produce a value; its message is surfaced verbatim
    #[error(transparent)]
    Load(Arc<dyn std::error::Error + Send + Sync>),

    /// A request to a peer node failed (network, status or decode)
    #[error("request to node {node} failed: {reason}")]
    Remote { node: String, reason: String },

    /// No group registered under the name
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// Something that may be registered once was registered twice
    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// Group built without a loader
    #[error("group {0} requires a loader")]
    MissingLoader(String),

    /// Malformed peer request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a loader failure.
    pub fn load(err: BoxError) -> Self {
        Error::Load(Arc::from(err))
    }

    /// Build a remote failure for `node`.
    pub fn remote(node: impl Into<String>, reason: impl ToString) -> Self {
        Error::Remote {
            node: node.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that `Group::get` recovers from by loading locally.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_is_verbatim() {
        let err = Error::load("Tom not exist".into());
        assert_eq!(err.to_string(), "Tom not exist");
    }

    #[test]
    fn test_error_clone_shares_source() {
        let err = Error::load("boom".into());
        let copy = err.clone();
        match (&err, &copy) {
            (Error::Load(a), Error::Load(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected load errors"),
        }
    }

    #[test]
    fn test_remote_error_display() {
        let err = Error::remote("http://localhost:8002", "server returned 500");
        assert!(err.is_remote());
        assert_eq!(
            err.to_string(),
            "request to node http://localhost:8002 failed: server returned 500"
        );
    }
}
