//! Error taxonomy shared by the decomposition, resolution and forwarding paths.
//!
//! A missing message or part is a `NotFound` variant, never an empty value,
//! and a parse or relay failure is never folded into "no content".

use std::path::PathBuf;

use thiserror::Error;

use crate::store::MessageId;

/// Errors produced by a [`MessageStore`](crate::store::MessageStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// No message with this identifier exists.
    #[error("message {0} not found")]
    NotFound(MessageId),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The stored entry exists but cannot be turned into a message.
    #[error("corrupt store entry: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// The raw bytes violate MIME structural rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecomposeError {
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Errors produced while loading the derived views of a message.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("message {0} not found")]
    NotFound(MessageId),

    #[error(transparent)]
    Malformed(#[from] DecomposeError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for MessageError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => MessageError::NotFound(id),
            other => MessageError::Store(other),
        }
    }
}

/// Errors produced while resolving a single part of a message.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The message or the requested part does not exist.
    #[error("part not found")]
    NotFound,

    #[error(transparent)]
    Malformed(#[from] DecomposeError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<MessageError> for ResolveError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::NotFound(_) => ResolveError::NotFound,
            MessageError::Malformed(e) => ResolveError::Malformed(e),
            MessageError::Store(e) => ResolveError::Store(e),
        }
    }
}

impl From<StoreError> for ResolveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ResolveError::NotFound,
            other => ResolveError::Store(other),
        }
    }
}

/// Errors produced by an outbound [`Relay`](crate::relay::Relay).
#[derive(Error, Debug)]
pub enum RelayError {
    /// The relay permanently rejected an envelope address.
    #[error("invalid envelope address: {0}")]
    InvalidAddress(String),

    /// The relay could not accept the message.
    #[error("relay unavailable: {0}")]
    Unavailable(String),
}

/// Errors produced by the [`ForwardingAgent`](crate::relay::ForwardingAgent).
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("relay unavailable: {0}")]
    RelayUnavailable(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ForwardError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ForwardError::MessageNotFound(id),
            other => ForwardError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_resolve_not_found() {
        let err: ResolveError = StoreError::NotFound(MessageId(7)).into();
        assert!(matches!(err, ResolveError::NotFound));
    }

    #[test]
    fn test_store_io_stays_a_store_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ResolveError = StoreError::io("/tmp/x.eml", io).into();
        assert!(matches!(err, ResolveError::Store(StoreError::Io { .. })));
    }

    #[test]
    fn test_malformed_message_stays_malformed_when_resolving() {
        let err: ResolveError =
            MessageError::Malformed(DecomposeError::Malformed("bad".to_string())).into();
        assert!(matches!(err, ResolveError::Malformed(_)));
    }

    #[test]
    fn test_store_not_found_maps_to_forward_message_not_found() {
        let err: ForwardError = StoreError::NotFound(MessageId(3)).into();
        match err {
            ForwardError::MessageNotFound(id) => assert_eq!(id, MessageId(3)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
