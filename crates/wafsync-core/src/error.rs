//! Error types for the WAF sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for WAF sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Structured protocol error kinds returned by the firewall gateway.
///
/// Each kind corresponds to one error code of the firewall's mutation API.
/// None of these are retried internally; every one aborts the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolErrorKind {
    /// The change token has expired or was already consumed. A fresh token
    /// must be issued before retrying; this system surfaces the error and
    /// exits instead of retrying.
    StaleChangeToken,
    /// Internal failure on the firewall side.
    InternalError,
    /// The account is not authorized for the operation.
    InvalidAccount,
    /// The requested operation is not valid in the current state.
    InvalidOperation,
    /// A parameter was rejected, typically a malformed CIDR that slipped
    /// past local validation.
    InvalidParameter,
    /// The target IP set ID does not exist.
    NonexistentContainer,
    /// A delete referenced an entry the remote set does not hold.
    NonexistentItem,
    /// The IP set is still referenced by a rule and cannot be mutated this way.
    ReferencedItem,
    /// Too many entries in one batch or in the set overall.
    LimitsExceeded,
}

impl std::fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StaleChangeToken => "StaleChangeToken",
            Self::InternalError => "InternalError",
            Self::InvalidAccount => "InvalidAccount",
            Self::InvalidOperation => "InvalidOperation",
            Self::InvalidParameter => "InvalidParameter",
            Self::NonexistentContainer => "NonexistentContainer",
            Self::NonexistentItem => "NonexistentItem",
            Self::ReferencedItem => "ReferencedItem",
            Self::LimitsExceeded => "LimitsExceeded",
        };
        f.write_str(name)
    }
}

/// Core error type for the WAF sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Insert was called with an empty desired list. Inserting zero entries
    /// is a caller error, not a no-op.
    #[error("nothing to insert: desired prefix list is empty")]
    NoWork,

    /// A malformed CIDR reached the reconciler. The published feed is trusted
    /// to be well-formed, so this aborts the whole run.
    #[error("invalid CIDR in feed: {0}")]
    InvalidInput(String),

    /// Prefix source fetch/parse failure
    #[error("prefix source error: {0}")]
    Source(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Opaque transport or auth failure from the gateway, propagated verbatim
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// Structured protocol error from the gateway, tagged with its kind
    #[error("gateway protocol error ({kind}): {message}")]
    Protocol {
        /// Which protocol error code the gateway returned
        kind: ProtocolErrorKind,
        /// The gateway's message, verbatim
        message: String,
    },
}

impl Error {
    /// Create a prefix source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a gateway transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a gateway protocol error with its kind tag
    pub fn protocol(kind: ProtocolErrorKind, message: impl Into<String>) -> Self {
        Self::Protocol {
            kind,
            message: message.into(),
        }
    }

    /// The protocol error kind, if this is a structured gateway error
    pub fn protocol_kind(&self) -> Option<ProtocolErrorKind> {
        match self {
            Self::Protocol { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_kind_is_tagged_in_message() {
        let err = Error::protocol(ProtocolErrorKind::StaleChangeToken, "token consumed");
        assert!(err.to_string().contains("StaleChangeToken"));
        assert_eq!(
            err.protocol_kind(),
            Some(ProtocolErrorKind::StaleChangeToken)
        );
    }

    #[test]
    fn transport_errors_have_no_protocol_kind() {
        let err = Error::transport("connection reset");
        assert_eq!(err.protocol_kind(), None);
    }
}
