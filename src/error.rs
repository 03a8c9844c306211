//! Error types for the IRC event engine.
//!
//! This module defines error types for protocol-level errors,
//! message parsing failures, event field access and session I/O.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded the configured maximum length.
    #[error("line too long: {actual} bytes (limit {limit})")]
    LineTooLong {
        /// Number of bytes buffered without a terminator.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// A prefix was present but nothing followed it.
    #[error("missing command after prefix {0:?}")]
    MissingCommand(String),

    /// Command was invalid.
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),
}

/// Errors raised when reading a field from an [`Event`](crate::Event).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventError {
    /// The event carries no field of that name.
    #[error("event {kind:?} has no field {field:?}")]
    MissingField {
        /// Event type tag.
        kind: String,
        /// Requested field name.
        field: &'static str,
    },

    /// The field exists but holds another kind of value.
    #[error("field {field:?} of event {kind:?} is {found}, expected {expected}")]
    FieldType {
        /// Event type tag.
        kind: String,
        /// Requested field name.
        field: &'static str,
        /// Variant requested by the caller.
        expected: &'static str,
        /// Variant actually stored.
        found: &'static str,
    },

    /// A protocol event was missing a positional argument.
    #[error("{command} needs at least {expected} arguments, got {got}")]
    NotEnoughArguments {
        /// Command or numeric being handled.
        command: String,
        /// Minimum argument count.
        expected: usize,
        /// Actual argument count.
        got: usize,
    },
}

/// Errors returned by outgoing session operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The writer task has stopped; the connection is gone.
    #[error("connection closed")]
    Closed,

    /// The line contained a CR or LF and would have split on the wire.
    #[error("line contains a line break: {0:?}")]
    LineBreak(String),
}
