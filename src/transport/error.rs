//! Transport error types.

use thiserror::Error;

use crate::error::ProtocolError;

/// Why a reader or writer task stopped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Reading failed with a fatal error, or kept failing past the retry
    /// limit.
    #[error("read failed after {attempts} attempt(s): {source}")]
    Read {
        /// Consecutive failed reads, including the last one.
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// Writing a queued line failed.
    #[error("write failed: {0}")]
    Write(#[source] ProtocolError),

    /// The line codec failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The task panicked or was cancelled.
    #[error("transport task ended abnormally: {0}")]
    Task(String),
}

/// How the reader task finished.
#[derive(Debug)]
pub enum TransportExit {
    /// The peer closed the connection.
    Closed,
    /// The connection failed.
    Failed(TransportError),
}

impl TransportExit {
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportExit::Closed)
    }
}
