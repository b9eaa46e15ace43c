//! Domain error types

use thiserror::Error;

/// Failures of a single exchange with a rigctld/rotctld daemon.
///
/// None of these are fatal: the control loops turn them into an
/// error-counter increment and carry on with cached values.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Socket could not be opened (bad host, daemon down, unreachable).
    #[error("Connect error: {0}")]
    Connect(String),

    /// Empty or malformed reply, or an `RPRT` error code.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The socket accepted fewer bytes than the command length.
    #[error("Write size error: wrote {written} of {expected} bytes")]
    WriteSize { written: usize, expected: usize },

    /// Read/write failure on an established connection.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors surfaced by configuration loading and the control worker
#[derive(Error, Debug)]
pub enum SatctlError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type alias for daemon exchanges
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type alias for everything else
pub type SatctlResult<T> = Result<T, SatctlError>;
