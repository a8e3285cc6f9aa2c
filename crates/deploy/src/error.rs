//! Deploy error types.

use std::path::PathBuf;

/// Errors raised by a [`RemoteChannel`](crate::RemoteChannel) itself, as
/// opposed to a command that ran and exited non-zero.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Broad classification of a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LocalFileMissing,
    InvalidPath,
    EncodingOverflow,
    Transport,
    ChecksumMismatch,
    RemoteWrite,
    Cancelled,
}

/// Errors that fail a single transfer job. None of them abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("local file unreadable: {}: {source}", path.display())]
    LocalFileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Plan(#[from] shellpush_transfer::TransferError),

    #[error("{step} command failed: {detail}")]
    Transport { step: &'static str, detail: String },

    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    #[error("cancelled")]
    Cancelled,
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        use shellpush_transfer::TransferError;

        match self {
            Self::LocalFileMissing { .. } => ErrorKind::LocalFileMissing,
            Self::Plan(TransferError::EncodingOverflow { .. }) => ErrorKind::EncodingOverflow,
            Self::Plan(TransferError::InvalidPath(_)) => ErrorKind::InvalidPath,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::ChecksumMismatch(_) => ErrorKind::ChecksumMismatch,
            Self::RemoteWrite(_) => ErrorKind::RemoteWrite,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Errors loading or validating a [`TransferConfig`](crate::TransferConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
