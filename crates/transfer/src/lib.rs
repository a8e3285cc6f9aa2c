//! Local half of the shellpush transfer protocol.
//!
//! Turns file content into a plan of bounded-length shell commands:
//! base64 encoding, chunking under a channel ceiling, shell quoting, remote
//! path layout and the remote assembler script. Nothing here touches the
//! network; `shellpush-deploy` executes the plans.

pub mod checksum;
pub mod chunker;
pub mod command;
pub mod encoding;
pub mod escape;
pub mod job;
pub mod layout;
mod types;

pub use checksum::checksum_bytes;
pub use chunker::{ChunkBudget, ChunkOverflow};
pub use command::{
    ASSEMBLER_SCRIPT, EXIT_CANT_CREATE, EXIT_DECODE_FAILED, EXIT_VERIFY_FAILED, RemoteCommand,
};
pub use job::{PlanOptions, TransferJob};
pub use layout::{DEFAULT_STAGING_DIR, RemoteLayout, RemoteTarget};
pub use types::{Chunk, STAGING_ID_LEN, StagingId};

/// Default maximum length of a single remote command, in bytes.
///
/// Comfortably below common `ARG_MAX`/sshd limits while keeping the number of
/// round trips for typical source files small.
pub const DEFAULT_CHANNEL_CEILING: usize = 10 * 1024;

/// Errors produced while planning a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("channel ceiling of {ceiling} bytes is too small for the {step} command ({required} bytes)")]
    EncodingOverflow {
        step: &'static str,
        ceiling: usize,
        required: usize,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
