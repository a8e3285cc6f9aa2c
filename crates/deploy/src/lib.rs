//! File delivery over a command-only remote channel.
//!
//! This crate drives planned [`TransferJob`](shellpush_transfer::TransferJob)s
//! against a remote host that only accepts length-limited shell commands.
//! It has no CLI dependencies; the `shellpush` binary wires a config and an
//! [`SshChannel`] into a [`TransferOrchestrator`].
//!
//! # Pipeline
//!
//! 1. **Read** the local file and resolve its remote target
//! 2. **Plan** the encoded chunks and the commands that carry them
//! 3. **Stage** each chunk by appending it to a remote staging artifact
//! 4. **Assemble** the target remotely: decode, verify, rename into place
//! 5. **Clean up** the staging artifact if anything went wrong

pub mod channel;
pub mod config;
pub mod error;
pub mod local;
pub mod locks;
pub mod orchestrator;
mod process;
pub mod session;
pub mod simulated;
pub mod ssh;
pub mod types;

// Re-export primary types for convenience.
pub use channel::{ChannelFuture, CommandOutput, RemoteChannel};
pub use config::{DEFAULT_TIMEOUT_SECS, TransferConfig};
pub use error::{ChannelError, ConfigError, ErrorKind, JobError};
pub use local::LocalShellChannel;
pub use orchestrator::TransferOrchestrator;
pub use session::TransportSession;
pub use simulated::{Fault, FaultKind, SimulatedRemote};
pub use ssh::{SshChannel, SshOptions};
pub use types::{BatchReport, FileMapping, TransferEvent, TransferResult};
