//! Remote command channel abstraction.
//!
//! `RemoteChannel` is the only seam between the transfer protocol and the
//! outside world. [`SshChannel`](crate::SshChannel) is the production
//! implementation; [`LocalShellChannel`](crate::LocalShellChannel) and
//! [`SimulatedRemote`](crate::SimulatedRemote) run the same protocol locally.

use std::future::Future;
use std::pin::Pin;

use shellpush_transfer::RemoteCommand;

use crate::error::ChannelError;

/// Future returned by [`RemoteChannel::execute`].
pub type ChannelFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, ChannelError>> + Send + 'a>>;

/// Exit status and captured output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given status and stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executes protocol commands on one remote host.
///
/// Every call is one independent, blocking round trip. Implementations must
/// not retry on their own; the session decides what a failure means.
pub trait RemoteChannel: Send + Sync {
    /// Runs `command` and returns its exit status and output.
    ///
    /// `Err` means the command could not be run or its outcome is unknown
    /// (spawn failure, lost connection). A command that ran and failed is
    /// `Ok` with a non-zero status.
    fn execute<'a>(&'a self, command: &'a RemoteCommand) -> ChannelFuture<'a>;

    /// Host this channel talks to, for logs.
    fn host(&self) -> &str;
}
