//! Runs protocol commands through a local POSIX shell.
//!
//! Delivers to paths on this machine (or a mounted share) through exactly the
//! command lines an ssh host would receive, which makes it the end-to-end
//! harness for the rendered commands and the assembler script.

use shellpush_transfer::RemoteCommand;
use tokio::process::Command;

use crate::channel::{ChannelFuture, RemoteChannel};

/// Executes rendered commands with `sh -c`.
#[derive(Debug, Clone)]
pub struct LocalShellChannel {
    shell: String,
}

impl Default for LocalShellChannel {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl LocalShellChannel {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl RemoteChannel for LocalShellChannel {
    fn execute<'a>(&'a self, command: &'a RemoteCommand) -> ChannelFuture<'a> {
        Box::pin(async move {
            let mut cmd = Command::new(&self.shell);
            cmd.arg("-c").arg(command.render());
            crate::process::run(cmd).await
        })
    }

    fn host(&self) -> &str {
        "localhost"
    }
}
