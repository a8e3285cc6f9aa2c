//! `ssh`-backed remote channel.
//!
//! Each protocol step spawns `ssh <host> <command>`. Authentication is left to
//! the user's ssh setup (agent, keys, `~/.ssh/config`); `BatchMode` keeps ssh
//! from ever prompting.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shellpush_transfer::RemoteCommand;
use tokio::process::Command;
use tracing::trace;

use crate::channel::{ChannelFuture, RemoteChannel};
use crate::error::ChannelError;

/// Exit status ssh uses for its own failures (connection, auth).
const SSH_ERROR_STATUS: i32 = 255;

/// SSH client options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshOptions {
    /// Remote port. `None` uses ssh's default or `~/.ssh/config`.
    pub port: Option<u16>,

    /// Path to an identity file (private key).
    pub identity_file: Option<PathBuf>,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Verify the remote host key. Only disable for ephemeral test hosts.
    pub strict_host_key_checking: bool,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            port: None,
            identity_file: None,
            connect_timeout_secs: 10,
            strict_host_key_checking: true,
        }
    }
}

/// Runs protocol commands on `host` through the system `ssh` client.
#[derive(Debug, Clone)]
pub struct SshChannel {
    host: String,
    options: SshOptions,
}

impl SshChannel {
    /// Creates a channel for `host` (`user@host` or an ssh config alias).
    pub fn new(host: impl Into<String>, options: SshOptions) -> Self {
        Self {
            host: host.into(),
            options,
        }
    }

    /// Builds the `ssh` invocation for one rendered command line.
    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-T").arg("-o").arg("BatchMode=yes");

        let timeout = Duration::from_secs(self.options.connect_timeout_secs.max(1));
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", timeout.as_secs()));

        if let Some(port) = self.options.port {
            cmd.arg("-p").arg(port.to_string());
        }

        if let Some(identity) = &self.options.identity_file {
            cmd.arg("-i").arg(identity);
        }

        if !self.options.strict_host_key_checking {
            cmd.arg("-o").arg("StrictHostKeyChecking=no");
            cmd.arg("-o").arg("UserKnownHostsFile=/dev/null");
        }

        cmd.arg(&self.host).arg(remote_command);
        cmd
    }
}

impl RemoteChannel for SshChannel {
    fn execute<'a>(&'a self, command: &'a RemoteCommand) -> ChannelFuture<'a> {
        Box::pin(async move {
            let rendered = command.render();
            trace!(host = %self.host, step = command.step(), len = rendered.len(), "ssh exec");

            let output = crate::process::run(self.command(&rendered)).await?;
            if output.status == SSH_ERROR_STATUS {
                return Err(ChannelError::Connection(output.stderr.trim().to_string()));
            }
            Ok(output)
        })
    }

    fn host(&self) -> &str {
        &self.host
    }
}
