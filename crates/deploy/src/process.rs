use std::process::Stdio;

use tokio::process::Command;

use crate::channel::CommandOutput;
use crate::error::ChannelError;

/// Runs a prepared command to completion and captures its output.
///
/// The child is killed if the returned future is dropped, so a session
/// timeout or cancellation never leaves a stray process behind.
pub(crate) async fn run(mut cmd: Command) -> Result<CommandOutput, ChannelError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd.output().await?;

    Ok(CommandOutput {
        // Killed by a signal: no exit code.
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
