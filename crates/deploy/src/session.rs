//! Per-job transport session.
//!
//! Drives one planned [`TransferJob`] through the remote protocol:
//! 1. Append every chunk to the staging artifact, in sequence order
//! 2. Optionally compare the staged length with the encoded length
//! 3. Run the remote assembler
//!
//! Any failure stops the job and triggers a best-effort staging cleanup.

use std::time::Duration;

use shellpush_transfer::{
    EXIT_CANT_CREATE, EXIT_DECODE_FAILED, EXIT_VERIFY_FAILED, RemoteCommand, TransferJob,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::{CommandOutput, RemoteChannel};
use crate::error::JobError;
use crate::types::TransferEvent;

/// Runs a single transfer job against one channel.
pub struct TransportSession<'a> {
    channel: &'a dyn RemoteChannel,
    timeout: Duration,
    verify_staged_length: bool,
    cancel: CancellationToken,
    events: Option<UnboundedSender<TransferEvent>>,
}

impl<'a> TransportSession<'a> {
    /// Creates a session with a per-command `timeout`.
    pub fn new(channel: &'a dyn RemoteChannel, timeout: Duration) -> Self {
        Self {
            channel,
            timeout,
            verify_staged_length: true,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn verify_staged_length(mut self, enabled: bool) -> Self {
        self.verify_staged_length = enabled;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<TransferEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Delivers `job`, cleaning up the staging artifact on failure.
    pub async fn run(&self, job: &TransferJob) -> Result<(), JobError> {
        match self.deliver(job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.cleanup(job).await;
                Err(e)
            }
        }
    }

    async fn deliver(&self, job: &TransferJob) -> Result<(), JobError> {
        let total = job.chunks().len();

        for (sent, cmd) in job.append_commands().enumerate() {
            self.check_cancelled()?;
            self.execute_ok(&cmd).await?;
            self.emit_progress(job, sent + 1, total);
        }

        if self.verify_staged_length && total > 0 {
            self.check_cancelled()?;
            self.check_staged_length(job).await?;
        }

        self.check_cancelled()?;
        let cmd = job.assemble_command();
        let out = self.execute(&cmd).await?;
        match out.status {
            0 => Ok(()),
            EXIT_DECODE_FAILED => Err(JobError::ChecksumMismatch(format!(
                "staged payload failed to decode: {}",
                out.stderr.trim()
            ))),
            EXIT_VERIFY_FAILED => Err(JobError::ChecksumMismatch(format!(
                "assembled content differs from {} bytes / sha256 {}",
                job.payload_len(),
                job.digest()
            ))),
            EXIT_CANT_CREATE => Err(JobError::RemoteWrite(format!(
                "cannot write {}: {}",
                job.remote_path(),
                out.stderr.trim()
            ))),
            status => Err(transport_failure(&cmd, &out, status)),
        }
    }

    async fn check_staged_length(&self, job: &TransferJob) -> Result<(), JobError> {
        let cmd = job.measure_command();
        let out = self.execute(&cmd).await?;
        // `wc -c <` only fails when the staging artifact cannot be opened,
        // i.e. nothing was staged.
        if !out.success() {
            return Err(JobError::ChecksumMismatch(format!(
                "staging artifact unreadable, expected {} bytes: {}",
                job.encoded_len(),
                out.stderr.trim()
            )));
        }
        let staged: usize = out.stdout.trim().parse().map_err(|_| JobError::Transport {
            step: cmd.step(),
            detail: format!("unexpected output {:?}", out.stdout),
        })?;

        if staged != job.encoded_len() {
            return Err(JobError::ChecksumMismatch(format!(
                "staged {staged} bytes, expected {}",
                job.encoded_len()
            )));
        }
        Ok(())
    }

    /// Runs one command under the per-command timeout, honoring cancellation.
    async fn execute(&self, cmd: &RemoteCommand) -> Result<CommandOutput, JobError> {
        debug!(
            host = self.channel.host(),
            step = cmd.step(),
            staging = cmd.staging(),
            "remote exec"
        );

        tokio::select! {
            _ = self.cancel.cancelled() => Err(JobError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.channel.execute(cmd)) => match res {
                Err(_) => Err(JobError::Transport {
                    step: cmd.step(),
                    detail: format!("timed out after {:?}", self.timeout),
                }),
                Ok(Err(e)) => Err(JobError::Transport {
                    step: cmd.step(),
                    detail: e.to_string(),
                }),
                Ok(Ok(out)) => Ok(out),
            },
        }
    }

    /// Like [`execute`](Self::execute) but treats any non-zero exit as a transport failure.
    async fn execute_ok(&self, cmd: &RemoteCommand) -> Result<CommandOutput, JobError> {
        let out = self.execute(cmd).await?;
        if out.success() {
            Ok(out)
        } else {
            Err(transport_failure(cmd, &out, out.status))
        }
    }

    /// Removes the staging artifact. Failures are logged and swallowed.
    async fn cleanup(&self, job: &TransferJob) {
        let cmd = job.cleanup_command();
        match tokio::time::timeout(self.timeout, self.channel.execute(&cmd)).await {
            Ok(Ok(out)) if out.success() => {
                debug!(staging = cmd.staging(), "staging artifact removed");
            }
            Ok(Ok(out)) => {
                warn!(staging = cmd.staging(), status = out.status, "staging cleanup failed");
            }
            Ok(Err(e)) => {
                warn!(staging = cmd.staging(), error = %e, "staging cleanup failed");
            }
            Err(_) => {
                warn!(staging = cmd.staging(), "staging cleanup timed out");
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit_progress(&self, job: &TransferJob, sent: usize, total: usize) {
        if let Some(events) = &self.events {
            let _ = events.send(TransferEvent::Progress {
                remote_path: job.remote_path().to_string(),
                sent,
                total,
            });
        }
    }
}

fn transport_failure(cmd: &RemoteCommand, out: &CommandOutput, status: i32) -> JobError {
    let stderr = out.stderr.trim();
    let detail = if stderr.is_empty() {
        format!("exit status {status}")
    } else {
        format!("exit status {status}: {stderr}")
    };
    JobError::Transport {
        step: cmd.step(),
        detail,
    }
}
