//! In-memory remote host.
//!
//! `SimulatedRemote` interprets [`RemoteCommand`]s against a shared in-memory
//! filesystem with the same observable semantics as the rendered shell
//! commands: truncating/appending staging writes, `wc -c`, the assembler's
//! exit statuses and its write-temp-then-rename replacement. Faults can be
//! injected per step, staging artifact and chunk sequence. Used by tests and
//! by the CLI's dry-run mode.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shellpush_transfer::escape::unquote;
use shellpush_transfer::{
    EXIT_CANT_CREATE, EXIT_DECODE_FAILED, EXIT_VERIFY_FAILED, RemoteCommand, checksum_bytes,
    encoding,
};

use crate::channel::{ChannelFuture, CommandOutput, RemoteChannel};
use crate::error::ChannelError;

/// What an injected fault does to the matching command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Command runs nothing and exits with this status.
    Exit(i32),
    /// Channel reports a lost connection.
    Disconnect,
    /// Command never completes.
    Hang,
    /// Command reports success without doing anything.
    DropSilently,
}

/// An injected fault and the commands it applies to.
#[derive(Debug, Clone)]
pub struct Fault {
    step: &'static str,
    staging: Option<String>,
    sequence: Option<usize>,
    kind: FaultKind,
}

impl Fault {
    /// Matches every command of `step` (`append`, `measure`, `assemble`, `cleanup`).
    pub fn on(step: &'static str, kind: FaultKind) -> Self {
        Self {
            step,
            staging: None,
            sequence: None,
            kind,
        }
    }

    /// Matches the append of chunk `sequence`.
    pub fn append(sequence: usize, kind: FaultKind) -> Self {
        Self {
            sequence: Some(sequence),
            ..Self::on("append", kind)
        }
    }

    /// Restricts the fault to one staging artifact.
    pub fn for_staging(mut self, staging: impl Into<String>) -> Self {
        self.staging = Some(staging.into());
        self
    }

    fn matches(&self, command: &RemoteCommand) -> bool {
        if self.step != command.step() {
            return false;
        }
        if let Some(staging) = &self.staging
            && staging != command.staging()
        {
            return false;
        }
        match (self.sequence, command) {
            (None, _) => true,
            (Some(want), RemoteCommand::Append { sequence, .. }) => want == *sequence,
            (Some(_), _) => false,
        }
    }
}

#[derive(Default)]
struct RemoteState {
    files: BTreeMap<String, Vec<u8>>,
    read_only: Vec<String>,
    faults: Vec<Fault>,
    log: Vec<String>,
}

/// Shared in-memory remote host. Clones share state.
#[derive(Clone, Default)]
pub struct SimulatedRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl SimulatedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds a remote file.
    pub fn put_file(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.state().files.insert(path.into(), content.into());
    }

    /// Returns a remote file's content.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    /// Lists every remote file path.
    pub fn paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    /// Rendered form of every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state().log.clone()
    }

    /// Makes writes under `dir` fail as they would on a read-only mount.
    pub fn deny_writes_under(&self, dir: impl Into<String>) {
        self.state().read_only.push(dir.into());
    }

    /// Injects a fault. Faults stay active until [`clear_faults`](Self::clear_faults).
    pub fn inject(&self, fault: Fault) {
        self.state().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Applies `command` and returns its outcome, or the fault to act out.
    fn apply(&self, command: &RemoteCommand) -> Result<CommandOutput, FaultKind> {
        let mut state = self.state();
        state.log.push(command.render());

        if let Some(fault) = state.faults.iter().find(|f| f.matches(command)) {
            return Err(fault.kind.clone());
        }

        Ok(state.execute(command))
    }
}

impl RemoteState {
    fn is_read_only(&self, path: &str) -> bool {
        self.read_only.iter().any(|dir| {
            path.strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || dir.ends_with('/'))
        })
    }

    fn execute(&mut self, command: &RemoteCommand) -> CommandOutput {
        match command {
            RemoteCommand::Append {
                staging,
                sequence,
                escaped,
            } => {
                let text = match unquote(escaped) {
                    Ok(text) => text,
                    Err(e) => return CommandOutput::failed(2, format!("sh: syntax error: {e}")),
                };
                if self.is_read_only(staging) {
                    return CommandOutput::failed(1, "sh: cannot create: Read-only file system");
                }
                let file = self.files.entry(staging.clone()).or_default();
                if *sequence == 0 {
                    file.clear();
                }
                file.extend_from_slice(text.as_bytes());
                CommandOutput::ok("")
            }
            RemoteCommand::MeasureStaging { staging } => match self.files.get(staging) {
                Some(data) => CommandOutput::ok(format!("{}\n", data.len())),
                None => CommandOutput::failed(2, "sh: cannot open: No such file"),
            },
            RemoteCommand::Assemble {
                staging,
                target,
                temp,
                dir,
                decoded_len,
                digest,
            } => self.assemble(staging, target, temp, dir, *decoded_len, digest.as_deref()),
            RemoteCommand::RemoveStaging { staging } => {
                self.files.remove(staging);
                CommandOutput::ok("")
            }
        }
    }

    fn assemble(
        &mut self,
        staging: &str,
        target: &str,
        temp: &str,
        dir: &str,
        decoded_len: u64,
        digest: Option<&str>,
    ) -> CommandOutput {
        if self.is_read_only(dir) || self.is_read_only(temp) {
            return CommandOutput::failed(EXIT_CANT_CREATE, "cannot create temp file");
        }

        let decoded = if decoded_len == 0 {
            Vec::new()
        } else {
            let Some(staged) = self.files.get(staging) else {
                return CommandOutput::failed(EXIT_DECODE_FAILED, "staging artifact missing");
            };
            let Ok(text) = std::str::from_utf8(staged) else {
                return CommandOutput::failed(EXIT_DECODE_FAILED, "base64: invalid input");
            };
            match encoding::decode(text) {
                Ok(decoded) => decoded,
                Err(_) => {
                    return CommandOutput::failed(EXIT_DECODE_FAILED, "base64: invalid input");
                }
            }
        };

        if decoded.len() as u64 != decoded_len {
            return CommandOutput::failed(EXIT_VERIFY_FAILED, "length mismatch");
        }
        if let Some(expected) = digest
            && checksum_bytes(&decoded) != expected
        {
            return CommandOutput::failed(EXIT_VERIFY_FAILED, "digest mismatch");
        }

        // A single map insert stands in for the rename: readers see the old
        // content or the new content, never a prefix.
        self.files.insert(target.to_string(), decoded);
        self.files.remove(staging);
        CommandOutput::ok("")
    }
}

impl RemoteChannel for SimulatedRemote {
    fn execute<'a>(&'a self, command: &'a RemoteCommand) -> ChannelFuture<'a> {
        Box::pin(async move {
            // Let other sessions run between commands.
            tokio::task::yield_now().await;

            match self.apply(command) {
                Ok(output) => Ok(output),
                Err(FaultKind::Exit(status)) => {
                    Ok(CommandOutput::failed(status, "injected failure"))
                }
                Err(FaultKind::Disconnect) => Err(ChannelError::Connection(
                    "connection reset by peer".into(),
                )),
                Err(FaultKind::Hang) => std::future::pending().await,
                Err(FaultKind::DropSilently) => Ok(CommandOutput::ok("")),
            }
        })
    }

    fn host(&self) -> &str {
        "simulated"
    }
}
