//! Batch orchestrator.
//!
//! Runs one transport session per file mapping, never stopping early, and
//! aggregates the results. Jobs run sequentially unless the config allows
//! more; jobs for the same resolved target are always serialized.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use shellpush_transfer::{PlanOptions, RemoteLayout, TransferJob};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::channel::RemoteChannel;
use crate::config::TransferConfig;
use crate::error::{ConfigError, JobError};
use crate::locks::PathLocks;
use crate::session::TransportSession;
use crate::types::{BatchReport, FileMapping, TransferEvent, TransferResult};

/// Orchestrates file delivery to one remote host.
pub struct TransferOrchestrator {
    channel: Arc<dyn RemoteChannel>,
    layout: RemoteLayout,
    plan: PlanOptions,
    timeout: Duration,
    verify_staged_length: bool,
    concurrency: usize,
    locks: PathLocks,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TransferEvent>>,
    cancel: CancellationToken,
}

impl TransferOrchestrator {
    /// Creates an orchestrator from a validated config.
    pub fn new(config: &TransferConfig, channel: Arc<dyn RemoteChannel>) -> Result<Self, ConfigError> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            channel,
            layout: config.layout()?,
            plan: config.plan_options(),
            timeout: config.timeout(),
            verify_staged_length: config.verify_staged_length,
            concurrency: config.concurrency,
            locks: PathLocks::new(),
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        })
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransferEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this batch.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Transfers every mapping and returns their results in input order.
    ///
    /// Each job runs to completion (success, or failure plus cleanup)
    /// regardless of how earlier jobs ended.
    pub async fn run(&self, files: &[FileMapping]) -> BatchReport {
        info!(
            host = self.channel.host(),
            files = files.len(),
            concurrency = self.concurrency,
            "starting batch"
        );

        let results = if self.concurrency <= 1 {
            let mut results = Vec::with_capacity(files.len());
            for mapping in files {
                results.push(self.transfer_one(mapping).await);
            }
            results
        } else {
            let mut indexed: Vec<(usize, TransferResult)> = stream::iter(files.iter().enumerate())
                .map(|(i, mapping)| async move { (i, self.transfer_one(mapping).await) })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, r)| r).collect()
        };

        let report = BatchReport { results };
        info!(summary = %report.summary(), "batch finished");
        report
    }

    async fn transfer_one(&self, mapping: &FileMapping) -> TransferResult {
        let outcome = self.deliver(mapping).await;

        let result = TransferResult {
            local_path: mapping.local.clone(),
            remote_path: mapping.remote.clone(),
            succeeded: outcome.is_ok(),
            error_kind: outcome.as_ref().err().map(JobError::kind),
            error: outcome.as_ref().err().map(ToString::to_string),
        };

        match &outcome {
            Ok(()) => {
                info!(local = %mapping.local.display(), remote = %mapping.remote, "transfer completed");
                let _ = self.events_tx.send(TransferEvent::Completed(result.clone()));
            }
            Err(e) => {
                error!(local = %mapping.local.display(), remote = %mapping.remote, error = %e, "transfer failed");
                let _ = self.events_tx.send(TransferEvent::Failed(result.clone()));
            }
        }

        result
    }

    async fn deliver(&self, mapping: &FileMapping) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let content = tokio::fs::read(&mapping.local)
            .await
            .map_err(|source| JobError::LocalFileMissing {
                path: mapping.local.clone(),
                source,
            })?;

        let target = self.layout.resolve(&mapping.remote)?;
        let job = TransferJob::plan(&mapping.local, target, &content, &self.plan)?;

        // Held until the session (including cleanup) has resolved.
        let _guard = self.locks.lock(job.remote_path()).await;

        let _ = self.events_tx.send(TransferEvent::Started {
            remote_path: job.remote_path().to_string(),
            chunks: job.chunks().len(),
        });

        TransportSession::new(self.channel.as_ref(), self.timeout)
            .verify_staged_length(self.verify_staged_length)
            .with_cancel(self.cancel.clone())
            .with_events(self.events_tx.clone())
            .run(&job)
            .await
    }
}


#[cfg(all(test, unix))]
mod shell_tests {
    use super::*;
    use crate::channel::{ChannelFuture, CommandOutput};
    use crate::error::ErrorKind;
    use crate::local::LocalShellChannel;
    use shellpush_transfer::RemoteCommand;
    use std::path::Path;

    /// Reports success for one append without running it.
    struct DropAppend {
        inner: LocalShellChannel,
        sequence: usize,
    }

    impl RemoteChannel for DropAppend {
        fn execute<'a>(&'a self, command: &'a RemoteCommand) -> ChannelFuture<'a> {
            if let RemoteCommand::Append { sequence, .. } = command
                && *sequence == self.sequence
            {
                return Box::pin(async { Ok(CommandOutput::ok("")) });
            }
            self.inner.execute(command)
        }

        fn host(&self) -> &str {
            self.inner.host()
        }
    }

    fn shell_config(root: &Path, files: Vec<FileMapping>) -> TransferConfig {
        let root = root.to_string_lossy().into_owned();
        TransferConfig {
            base_path: Some(format!("{root}/remote")),
            staging_dir: root,
            files,
            max_chunk_len: Some(256),
            ..TransferConfig::new("localhost")
        }
    }

    async fn run_with(
        config: &TransferConfig,
        channel: Arc<dyn RemoteChannel>,
    ) -> Vec<TransferResult> {
        TransferOrchestrator::new(config, channel)
            .unwrap()
            .run(&config.files)
            .await
            .results
    }

    fn leftovers(root: &Path) -> Vec<String> {
        std::fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("shellpush-") || name.contains(".shellpush-"))
            .collect()
    }

    #[tokio::test]
    async fn delivers_arbitrary_bytes_through_sh() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = b"it's a \"test\" \\ with $HOME and `cmd`\n".to_vec();
        content.extend((0..=255u8).cycle().take(2000));
        let local = dir.path().join("payload.bin");
        std::fs::write(&local, &content).unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, b"").unwrap();

        let config = shell_config(
            dir.path(),
            vec![
                FileMapping::new(&local, "deep/nested/payload.bin"),
                FileMapping::new(&empty, "empty.txt"),
            ],
        );
        let results = run_with(&config, Arc::new(LocalShellChannel::default())).await;

        assert!(results.iter().all(|r| r.succeeded), "{results:?}");
        let remote = dir.path().join("remote");
        assert_eq!(std::fs::read(remote.join("deep/nested/payload.bin")).unwrap(), content);
        assert_eq!(std::fs::read(remote.join("empty.txt")).unwrap(), b"");
        assert!(leftovers(dir.path()).is_empty());
        assert!(leftovers(&remote.join("deep/nested")).is_empty());
    }

    #[tokio::test]
    async fn failed_assembly_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("new.ts");
        std::fs::write(&local, "export const version = 2;\n".repeat(40)).unwrap();
        let remote = dir.path().join("remote");
        std::fs::create_dir_all(&remote).unwrap();
        std::fs::write(remote.join("app.ts"), b"export const version = 1;\n").unwrap();

        let mut config = shell_config(dir.path(), vec![FileMapping::new(&local, "app.ts")]);
        config.verify_staged_length = false;
        let channel = DropAppend {
            inner: LocalShellChannel::default(),
            sequence: 1,
        };
        let results = run_with(&config, Arc::new(channel)).await;

        assert_eq!(results[0].error_kind, Some(ErrorKind::ChecksumMismatch));
        assert_eq!(
            std::fs::read(remote.join("app.ts")).unwrap(),
            b"export const version = 1;\n"
        );
        assert!(leftovers(dir.path()).is_empty());
        assert!(leftovers(&remote).is_empty());
    }

    #[tokio::test]
    async fn length_probe_stops_before_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("new.ts");
        std::fs::write(&local, "x".repeat(1500)).unwrap();

        let config = shell_config(dir.path(), vec![FileMapping::new(&local, "app.ts")]);
        let channel = DropAppend {
            inner: LocalShellChannel::default(),
            sequence: 0,
        };
        let results = run_with(&config, Arc::new(channel)).await;

        assert_eq!(results[0].error_kind, Some(ErrorKind::ChecksumMismatch));
        assert!(!dir.path().join("remote/app.ts").exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn unstaged_single_chunk_is_a_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("small.ts");
        std::fs::write(&local, b"small").unwrap();

        let config = shell_config(dir.path(), vec![FileMapping::new(&local, "small.ts")]);
        let channel = DropAppend {
            inner: LocalShellChannel::default(),
            sequence: 0,
        };
        let results = run_with(&config, Arc::new(channel)).await;

        assert_eq!(results[0].error_kind, Some(ErrorKind::ChecksumMismatch));
        assert!(!dir.path().join("remote/small.ts").exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn directory_in_the_way_is_a_remote_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.ts");
        std::fs::write(&local, b"a").unwrap();
        std::fs::create_dir_all(dir.path().join("remote/a.ts")).unwrap();

        let config = shell_config(dir.path(), vec![FileMapping::new(&local, "a.ts")]);
        let results = run_with(&config, Arc::new(LocalShellChannel::default())).await;

        assert_eq!(results[0].error_kind, Some(ErrorKind::RemoteWrite));
        assert!(dir.path().join("remote/a.ts").is_dir());
        assert!(leftovers(dir.path()).is_empty());
    }
}
