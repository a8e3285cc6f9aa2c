//! Wires config, channel and orchestrator together for one batch.

use std::sync::Arc;

use anyhow::Context;
use shellpush_deploy::{
    BatchReport, LocalShellChannel, RemoteChannel, SimulatedRemote, SshChannel, TransferConfig,
    TransferEvent, TransferOrchestrator,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cli::Cli;

/// Runs the batch described by `cli` and reports whether every file landed.
pub async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = build_config(&cli)?;
    if config.files.is_empty() {
        tracing::warn!("no files to transfer");
    }

    let simulated = cli.dry_run.then(SimulatedRemote::new);
    let channel: Arc<dyn RemoteChannel> = match &simulated {
        Some(remote) => Arc::new(remote.clone()),
        None if cli.local_shell => Arc::new(LocalShellChannel::default()),
        None => Arc::new(SshChannel::new(&config.remote_host, config.ssh.clone())),
    };

    let mut orchestrator =
        TransferOrchestrator::new(&config, channel).context("invalid configuration")?;
    let events = orchestrator
        .take_events()
        .context("event receiver already taken")?;
    let printer = tokio::spawn(print_events(events));

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling remaining transfers");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(&config.files).await;
    // Closes the event stream so the printer can finish.
    drop(orchestrator);
    let _ = printer.await;

    if let Some(remote) = simulated {
        for command in remote.commands() {
            println!("{command}");
        }
    }
    println!("{}", summary_line(&report));

    Ok(report.all_succeeded())
}

/// Final line of every run, printed even for an empty batch.
fn summary_line(report: &BatchReport) -> String {
    format!("Uploaded: {}", report.summary())
}

fn build_config(cli: &Cli) -> anyhow::Result<TransferConfig> {
    let mut config = match &cli.config {
        Some(path) => TransferConfig::load(path)?,
        None => TransferConfig::default(),
    };
    cli.apply(&mut config);
    if cli.dry_run && config.remote_host.is_empty() {
        config.remote_host = "dry-run".into();
    }
    if cli.local_shell && config.remote_host.is_empty() {
        config.remote_host = "localhost".into();
    }
    Ok(config)
}

async fn print_events(mut events: UnboundedReceiver<TransferEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            TransferEvent::Started { remote_path, chunks } => {
                tracing::debug!(remote = %remote_path, chunks, "transfer started");
            }
            TransferEvent::Progress {
                remote_path,
                sent,
                total,
            } => {
                tracing::trace!(remote = %remote_path, sent, total, "chunk staged");
            }
            TransferEvent::Completed(result) | TransferEvent::Failed(result) => {
                println!("{}", result.status_line());
            }
        }
    }
}
