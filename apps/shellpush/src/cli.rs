//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use shellpush_deploy::{FileMapping, TransferConfig};

/// Deliver local files to a remote host over ssh using only short shell
/// commands.
///
/// Files come from `--config` and/or `LOCAL=REMOTE` arguments. Relative
/// remote paths resolve under `--base-path`.
#[derive(Parser, Debug)]
#[command(name = "shellpush")]
#[command(version)]
pub struct Cli {
    /// JSON config file with host, base path and file list.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Remote host (`user@host` or an ssh config alias).
    #[arg(long)]
    pub host: Option<String>,

    /// Directory relative remote paths resolve under.
    #[arg(long)]
    pub base_path: Option<String>,

    /// Maximum length of one remote command in bytes.
    #[arg(long)]
    pub ceiling: Option<usize>,

    /// Cap on encoded characters per chunk.
    #[arg(long)]
    pub chunk_len: Option<usize>,

    /// Per-command timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of files transferred at once.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Remote directory for staging artifacts.
    #[arg(long)]
    pub staging_dir: Option<String>,

    /// SSH port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// SSH identity file.
    #[arg(short, long)]
    pub identity: Option<PathBuf>,

    /// Skip the SHA-256 check on the remote side.
    #[arg(long)]
    pub no_digest: bool,

    /// Skip the staged length probe before assembly.
    #[arg(long)]
    pub no_length_check: bool,

    /// Run against an in-memory remote and print the commands instead.
    #[arg(long, conflicts_with = "local_shell")]
    pub dry_run: bool,

    /// Run the commands through a local `sh` instead of ssh.
    #[arg(long)]
    pub local_shell: bool,

    /// Extra files as `LOCAL=REMOTE`.
    #[arg(value_name = "LOCAL=REMOTE", value_parser = parse_mapping)]
    pub files: Vec<FileMapping>,
}

impl Cli {
    /// Layers command-line values over `config`.
    pub fn apply(&self, config: &mut TransferConfig) {
        if let Some(host) = &self.host {
            config.remote_host = host.clone();
        }
        if let Some(base) = &self.base_path {
            config.base_path = Some(base.clone());
        }
        if let Some(ceiling) = self.ceiling {
            config.channel_ceiling = ceiling;
        }
        if let Some(len) = self.chunk_len {
            config.max_chunk_len = Some(len);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(dir) = &self.staging_dir {
            config.staging_dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.ssh.port = Some(port);
        }
        if let Some(identity) = &self.identity {
            config.ssh.identity_file = Some(identity.clone());
        }
        if self.no_digest {
            config.verify_digest = false;
        }
        if self.no_length_check {
            config.verify_staged_length = false;
        }
        config.files.extend(self.files.iter().cloned());
    }
}

fn parse_mapping(arg: &str) -> Result<FileMapping, String> {
    match arg.split_once('=') {
        Some((local, remote)) if !local.is_empty() && !remote.is_empty() => {
            Ok(FileMapping::new(local, remote))
        }
        _ => Err(format!("expected LOCAL=REMOTE, got {arg:?}")),
    }
}
