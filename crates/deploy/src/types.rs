//! Data types for the transfer flow.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// One local file and where it should land remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    /// Local source path.
    pub local: PathBuf,
    /// Remote destination: relative to the base path, or absolute.
    pub remote: String,
}

impl FileMapping {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Outcome of one transfer job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub local_path: PathBuf,
    /// Remote path as given in the mapping.
    pub remote_path: String,
    pub succeeded: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl TransferResult {
    /// Deterministic one-line status for this job.
    pub fn status_line(&self) -> String {
        let local = self.local_path.display();
        match &self.error {
            None => format!("OK: {local} -> {}", self.remote_path),
            Some(err) => format!("ERROR: {local} -> {}: {err}", self.remote_path),
        }
    }
}

/// Progress event emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// A job finished planning and is about to talk to the remote.
    Started { remote_path: String, chunks: usize },
    /// A chunk was appended to the staging artifact.
    Progress {
        remote_path: String,
        sent: usize,
        total: usize,
    },
    /// A job delivered its file.
    Completed(TransferResult),
    /// A job failed; the batch continues.
    Failed(TransferResult),
}

/// Results of a whole batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<TransferResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }

    /// `"<succeeded>/<total>"`.
    pub fn summary(&self) -> String {
        format!("{}/{}", self.succeeded(), self.total())
    }
}
