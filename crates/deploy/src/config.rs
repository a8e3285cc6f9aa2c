//! Batch configuration.
//!
//! A JSON file such as:
//!
//! ```json
//! {
//!   "remote_host": "deploy@nas.local",
//!   "base_path": "/volume1/docker/app/backend",
//!   "files": [
//!     { "local": "backend/src/index.ts", "remote": "src/index.ts" }
//!   ],
//!   "channel_ceiling": 10240,
//!   "timeout_secs": 60
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shellpush_transfer::{
    DEFAULT_CHANNEL_CEILING, DEFAULT_STAGING_DIR, PlanOptions, RemoteLayout,
};

use crate::error::ConfigError;
use crate::ssh::SshOptions;
use crate::types::FileMapping;

/// Default per-command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_channel_ceiling() -> usize {
    DEFAULT_CHANNEL_CEILING
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_staging_dir() -> String {
    DEFAULT_STAGING_DIR.into()
}

fn default_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Everything a batch needs: host, layout, files and channel limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Remote host (`user@host` or an ssh config alias).
    #[serde(default)]
    pub remote_host: String,

    /// Directory relative remote paths resolve under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Files to deliver, in order.
    #[serde(default)]
    pub files: Vec<FileMapping>,

    /// Maximum length of one remote command in bytes.
    #[serde(default = "default_channel_ceiling")]
    pub channel_ceiling: usize,

    /// Optional cap on encoded characters per chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_len: Option<usize>,

    /// Timeout for each remote command.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Remote directory for staging artifacts.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    /// Jobs run at once. Jobs for the same target never overlap.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Compare the staged length with the expected one before assembling.
    #[serde(default = "default_true")]
    pub verify_staged_length: bool,

    /// Have the assembler check the SHA-256 digest (needs `sha256sum`).
    #[serde(default = "default_true")]
    pub verify_digest: bool,

    #[serde(default)]
    pub ssh: SshOptions,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            remote_host: String::new(),
            base_path: None,
            files: Vec::new(),
            channel_ceiling: DEFAULT_CHANNEL_CEILING,
            max_chunk_len: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            staging_dir: default_staging_dir(),
            concurrency: 1,
            verify_staged_length: true,
            verify_digest: true,
            ssh: SshOptions::default(),
        }
    }
}

impl TransferConfig {
    /// Creates a config for `remote_host` with default limits.
    pub fn new(remote_host: impl Into<String>) -> Self {
        Self {
            remote_host: remote_host.into(),
            ..Self::default()
        }
    }

    /// Loads a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks values that would make every job fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_host.trim().is_empty() {
            return Err(ConfigError::Invalid("remote_host is empty".into()));
        }
        if self.channel_ceiling == 0 {
            return Err(ConfigError::Invalid("channel_ceiling must be positive".into()));
        }
        if self.max_chunk_len == Some(0) {
            return Err(ConfigError::Invalid("max_chunk_len must be positive".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        self.layout()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            channel_ceiling: self.channel_ceiling,
            max_chunk_len: self.max_chunk_len,
            verify_digest: self.verify_digest,
        }
    }

    pub fn layout(&self) -> Result<RemoteLayout, ConfigError> {
        RemoteLayout::new(self.base_path.as_deref(), &self.staging_dir)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let config: TransferConfig =
            serde_json::from_str(r#"{"remote_host": "deploy@nas"}"#).unwrap();
        assert_eq!(config.remote_host, "deploy@nas");
        assert_eq!(config.channel_ceiling, DEFAULT_CHANNEL_CEILING);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.staging_dir, "/tmp");
        assert_eq!(config.concurrency, 1);
        assert!(config.verify_staged_length);
        assert!(config.verify_digest);
        assert!(config.files.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn load_reads_file_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shellpush.json");
        std::fs::write(
            &path,
            r#"{
                "remote_host": "deploy@nas",
                "base_path": "/volume1/app/backend",
                "files": [
                    {"local": "backend/src/index.ts", "remote": "src/index.ts"},
                    {"local": "backend/src/routes/diagRoutes.ts", "remote": "src/routes/diagRoutes.ts"}
                ],
                "channel_ceiling": 4096,
                "timeout_secs": 15
            }"#,
        )
        .unwrap();

        let config = TransferConfig::load(&path).unwrap();
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files[1].remote, "src/routes/diagRoutes.ts");
        assert_eq!(config.plan_options().channel_ceiling, 4096);
        assert_eq!(config.timeout(), Duration::from_secs(15));
        config.validate().unwrap();
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            TransferConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            TransferConfig::load(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn validate_rejects_unusable_values() {
        assert!(TransferConfig::default().validate().is_err());

        let mut config = TransferConfig::new("nas");
        config.channel_ceiling = 0;
        assert!(config.validate().is_err());

        let mut config = TransferConfig::new("nas");
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = TransferConfig::new("nas");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = TransferConfig::new("nas");
        config.base_path = Some("relative/base".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_roundtrip() {
        let mut config = TransferConfig::new("nas");
        config.files.push(FileMapping::new("a.ts", "/srv/a.ts"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("base_path"));
        let parsed: TransferConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
