//! Remote path resolution.
//!
//! Remote paths are always POSIX, whatever the local platform, so this module
//! works on `/`-separated strings rather than `std::path`.

use crate::TransferError;
use crate::types::StagingId;

/// Default remote directory for staging artifacts.
pub const DEFAULT_STAGING_DIR: &str = "/tmp";

/// Where targets resolve and where staging artifacts live on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    base_path: Option<String>,
    staging_dir: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            base_path: None,
            staging_dir: DEFAULT_STAGING_DIR.into(),
        }
    }
}

/// A fully resolved remote destination plus the names of its scratch files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Absolute target path.
    pub path: String,
    /// Directory containing the target.
    pub dir: String,
    /// Staging id derived from `path`.
    pub staging_id: StagingId,
    /// Staging artifact accumulating encoded chunks.
    pub staging_path: String,
    /// Sibling of `path` the assembler decodes into before renaming.
    pub temp_path: String,
}

impl RemoteLayout {
    /// Creates a layout. Relative remote paths resolve under `base_path`.
    pub fn new(base_path: Option<&str>, staging_dir: &str) -> Result<Self, TransferError> {
        let base_path = match base_path {
            Some(base) if !base.is_empty() => {
                if !base.starts_with('/') {
                    return Err(TransferError::InvalidPath(format!(
                        "base path must be absolute: {base}"
                    )));
                }
                Some(normalize(base)?)
            }
            _ => None,
        };

        if !staging_dir.starts_with('/') {
            return Err(TransferError::InvalidPath(format!(
                "staging directory must be absolute: {staging_dir}"
            )));
        }

        Ok(Self {
            base_path,
            staging_dir: normalize(staging_dir)?,
        })
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn staging_dir(&self) -> &str {
        &self.staging_dir
    }

    /// Resolves `remote` to an absolute target and derives its scratch paths.
    ///
    /// Relative paths require a base path and must not escape it; absolute
    /// paths are accepted as-is (after `..` rejection) in either mode.
    pub fn resolve(&self, remote: &str) -> Result<RemoteTarget, TransferError> {
        if remote.is_empty() {
            return Err(TransferError::InvalidPath("empty path".into()));
        }
        if remote.ends_with('/') {
            return Err(TransferError::InvalidPath(format!(
                "path names a directory: {remote}"
            )));
        }

        let path = if remote.starts_with('/') {
            normalize(remote)?
        } else {
            let Some(base) = &self.base_path else {
                return Err(TransferError::InvalidPath(format!(
                    "relative path without a base path: {remote}"
                )));
            };
            join(base, &normalize(remote)?)
        };

        let (dir, name) = split_parent(&path).ok_or_else(|| {
            TransferError::InvalidPath(format!("path has no file name: {remote}"))
        })?;

        let staging_id = StagingId::for_target(&path);
        let staging_path = join(&self.staging_dir, &format!("shellpush-{staging_id}.b64"));
        let temp_path = join(dir, &format!(".{name}.shellpush-{staging_id}.tmp"));

        Ok(RemoteTarget {
            dir: dir.to_string(),
            staging_id,
            staging_path,
            temp_path,
            path,
        })
    }
}

/// Collapses `.` and empty segments, rejecting `..`.
///
/// Keeps a leading `/` when present. Returns `/` for the root itself.
fn normalize(path: &str) -> Result<String, TransferError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {path}"
                )));
            }
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if path.starts_with('/') {
        Ok(format!("/{joined}"))
    } else if joined.is_empty() {
        Err(TransferError::InvalidPath(format!("path has no file name: {path}")))
    } else {
        Ok(joined)
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Splits an absolute normalized path into parent directory and file name.
fn split_parent(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    let name = &path[idx + 1..];
    if name.is_empty() {
        return None;
    }
    let dir = if idx == 0 { "/" } else { &path[..idx] };
    Some((dir, name))
}
