use std::fmt;

use crate::checksum::checksum_bytes;

/// Length of a staging id in hex characters (64 bits of SHA-256).
pub const STAGING_ID_LEN: usize = 16;

/// One slice of an encoded payload, ready to be appended remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the payload, contiguous from 0.
    pub sequence: usize,
    /// Encoded text carried by this chunk.
    pub payload: String,
    /// `payload` quoted as a single shell word.
    pub escaped: String,
}

impl Chunk {
    /// Number of encoded characters carried by this chunk.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the chunk carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Names the remote staging artifact for one target path.
///
/// Derived from the absolute target path, so two different targets never
/// share a staging file while two jobs for the same target always do (the
/// orchestrator serializes those).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StagingId(String);

impl StagingId {
    /// Derives the staging id for an absolute remote target path.
    pub fn for_target(target: &str) -> Self {
        let mut digest = checksum_bytes(target.as_bytes());
        digest.truncate(STAGING_ID_LEN);
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
