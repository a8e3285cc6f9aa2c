use std::path::{Path, PathBuf};

use crate::checksum::checksum_bytes;
use crate::chunker::{self, ChunkBudget};
use crate::command::{RemoteCommand, append_overhead};
use crate::encoding::encode;
use crate::layout::RemoteTarget;
use crate::types::{Chunk, StagingId};
use crate::{DEFAULT_CHANNEL_CEILING, TransferError};

/// Limits and checks applied when planning a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Maximum length of any single rendered command.
    pub channel_ceiling: usize,
    /// Optional cap on encoded characters per chunk.
    pub max_chunk_len: Option<usize>,
    /// Ask the assembler to verify the SHA-256 digest before renaming.
    pub verify_digest: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            channel_ceiling: DEFAULT_CHANNEL_CEILING,
            max_chunk_len: None,
            verify_digest: true,
        }
    }
}

/// A fully planned delivery of one local file to one remote target.
///
/// Planning does all local work up front (encode, chunk, render) so that an
/// oversize command is caught before the first remote round trip.
#[derive(Debug, Clone)]
pub struct TransferJob {
    local_path: PathBuf,
    target: RemoteTarget,
    payload_len: u64,
    encoded_len: usize,
    digest: String,
    verify_digest: bool,
    chunks: Vec<Chunk>,
}

impl TransferJob {
    /// Plans the transfer of `content` (read from `local_path`) to `target`.
    pub fn plan(
        local_path: &Path,
        target: RemoteTarget,
        content: &[u8],
        options: &PlanOptions,
    ) -> Result<Self, TransferError> {
        let ceiling = options.channel_ceiling;
        let overhead = append_overhead(&target.staging_path);

        // Smallest possible chunk is one bare encoded character.
        if overhead + 1 > ceiling {
            return Err(TransferError::EncodingOverflow {
                step: "append",
                ceiling,
                required: overhead + 1,
            });
        }

        let encoded = encode(content);
        let budget = ChunkBudget {
            max_escaped: ceiling - overhead,
            max_payload: options.max_chunk_len,
        };
        let chunks =
            chunker::split(&encoded, budget).map_err(|e| TransferError::EncodingOverflow {
                step: "append",
                ceiling,
                required: overhead + e.required,
            })?;

        let job = Self {
            local_path: local_path.to_path_buf(),
            payload_len: content.len() as u64,
            encoded_len: encoded.len(),
            digest: checksum_bytes(content),
            verify_digest: options.verify_digest,
            target,
            chunks,
        };

        for cmd in [
            job.measure_command(),
            job.assemble_command(),
            job.cleanup_command(),
        ] {
            let required = cmd.rendered_len();
            if required > ceiling {
                return Err(TransferError::EncodingOverflow {
                    step: cmd.step(),
                    ceiling,
                    required,
                });
            }
        }

        Ok(job)
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// Absolute remote target path.
    pub fn remote_path(&self) -> &str {
        &self.target.path
    }

    pub fn staging_id(&self) -> &StagingId {
        &self.target.staging_id
    }

    /// Raw content length in bytes.
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Encoded length; equals the sum of all chunk lengths.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// SHA-256 hex digest of the raw content.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Append commands in sequence order.
    pub fn append_commands(&self) -> impl Iterator<Item = RemoteCommand> + '_ {
        self.chunks.iter().map(|chunk| RemoteCommand::Append {
            staging: self.target.staging_path.clone(),
            sequence: chunk.sequence,
            escaped: chunk.escaped.clone(),
        })
    }

    pub fn measure_command(&self) -> RemoteCommand {
        RemoteCommand::MeasureStaging {
            staging: self.target.staging_path.clone(),
        }
    }

    pub fn assemble_command(&self) -> RemoteCommand {
        RemoteCommand::Assemble {
            staging: self.target.staging_path.clone(),
            target: self.target.path.clone(),
            temp: self.target.temp_path.clone(),
            dir: self.target.dir.clone(),
            decoded_len: self.payload_len,
            digest: self.verify_digest.then(|| self.digest.clone()),
        }
    }

    pub fn cleanup_command(&self) -> RemoteCommand {
        RemoteCommand::RemoveStaging {
            staging: self.target.staging_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::unquote;
    use crate::layout::RemoteLayout;
    use proptest::prelude::*;

    fn target(remote: &str) -> RemoteTarget {
        RemoteLayout::new(Some("/srv/app"), "/tmp")
            .unwrap()
            .resolve(remote)
            .unwrap()
    }

    fn plan(content: &[u8], options: &PlanOptions) -> Result<TransferJob, TransferError> {
        TransferJob::plan(Path::new("local.ts"), target("src/index.ts"), content, options)
    }

    fn all_commands(job: &TransferJob) -> Vec<RemoteCommand> {
        let mut cmds: Vec<_> = job.append_commands().collect();
        cmds.push(job.measure_command());
        cmds.push(job.assemble_command());
        cmds.push(job.cleanup_command());
        cmds
    }

    #[test]
    fn empty_content_plans_zero_chunks() {
        let job = plan(b"", &PlanOptions::default()).unwrap();
        assert!(job.chunks().is_empty());
        assert_eq!(job.payload_len(), 0);
        assert_eq!(job.encoded_len(), 0);
    }

    #[test]
    fn chunk_cap_forces_three_chunks() {
        let options = PlanOptions {
            max_chunk_len: Some(7),
            ..PlanOptions::default()
        };
        let job = plan(b"hello ' world\n", &options).unwrap();
        assert_eq!(job.chunks().len(), 3);
        let total: usize = job.chunks().iter().map(Chunk::len).sum();
        assert_eq!(total, job.encoded_len());
    }

    #[test]
    fn tiny_ceiling_overflows_before_chunking() {
        let options = PlanOptions {
            channel_ceiling: 10,
            ..PlanOptions::default()
        };
        let err = plan(b"data", &options).unwrap_err();
        assert!(matches!(
            err,
            TransferError::EncodingOverflow { step: "append", .. }
        ));
    }

    #[test]
    fn ceiling_below_assembler_overflows() {
        let overhead = append_overhead(&target("src/index.ts").staging_path);
        let options = PlanOptions {
            channel_ceiling: overhead + 16,
            ..PlanOptions::default()
        };
        let err = plan(b"data", &options).unwrap_err();
        assert!(matches!(
            err,
            TransferError::EncodingOverflow {
                step: "assemble",
                ..
            }
        ));
    }

    #[test]
    fn digest_is_optional_in_assemble() {
        let options = PlanOptions {
            verify_digest: false,
            ..PlanOptions::default()
        };
        let job = plan(b"x", &options).unwrap();
        match job.assemble_command() {
            RemoteCommand::Assemble { digest, .. } => assert!(digest.is_none()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn append_sequences_follow_chunks() {
        let options = PlanOptions {
            max_chunk_len: Some(4),
            ..PlanOptions::default()
        };
        let job = plan(b"0123456789", &options).unwrap();
        let seqs: Vec<usize> = job
            .append_commands()
            .map(|c| match c {
                RemoteCommand::Append { sequence, .. } => sequence,
                other => panic!("unexpected command {other:?}"),
            })
            .collect();
        assert_eq!(seqs, (0..job.chunks().len()).collect::<Vec<_>>());
    }

    #[test]
    fn multi_megabyte_payload_respects_ceiling() {
        let content: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let options = PlanOptions {
            channel_ceiling: 4096,
            ..PlanOptions::default()
        };
        let job = plan(&content, &options).unwrap();
        for cmd in all_commands(&job) {
            assert!(cmd.rendered_len() <= 4096);
        }
        let joined: String = job
            .chunks()
            .iter()
            .map(|c| unquote(&c.escaped).unwrap())
            .collect();
        assert_eq!(crate::encoding::decode(&joined).unwrap(), content);
    }

    proptest! {
        #[test]
        fn every_command_fits_the_ceiling(
            content in proptest::collection::vec(any::<u8>(), 0..2048),
            ceiling in 1024usize..4096,
        ) {
            let options = PlanOptions { channel_ceiling: ceiling, ..PlanOptions::default() };
            let job = plan(&content, &options).unwrap();
            for cmd in all_commands(&job) {
                prop_assert!(cmd.rendered_len() <= ceiling);
            }
        }
    }
}
