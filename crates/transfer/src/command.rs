//! Remote command templates.
//!
//! Each protocol step is one [`RemoteCommand`]; [`RemoteCommand::render`]
//! turns it into the exact POSIX `sh` command line sent over the channel.

use std::fmt::Write as _;

use crate::escape::quote;

/// Assembler exit status: staging artifact missing or not valid base64.
pub const EXIT_DECODE_FAILED: i32 = 65;
/// Assembler exit status: decoded length or digest differs from the job's.
pub const EXIT_VERIFY_FAILED: i32 = 66;
/// Assembler exit status: target directory, temp file or rename failed.
pub const EXIT_CANT_CREATE: i32 = 73;

/// `$0` for the assembler script, shown by `ps` on the remote host.
const ASSEMBLER_NAME: &str = "shellpush-assemble";

/// Remote assembler, run as `sh -c SCRIPT NAME STAGING TARGET TEMP DIR LEN DIGEST`.
///
/// Decodes into the temp sibling, verifies, then renames over the target.
/// The target is only ever touched by the final `mv`.
pub const ASSEMBLER_SCRIPT: &str = concat!(
    "s=$1 t=$2 p=$3 d=$4 n=$5 h=$6\n",
    "mkdir -p \"$d\" || exit 73\n",
    "[ -d \"$t\" ] && exit 73\n",
    ": > \"$p\" || exit 73\n",
    "if [ \"$n\" -gt 0 ]; then base64 -d < \"$s\" > \"$p\" 2>/dev/null || { rm -f \"$p\"; exit 65; }; fi\n",
    "m=$(wc -c < \"$p\")\n",
    "[ $m -eq \"$n\" ] || { rm -f \"$p\"; exit 66; }\n",
    "if [ -n \"$h\" ]; then set -- $(sha256sum < \"$p\"); [ \"$1\" = \"$h\" ] || { rm -f \"$p\"; exit 66; }; fi\n",
    "mv -f \"$p\" \"$t\" || { rm -f \"$p\"; exit 73; }\n",
    "rm -f \"$s\"\n",
);

/// One step of the transfer protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Writes one chunk into the staging artifact. Sequence 0 truncates it.
    Append {
        staging: String,
        sequence: usize,
        escaped: String,
    },
    /// Prints the staging artifact's length in bytes.
    MeasureStaging { staging: String },
    /// Runs the remote assembler.
    Assemble {
        staging: String,
        target: String,
        temp: String,
        dir: String,
        decoded_len: u64,
        digest: Option<String>,
    },
    /// Deletes the staging artifact, ignoring absence.
    RemoveStaging { staging: String },
}

impl RemoteCommand {
    /// Short name used in logs and errors.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Append { .. } => "append",
            Self::MeasureStaging { .. } => "measure",
            Self::Assemble { .. } => "assemble",
            Self::RemoveStaging { .. } => "cleanup",
        }
    }

    /// Staging artifact this command operates on.
    pub fn staging(&self) -> &str {
        match self {
            Self::Append { staging, .. }
            | Self::MeasureStaging { staging }
            | Self::Assemble { staging, .. }
            | Self::RemoveStaging { staging } => staging,
        }
    }

    /// Renders the command line executed by the remote shell.
    pub fn render(&self) -> String {
        match self {
            Self::Append {
                staging,
                sequence,
                escaped,
            } => {
                let redirect = if *sequence == 0 { ">" } else { ">>" };
                format!("printf %s {escaped} {redirect} {}", quote(staging))
            }
            Self::MeasureStaging { staging } => format!("wc -c < {}", quote(staging)),
            Self::Assemble {
                staging,
                target,
                temp,
                dir,
                decoded_len,
                digest,
            } => {
                let mut cmd = format!("sh -c {} {ASSEMBLER_NAME}", quote(ASSEMBLER_SCRIPT));
                for arg in [staging, target, temp, dir] {
                    let _ = write!(cmd, " {}", quote(arg));
                }
                let _ = write!(
                    cmd,
                    " {decoded_len} {}",
                    quote(digest.as_deref().unwrap_or(""))
                );
                cmd
            }
            Self::RemoveStaging { staging } => format!("rm -f {}", quote(staging)),
        }
    }

    /// Length of [`render`](Self::render)'s output.
    pub fn rendered_len(&self) -> usize {
        self.render().len()
    }
}

/// Fixed length an append command adds around its escaped chunk.
///
/// Uses the `>>` form, which is one byte longer than the first chunk's `>`.
pub fn append_overhead(staging: &str) -> usize {
    RemoteCommand::Append {
        staging: staging.to_string(),
        sequence: 1,
        escaped: String::new(),
    }
    .rendered_len()
}
