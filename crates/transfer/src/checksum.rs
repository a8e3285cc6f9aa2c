use sha2::{Digest, Sha256};

/// SHA-256 of `data` as lowercase hex, the same text `sha256sum` prints
/// before the file name.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
