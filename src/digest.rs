//! Streaming content digests.
//!
//! The content hash is a deterministic function of file bytes only — the
//! same payload hashes identically regardless of where it lives or when it
//! is read. Hashing streams in fixed-size blocks so a multi-gigabyte entry
//! never has to sit in memory whole.

use sha2::{Digest, Sha256};
use std::io::{self, Read};

/// Block size for streaming reads: 1 MiB.
const BLOCK_SIZE: usize = 1024 * 1024;

/// SHA-256 of everything the reader yields, as a 64-char lowercase hex string.
pub fn sha256_stream<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut block = vec![0u8; BLOCK_SIZE];
    loop {
        let n = reader.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of an in-memory buffer, as a 64-char lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
