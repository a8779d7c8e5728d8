//! Content hashing for record identity.

use blake3::Hasher;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Generate a BLAKE3 hash of file contents.
///
/// Uses streaming to handle large files without loading the entire file
/// into memory.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Generate a BLAKE3 hash from an in-memory byte buffer.
///
/// Used when the file has already been read (hashing and decoding share
/// one read).
pub fn content_hash_from_bytes(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}
