//! Content fingerprinting using BLAKE3

use crate::fs::FileSystem;
use crate::types::Fingerprint;
use blake3::Hasher;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for streaming hashes
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute content hash for in-memory bytes
pub fn compute_content_hash(content: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

/// Hash everything `reader` yields until EOF
pub fn fingerprint_reader(reader: &mut dyn Read) -> io::Result<Fingerprint> {
    let mut hashing = HashingReader::new(reader);
    io::copy(&mut hashing, &mut io::sink())?;
    Ok(hashing.finalize())
}

/// Fingerprint the full content of the file at `path`
///
/// Fails if the file cannot be read; the error is never swallowed here since an
/// unreadable file can neither be synced nor trusted in the index.
pub fn fingerprint_file(fs: &dyn FileSystem, path: &Path) -> io::Result<Fingerprint> {
    let mut reader = fs.open_read(path)?;
    fingerprint_reader(&mut reader)
}

/// Reader adapter that hashes bytes as they stream through
///
/// Lets a copy fingerprint exactly the bytes it wrote without a second read.
pub struct HashingReader<R> {
    inner: R,
    hasher: Hasher,
    bytes: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            bytes: 0,
        }
    }

    /// Number of bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    pub fn finalize(&self) -> Fingerprint {
        *self.hasher.finalize().as_bytes()
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = buf.len().min(CHUNK_SIZE);
        let n = self.inner.read(&mut buf[..limit])?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}
