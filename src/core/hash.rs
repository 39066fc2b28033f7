use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Length of an encoded fingerprint: a 32-byte digest in hex.
pub const FINGERPRINT_LEN: usize = 64;

/// Hex-encoded BLAKE3 digest of a file's content.
///
/// Two files with equal fingerprints are treated as identical; there is no
/// byte-level comparison behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-encoded fingerprint, e.g. one read back from the index file.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Whether `hex` has the shape this crate writes: exactly
    /// [`FINGERPRINT_LEN`] lowercase hex digits.
    pub fn is_well_formed(hex: &str) -> bool {
        hex.len() == FINGERPRINT_LEN && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Service for fingerprinting file content
pub struct HashService;

impl HashService {
    pub fn new() -> Self {
        Self
    }

    /// Stream the file through BLAKE3 and return its fingerprint.
    pub fn compute_content_hash(&self, file_path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(file_path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = blake3::Hasher::new();
        io::copy(&mut reader, &mut hasher)?;

        Ok(Fingerprint(hasher.finalize().to_hex().to_string()))
    }
}

impl Default for HashService {
    fn default() -> Self {
        Self::new()
    }
}
