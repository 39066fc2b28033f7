//! Line codec for the index file: `<fingerprint>|<path>`, one per line.

use crate::core::hash::Fingerprint;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SEPARATOR: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 2 fields, found {found}")]
    FieldCount { found: usize },

    #[error("empty {field}")]
    EmptyField { field: &'static str },

    #[error("fingerprint {value:?} is not a BLAKE3 hex digest")]
    BadFingerprint { value: String },

    #[error("line is not valid UTF-8")]
    NotUtf8,

    #[error("path {path:?} cannot be stored in the index")]
    UnencodablePath { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub fingerprint: Fingerprint,
    pub path: PathBuf,
}

impl Record {
    /// Build a record, rejecting paths the line format cannot carry.
    pub fn new(path: &Path, fingerprint: Fingerprint) -> Result<Self, RecordError> {
        let unencodable = || RecordError::UnencodablePath {
            path: path.to_path_buf(),
        };
        let text = path.to_str().ok_or_else(unencodable)?;
        if text.is_empty() || text.contains(SEPARATOR) || text.contains(['\n', '\r']) {
            return Err(unencodable());
        }
        Ok(Self {
            fingerprint,
            path: path.to_path_buf(),
        })
    }

    pub fn parse(raw: &[u8]) -> Result<Self, RecordError> {
        let line = std::str::from_utf8(raw).map_err(|_| RecordError::NotUtf8)?;
        let line = line.trim_end_matches(['\n', '\r']);

        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        let [fingerprint, path] = fields[..] else {
            return Err(RecordError::FieldCount {
                found: fields.len(),
            });
        };
        if fingerprint.is_empty() {
            return Err(RecordError::EmptyField {
                field: "fingerprint",
            });
        }
        if path.is_empty() {
            return Err(RecordError::EmptyField { field: "path" });
        }
        // entries from other hash algorithms could never match a file again
        if !Fingerprint::is_well_formed(fingerprint) {
            return Err(RecordError::BadFingerprint {
                value: fingerprint.to_string(),
            });
        }

        Ok(Self {
            fingerprint: Fingerprint::new(fingerprint),
            path: PathBuf::from(path),
        })
    }

    /// Encoded line including the trailing newline.
    pub fn to_line(&self) -> String {
        // `new` and `parse` both guarantee a UTF-8 path
        format!(
            "{}{}{}\n",
            self.fingerprint,
            SEPARATOR,
            self.path.to_string_lossy()
        )
    }
}
