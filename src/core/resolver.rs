use crate::core::hash::{Fingerprint, HashError, HashService};
use crate::index::Index;
use std::path::{Path, PathBuf};

/// What to do with a file, given the current index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Indexed under this path already; carry the stored fingerprint over.
    AlreadyKnown(Fingerprint),
    /// Content not seen before.
    New(Fingerprint),
    /// Same content as the canonical file at `of`.
    Duplicate { of: PathBuf, fingerprint: Fingerprint },
}

/// What to do with a file arriving from outside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    New(Fingerprint),
    Duplicate { of: PathBuf, fingerprint: Fingerprint },
}

/// Classify an archive file.
///
/// An indexed path is trusted without re-hashing, unless another path owns
/// its fingerprint. The caller must insert `New` results before resolving
/// the next file.
pub fn resolve(hasher: &HashService, path: &Path, index: &Index) -> Result<Action, HashError> {
    if let Some(fingerprint) = index.fingerprint_of(path) {
        return Ok(match index.canonical_path(fingerprint) {
            Some(owner) if owner != path => Action::Duplicate {
                of: owner.to_path_buf(),
                fingerprint: fingerprint.clone(),
            },
            _ => Action::AlreadyKnown(fingerprint.clone()),
        });
    }

    Ok(match resolve_incoming(hasher, path, index)? {
        Incoming::New(fingerprint) => Action::New(fingerprint),
        Incoming::Duplicate { of, fingerprint } => Action::Duplicate { of, fingerprint },
    })
}

/// Classify a file by content only; its path is never looked up.
pub fn resolve_incoming(
    hasher: &HashService,
    path: &Path,
    index: &Index,
) -> Result<Incoming, HashError> {
    let fingerprint = hasher.compute_content_hash(path)?;
    Ok(match index.canonical_path(&fingerprint) {
        Some(owner) => Incoming::Duplicate {
            of: owner.to_path_buf(),
            fingerprint,
        },
        None => Incoming::New(fingerprint),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_path_is_not_rehashed() {
        let temp_dir = TempDir::new().unwrap();
        // not on disk: hashing it would fail
        let path = temp_dir.path().join("a.jpg");
        let mut index = Index::new();
        index.insert(path.clone(), Fingerprint::new("stored"));

        let action = resolve(&HashService::new(), &path, &index).unwrap();
        assert_eq!(action, Action::AlreadyKnown(Fingerprint::new("stored")));
    }

    #[test]
    fn test_new_then_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.jpg");
        let b = temp_dir.path().join("b.jpg");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();
        let hasher = HashService::new();
        let mut index = Index::new();

        let Action::New(fingerprint) = resolve(&hasher, &a, &index).unwrap() else {
            panic!("expected a new file");
        };
        index.insert(a.clone(), fingerprint.clone());

        assert_eq!(
            resolve(&hasher, &b, &index).unwrap(),
            Action::Duplicate { of: a, fingerprint }
        );
    }

    #[test]
    fn test_known_path_shadowed_by_owner() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.jpg");
        let b = temp_dir.path().join("b.jpg");
        let mut index = Index::new();
        index.insert(a.clone(), Fingerprint::new("h1"));
        index.insert(b.clone(), Fingerprint::new("h1"));

        assert_eq!(
            resolve(&HashService::new(), &b, &index).unwrap(),
            Action::Duplicate {
                of: a.clone(),
                fingerprint: Fingerprint::new("h1"),
            }
        );
        assert_eq!(
            resolve(&HashService::new(), &a, &index).unwrap(),
            Action::AlreadyKnown(Fingerprint::new("h1"))
        );
    }

    #[test]
    fn test_incoming_ignores_path_match() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("c.jpg");
        fs::write(&path, b"fresh").unwrap();
        let mut index = Index::new();
        index.insert(path.clone(), Fingerprint::new("stale"));

        let action = resolve_incoming(&HashService::new(), &path, &index).unwrap();
        assert!(matches!(action, Incoming::New(_)));
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = resolve(
            &HashService::new(),
            &temp_dir.path().join("missing.jpg"),
            &Index::new(),
        );
        assert!(result.is_err());
    }
}
