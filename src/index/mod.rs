pub mod record;
pub mod store;

pub use record::{Record, RecordError};
pub use store::{IndexError, IndexStore, PendingIndex};

use crate::core::hash::Fingerprint;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Content index of the archive: path → fingerprint, and for every
/// fingerprint the one canonical path that owns it.
///
/// The reverse map is derived from the forward map and only changes through
/// the methods here, so the two views never drift apart. When several paths
/// share a fingerprint the canonical one is the first inserted, or for bulk
/// loads the lexicographically smallest.
#[derive(Debug, Default, Clone)]
pub struct Index {
    by_path: HashMap<PathBuf, Fingerprint>,
    by_fingerprint: HashMap<Fingerprint, PathBuf>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in file order; a later record for the same path
    /// replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.by_path.insert(record.path, record.fingerprint);
        }
        index.rebuild_reverse();
        index
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn fingerprint_of(&self, path: &Path) -> Option<&Fingerprint> {
        self.by_path.get(path)
    }

    pub fn canonical_path(&self, fingerprint: &Fingerprint) -> Option<&Path> {
        self.by_fingerprint.get(fingerprint).map(PathBuf::as_path)
    }

    /// Record `path` with `fingerprint`. An existing canonical owner of the
    /// fingerprint keeps ownership.
    pub fn insert(&mut self, path: PathBuf, fingerprint: Fingerprint) {
        if let Some(old) = self.by_path.insert(path.clone(), fingerprint.clone()) {
            if old != fingerprint {
                self.release(&path, &old);
            }
        }
        self.by_fingerprint.entry(fingerprint).or_insert(path);
    }

    pub fn remove(&mut self, path: &Path) -> Option<Fingerprint> {
        let fingerprint = self.by_path.remove(path)?;
        self.release(path, &fingerprint);
        Some(fingerprint)
    }

    /// Keep only entries whose path satisfies `keep`; returns the dropped paths.
    pub fn retain(&mut self, mut keep: impl FnMut(&Path) -> bool) -> Vec<PathBuf> {
        let mut dropped = Vec::new();
        self.by_path.retain(|path, _| {
            if keep(path) {
                true
            } else {
                dropped.push(path.clone());
                false
            }
        });
        if !dropped.is_empty() {
            self.rebuild_reverse();
        }
        dropped.sort();
        dropped
    }

    /// Drop entries whose file is gone.
    ///
    /// A path whose existence cannot be determined (e.g. permission denied
    /// on a parent) is kept.
    pub fn prune_missing(&mut self) -> Vec<PathBuf> {
        self.retain(|path| path.try_exists().unwrap_or(true))
    }

    /// Records sorted by path.
    pub fn records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .by_path
            .iter()
            .map(|(path, fingerprint)| Record {
                fingerprint: fingerprint.clone(),
                path: path.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    // `path` no longer holds `fingerprint`; hand ownership to the smallest
    // remaining holder, if any.
    fn release(&mut self, path: &Path, fingerprint: &Fingerprint) {
        if self.by_fingerprint.get(fingerprint).map(PathBuf::as_path) != Some(path) {
            return;
        }
        let successor = self
            .by_path
            .iter()
            .filter(|(_, fp)| *fp == fingerprint)
            .map(|(p, _)| p)
            .min()
            .cloned();
        match successor {
            Some(successor) => {
                self.by_fingerprint.insert(fingerprint.clone(), successor);
            }
            None => {
                self.by_fingerprint.remove(fingerprint);
            }
        }
    }

    fn rebuild_reverse(&mut self) {
        let mut paths: Vec<(&PathBuf, &Fingerprint)> = self.by_path.iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));

        let mut by_fingerprint = HashMap::with_capacity(paths.len());
        for (path, fingerprint) in paths {
            by_fingerprint
                .entry(fingerprint.clone())
                .or_insert_with(|| path.clone());
        }
        self.by_fingerprint = by_fingerprint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::new(s)
    }

    fn record(path: &str, fingerprint: &str) -> Record {
        Record {
            fingerprint: fp(fingerprint),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_insert_updates_both_directions() {
        let mut index = Index::new();
        index.insert(PathBuf::from("/a.jpg"), fp("h1"));

        assert_eq!(index.fingerprint_of(Path::new("/a.jpg")), Some(&fp("h1")));
        assert_eq!(index.canonical_path(&fp("h1")), Some(Path::new("/a.jpg")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_first_insert_keeps_ownership() {
        let mut index = Index::new();
        index.insert(PathBuf::from("/z.jpg"), fp("h1"));
        index.insert(PathBuf::from("/a.jpg"), fp("h1"));
        assert_eq!(index.canonical_path(&fp("h1")), Some(Path::new("/z.jpg")));
    }

    #[test]
    fn test_from_records_smallest_path_wins() {
        let index = Index::from_records(vec![
            record("/b.jpg", "h1"),
            record("/a.jpg", "h1"),
            record("/c.jpg", "h2"),
        ]);
        assert_eq!(index.canonical_path(&fp("h1")), Some(Path::new("/a.jpg")));
        assert_eq!(index.canonical_path(&fp("h2")), Some(Path::new("/c.jpg")));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_from_records_later_record_wins() {
        let index = Index::from_records(vec![record("/a.jpg", "old"), record("/a.jpg", "new")]);
        assert_eq!(index.fingerprint_of(Path::new("/a.jpg")), Some(&fp("new")));
        assert_eq!(index.canonical_path(&fp("old")), None);
    }

    #[test]
    fn test_remove_hands_over_ownership() {
        let mut index = Index::from_records(vec![record("/a.jpg", "h1"), record("/b.jpg", "h1")]);
        assert_eq!(index.remove(Path::new("/a.jpg")), Some(fp("h1")));
        assert_eq!(index.canonical_path(&fp("h1")), Some(Path::new("/b.jpg")));

        index.remove(Path::new("/b.jpg"));
        assert_eq!(index.canonical_path(&fp("h1")), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_reinsert_with_new_fingerprint() {
        let mut index = Index::new();
        index.insert(PathBuf::from("/a.jpg"), fp("h1"));
        index.insert(PathBuf::from("/a.jpg"), fp("h2"));
        assert_eq!(index.canonical_path(&fp("h1")), None);
        assert_eq!(index.canonical_path(&fp("h2")), Some(Path::new("/a.jpg")));
    }

    #[test]
    fn test_prune_missing_frees_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        let kept = temp_dir.path().join("kept.jpg");
        let gone = temp_dir.path().join("gone.jpg");
        fs::write(&kept, b"k").unwrap();

        let mut index = Index::new();
        index.insert(kept.clone(), fp("h1"));
        index.insert(gone.clone(), fp("h2"));

        let pruned = index.prune_missing();
        assert_eq!(pruned, vec![gone.clone()]);
        assert_eq!(index.fingerprint_of(&gone), None);
        assert_eq!(index.canonical_path(&fp("h2")), None);
        assert_eq!(index.canonical_path(&fp("h1")), Some(kept.as_path()));
    }

    #[test]
    fn test_records_sorted() {
        let index = Index::from_records(vec![record("/b.jpg", "h2"), record("/a.jpg", "h1")]);
        let paths: Vec<PathBuf> = index.records().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![PathBuf::from("/a.jpg"), PathBuf::from("/b.jpg")]);
    }
}
