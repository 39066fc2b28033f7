use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily yield every regular file under `root`, depth-first and sorted by
/// file name within each directory.
///
/// Anything in `excluded` is skipped, including whole subtrees when an
/// excluded path is a directory. Unreadable entries are logged and dropped
/// without ending the walk; a directory that cannot be listed loses its subtree.
pub fn regular_files<'a>(
    root: &Path,
    excluded: &'a [PathBuf],
) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !excluded.iter().any(|p| p.as_path() == entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                let at = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                log::error!("walk {} failed: {}", at, err);
                None
            }
        })
        .filter_map(|entry| {
            let file_type = entry.file_type();
            if file_type.is_file() {
                Some(entry.into_path())
            } else {
                if file_type.is_symlink() {
                    log::debug!("SKIP symlink {}", entry.path().display());
                }
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yields_files_only_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("2021-01/nested")).unwrap();
        fs::write(root.join("b.jpg"), b"b").unwrap();
        fs::write(root.join("a.jpg"), b"a").unwrap();
        fs::write(root.join("2021-01/c.jpg"), b"c").unwrap();
        fs::write(root.join("2021-01/nested/d.jpg"), b"d").unwrap();

        let files: Vec<PathBuf> = regular_files(root, &[]).collect();
        assert_eq!(
            files,
            vec![
                root.join("2021-01/c.jpg"),
                root.join("2021-01/nested/d.jpg"),
                root.join("a.jpg"),
                root.join("b.jpg"),
            ]
        );
    }

    #[test]
    fn test_excluded_subtree_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("dups")).unwrap();
        fs::write(root.join("dups/x.jpg"), b"x").unwrap();
        fs::write(root.join("index.txt"), b"").unwrap();
        fs::write(root.join("keep.jpg"), b"k").unwrap();

        let excluded = vec![root.join("dups"), root.join("index.txt")];
        let files: Vec<PathBuf> = regular_files(root, &excluded).collect();
        assert_eq!(files, vec![root.join("keep.jpg")]);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = regular_files(&temp_dir.path().join("gone"), &[]).collect();
        assert!(files.is_empty());
    }
}
