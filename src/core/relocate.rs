use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("{path} has no file name")]
    NoFileName { path: PathBuf },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move {from} -> {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// First free variant of `path`: the path itself, then `stem_1.ext`,
/// `stem_2.ext`, ... in the same directory.
pub fn unique_destination(path: &Path) -> PathBuf {
    if !occupied(path) {
        return path.to_path_buf();
    }

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut idx = 1usize;
    loop {
        let candidate = dir.join(format!("{stem}_{idx}{ext}"));
        if !occupied(&candidate) {
            log::debug!(
                "{} taken, using {}",
                path.display(),
                candidate.display()
            );
            return candidate;
        }
        idx += 1;
    }
}

// A dangling symlink still blocks the name.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Moves files with a single rename; never copies.
///
/// In dry-run mode destinations are computed and returned but nothing on
/// disk changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relocator {
    dry_run: bool,
}

impl Relocator {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Move `path` into `dir`, keeping its file name unless taken.
    ///
    /// On failure the file is left where it was.
    pub fn move_into(&self, path: &Path, dir: &Path) -> Result<PathBuf, RelocateError> {
        let file_name = path.file_name().ok_or_else(|| RelocateError::NoFileName {
            path: path.to_path_buf(),
        })?;

        if self.dry_run {
            return Ok(unique_destination(&dir.join(file_name)));
        }

        fs::create_dir_all(dir).map_err(|source| RelocateError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let dest = unique_destination(&dir.join(file_name));
        fs::rename(path, &dest).map_err(|source| RelocateError::Rename {
            from: path.to_path_buf(),
            to: dest.clone(),
            source,
        })?;
        Ok(dest)
    }

    /// Move `from` to exactly `to`, creating the parent directory.
    pub fn move_to(&self, from: &Path, to: &Path) -> Result<(), RelocateError> {
        if self.dry_run {
            return Ok(());
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| RelocateError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::rename(from, to).map_err(|source| RelocateError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
    }
}
