use crate::cli::RunArgs;
use crate::index::store::PENDING_SUFFIX;
use crate::journal::Journal;
use clap::ValueEnum;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} option must be provided")]
    Missing(&'static str),

    #[error("{which} {path} is not a directory")]
    NotADirectory { which: &'static str, path: PathBuf },

    #[error("{a} and {b} overlap; they must be separate trees")]
    Overlap { a: PathBuf, b: PathBuf },

    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Reconcile the archive with its index
    #[default]
    Check,
    /// Reconcile, then import from the input directory
    Sync,
}

/// Validated run configuration. All paths are absolute.
#[derive(Debug, Clone)]
pub struct Config {
    pub archive: PathBuf,
    pub quarantine: PathBuf,
    pub index_file: PathBuf,
    pub source: Option<PathBuf>,
    pub mode: Mode,
    pub dry_run: bool,
}

impl Config {
    /// Check the command line before anything is touched. Once every check
    /// passes, the quarantine directory is created when missing, except on
    /// dry runs.
    pub fn from_args(args: &RunArgs) -> Result<Self, ConfigError> {
        let output = args.output.as_deref().ok_or(ConfigError::Missing("output (-o)"))?;
        let dup_dir = args.dup_dir.as_deref().ok_or(ConfigError::Missing("dup dir (-d)"))?;
        let index_file = args
            .index_file
            .as_deref()
            .ok_or(ConfigError::Missing("md5 file (-m)"))?;
        let input = match args.mode {
            Mode::Sync => Some(args.input.as_deref().ok_or(ConfigError::Missing("input (-i)"))?),
            Mode::Check => None,
        };

        let archive = existing_dir("output", output)?;
        let source = input.map(|dir| existing_dir("input", dir)).transpose()?;

        let quarantine = resolve(dup_dir)?;
        if quarantine.exists() && !quarantine.is_dir() {
            return Err(ConfigError::NotADirectory {
                which: "dup dir",
                path: quarantine,
            });
        }
        // the whole archive would fall under an excluded path
        if archive.starts_with(&quarantine) {
            return Err(ConfigError::Overlap {
                a: archive,
                b: quarantine,
            });
        }

        if let Some(source) = &source {
            if source.starts_with(&archive) || archive.starts_with(source) {
                return Err(ConfigError::Overlap {
                    a: source.clone(),
                    b: archive,
                });
            }
        }

        let index_file = resolve(index_file)?;

        if !args.dry_run && !quarantine.exists() {
            fs::create_dir_all(&quarantine).map_err(|source| ConfigError::Resolve {
                path: quarantine.clone(),
                source,
            })?;
        }

        Ok(Self {
            archive,
            quarantine,
            index_file,
            source,
            mode: args.mode,
            dry_run: args.dry_run,
        })
    }

    /// Paths a walk must never pick up as photos: the quarantine directory
    /// and the index's own files.
    pub fn excluded(&self) -> Vec<PathBuf> {
        let mut pending = OsString::from(self.index_file.as_os_str());
        pending.push(PENDING_SUFFIX);
        vec![
            self.quarantine.clone(),
            self.index_file.clone(),
            PathBuf::from(pending),
            Journal::path_for(&self.index_file),
        ]
    }
}

fn existing_dir(which: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory {
            which,
            path: path.to_path_buf(),
        });
    }
    resolve(path)
}

/// Canonical path when it exists, otherwise an absolute path built from a
/// canonical parent.
fn resolve(path: &Path) -> Result<PathBuf, ConfigError> {
    let err = |source: io::Error| ConfigError::Resolve {
        path: path.to_path_buf(),
        source,
    };
    match fs::canonicalize(path) {
        Ok(canonical) => Ok(canonical),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let absolute = std::path::absolute(path).map_err(err)?;
            match (absolute.parent(), absolute.file_name()) {
                (Some(parent), Some(name)) => match fs::canonicalize(parent) {
                    Ok(parent) => Ok(parent.join(name)),
                    Err(_) => Ok(absolute),
                },
                _ => Ok(absolute),
            }
        }
        Err(e) => Err(err(e)),
    }
}
