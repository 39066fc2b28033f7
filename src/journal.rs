use crate::core::relocate::{RelocateError, Relocator};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const JOURNAL_SUFFIX: &str = ".history.jsonl";

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal entry: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no entries in journal {path}")]
    Empty { path: PathBuf },

    #[error("invalid journal entry {index}; valid range is 0..{len}")]
    OutOfRange { index: usize, len: usize },

    #[error("{path} is gone, cannot restore it")]
    SourceMissing { path: PathBuf },

    #[error("{path} is occupied, not overwriting it")]
    DestinationOccupied { path: PathBuf },

    #[error(transparent)]
    Relocate(#[from] RelocateError),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Quarantined,
    Filed,
}

/// One relocation, as appended to the journal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub timestamp: String,
    pub action: MoveAction,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Append-only JSON-lines log of relocations.
///
/// The file is opened on the first record, so a run that moves nothing
/// leaves no journal behind. A disabled journal accepts records and drops
/// them; used for dry runs and after the file fails to open.
pub struct Journal {
    path: Option<PathBuf>,
    out: Option<File>,
}

impl Journal {
    /// Journal location for a given index file.
    pub fn path_for(index_file: &Path) -> PathBuf {
        let mut name = OsString::from(index_file.as_os_str());
        name.push(JOURNAL_SUFFIX);
        PathBuf::from(name)
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            out: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            out: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Append an entry. Failures are logged; the move already happened.
    pub fn record(&mut self, action: MoveAction, from: &Path, to: &Path) {
        let Some(path) = self.path.clone() else {
            return;
        };
        if self.out.is_none() {
            match open_append(&path) {
                Ok(file) => self.out = Some(file),
                Err(e) => {
                    log::warn!("moves will not be journaled: {}", e);
                    self.path = None;
                    return;
                }
            }
        }
        let Some(out) = self.out.as_mut() else {
            return;
        };

        let entry = JournalEntry {
            timestamp: Utc::now().to_rfc3339(),
            action,
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        };
        let written = serde_json::to_string(&entry)
            .map_err(JournalError::from)
            .and_then(|line| {
                writeln!(out, "{line}").map_err(|source| JournalError::Io {
                    path: path.clone(),
                    source,
                })
            });
        if let Err(e) = written {
            log::warn!(
                "could not journal {} -> {}: {}",
                from.display(),
                to.display(),
                e
            );
        }
    }
}

fn open_append(path: &Path) -> Result<File, JournalError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| JournalError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Entries in file order, each with its raw line. Malformed lines are
/// reported and skipped.
pub fn read_entries(path: &Path) -> Result<Vec<(JournalEntry, String)>, JournalError> {
    let io_err = |source: std::io::Error| JournalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(entry) => entries.push((entry, line)),
            Err(err) => log::warn!("skipping malformed journal line {}: {}", i + 1, err),
        }
    }
    Ok(entries)
}

/// Which entries to undo.
#[derive(Debug, Clone, Copy)]
pub enum Selection {
    Last,
    One(usize),
    All,
}

impl Selection {
    pub fn indices(self, len: usize) -> Result<Vec<usize>, JournalError> {
        match self {
            Selection::All => Ok((0..len).collect()),
            Selection::Last => Ok(len.checked_sub(1).into_iter().collect()),
            Selection::One(index) if index < len => Ok(vec![index]),
            Selection::One(index) => Err(JournalError::OutOfRange { index, len }),
        }
    }
}

/// Move one entry's file back to where it came from.
pub fn restore_entry(entry: &JournalEntry, relocator: &Relocator) -> Result<(), JournalError> {
    if !entry.to.is_file() {
        return Err(JournalError::SourceMissing {
            path: entry.to.clone(),
        });
    }
    if fs::symlink_metadata(&entry.from).is_ok() {
        return Err(JournalError::DestinationOccupied {
            path: entry.from.clone(),
        });
    }
    relocator.move_to(&entry.to, &entry.from)?;
    Ok(())
}

/// Undo the selected entries, then rewrite the journal without the ones that
/// were restored. Returns how many were restored.
pub fn restore(
    path: &Path,
    selection: Selection,
    relocator: &Relocator,
) -> Result<usize, JournalError> {
    let stored = read_entries(path)?;
    if stored.is_empty() {
        return Err(JournalError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mut restored = Vec::new();
    // newest first, so chains of moves unwind in order
    for i in selection.indices(stored.len())?.into_iter().rev() {
        let entry = &stored[i].0;
        match restore_entry(entry, relocator) {
            Ok(()) => {
                log::info!("RESTORE {} -> {}", entry.to.display(), entry.from.display());
                restored.push(i);
            }
            Err(e) => log::error!("restore of entry {} failed: {}", i, e),
        }
    }

    if !relocator.is_dry_run() && !restored.is_empty() {
        let remaining: Vec<&str> = stored
            .iter()
            .enumerate()
            .filter(|(i, _)| !restored.contains(i))
            .map(|(_, (_, line))| line.as_str())
            .collect();
        rewrite(path, &remaining)?;
    }
    Ok(restored.len())
}

fn rewrite(path: &Path, lines: &[&str]) -> Result<(), JournalError> {
    let io_err = |source: std::io::Error| JournalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(&tmp, content).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
