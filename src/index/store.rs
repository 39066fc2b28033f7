use super::record::Record;
use super::Index;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix of the uncommitted copy written next to the live index.
pub const PENDING_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read index {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write index {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to commit index {from} -> {to}: {source}")]
    Commit {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The index file on disk plus its pending sibling.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pending_path(&self) -> PathBuf {
        with_suffix(&self.path, PENDING_SUFFIX)
    }

    /// Load the live index and merge any pending file left by an interrupted
    /// run on top of it.
    pub fn load(&self) -> Result<Index, IndexError> {
        let mut records = read_records(&self.path)?.unwrap_or_else(|| {
            log::warn!("index {} not found, starting empty", self.path.display());
            Vec::new()
        });

        let pending = self.pending_path();
        if let Some(recovered) = read_records(&pending)? {
            log::warn!(
                "merging {} record(s) from interrupted run in {}",
                recovered.len(),
                pending.display()
            );
            records.extend(recovered);
        }

        let index = Index::from_records(records);
        log::debug!("loaded {} index entries from {}", index.len(), self.path.display());
        Ok(index)
    }

    /// Open the pending file for a full rewrite. The live file is untouched
    /// until [`PendingIndex::commit`].
    pub fn begin_write(&self) -> Result<PendingIndex, IndexError> {
        let pending = self.pending_path();
        let file = File::create(&pending).map_err(|source| IndexError::Write {
            path: pending.clone(),
            source,
        })?;
        Ok(PendingIndex {
            writer: BufWriter::new(file),
            pending,
            live: self.path.clone(),
            written: 0,
        })
    }
}

/// An index rewrite in progress. Dropping it without committing leaves the
/// pending file behind to be merged on the next load.
pub struct PendingIndex {
    writer: BufWriter<File>,
    pending: PathBuf,
    live: PathBuf,
    written: usize,
}

impl PendingIndex {
    pub fn append(&mut self, record: &Record) -> Result<(), IndexError> {
        self.writer
            .write_all(record.to_line().as_bytes())
            .map_err(|source| IndexError::Write {
                path: self.pending.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }

    /// Flush, fsync and rename the pending file over the live index.
    pub fn commit(self) -> Result<usize, IndexError> {
        let PendingIndex {
            writer,
            pending,
            live,
            written,
        } = self;

        let file = writer.into_inner().map_err(|e| IndexError::Write {
            path: pending.clone(),
            source: e.into_error(),
        })?;
        file.sync_all().map_err(|source| IndexError::Write {
            path: pending.clone(),
            source,
        })?;
        drop(file);

        fs::rename(&pending, &live).map_err(|source| IndexError::Commit {
            from: pending.clone(),
            to: live.clone(),
            source,
        })?;

        if let Some(parent) = live.parent() {
            if let Err(e) = sync_dir(parent) {
                log::debug!("fsync {} failed: {}", parent.display(), e);
            }
        }
        Ok(written)
    }
}

/// `None` when the file does not exist.
fn read_records(path: &Path) -> Result<Option<Vec<Record>>, IndexError> {
    let read_err = |source: io::Error| IndexError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(read_err(e)),
    };

    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut line = Vec::new();
    let mut lineno = 0usize;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).map_err(read_err)? == 0 {
            break;
        }
        lineno += 1;
        match Record::parse(&line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("invalid line {} in {}: {}", lineno, path.display(), e),
        }
    }
    Ok(Some(records))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
