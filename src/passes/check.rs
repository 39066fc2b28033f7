use crate::config::Config;
use crate::core::hash::{Fingerprint, HashService};
use crate::core::relocate::Relocator;
use crate::core::resolver::{resolve, Action};
use crate::core::walk;
use crate::index::{Index, IndexError, IndexStore, PendingIndex, Record};
use crate::journal::{Journal, MoveAction};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub visited: usize,
    /// Indexed before and still in place.
    pub kept: usize,
    pub added: usize,
    pub quarantined: usize,
    /// Entries dropped because their file is gone or out of reach.
    pub pruned: usize,
    /// Files left unrecorded after a hash, move or encoding failure.
    pub failed: usize,
    pub written: usize,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} kept, {} new, {} duplicates, {} pruned, {} failed",
            self.visited, self.kept, self.added, self.quarantined, self.pruned, self.failed
        )
    }
}

/// Reconcile the archive with its persisted index and rewrite the index.
///
/// Returns the reconciled in-memory index, which holds exactly the records
/// written. Only index I/O failures abort the pass; in that case the live
/// index file is left as it was.
pub fn run_check(
    config: &Config,
    journal: &mut Journal,
    progress: &ProgressBar,
) -> Result<(Index, CheckReport), IndexError> {
    let store = IndexStore::new(&config.index_file);
    let excluded = config.excluded();
    let mut report = CheckReport::default();

    log::debug!("STEP 1 load {}", store.path().display());
    let mut index = store.load()?;

    log::debug!("STEP 2 drop records of missing files");
    for path in index.prune_missing() {
        log::info!("DEL {}", path.display());
        report.pruned += 1;
    }
    for path in index.retain(|p| within(p, &config.archive, &excluded)) {
        log::info!("DEL {} (outside archive)", path.display());
        report.pruned += 1;
    }
    log::debug!("{} entries after pruning", index.len());

    log::debug!("STEP 3 open pending index");
    let mut pending = if config.dry_run {
        None
    } else {
        Some(store.begin_write()?)
    };

    log::debug!("STEP 4 walk {}", config.archive.display());
    let hasher = HashService::new();
    let relocator = Relocator::new(config.dry_run);
    let mut recorded: HashSet<PathBuf> = HashSet::new();

    for path in walk::regular_files(&config.archive, &excluded) {
        progress.inc(1);
        report.visited += 1;
        log::trace!("{:06} Processing {}", report.visited, path.display());

        let action = match resolve(&hasher, &path, &index) {
            Ok(action) => action,
            Err(e) => {
                log::error!("hash {} failed: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        match action {
            Action::AlreadyKnown(fingerprint) => {
                log::debug!("SKIP {}", path.display());
                if write_record(pending.as_mut(), &path, fingerprint)? {
                    recorded.insert(path);
                    report.kept += 1;
                } else {
                    index.remove(&path);
                    report.failed += 1;
                }
            }
            Action::New(fingerprint) => {
                index.insert(path.clone(), fingerprint.clone());
                if write_record(pending.as_mut(), &path, fingerprint)? {
                    log::info!("NEW {}", path.display());
                    recorded.insert(path);
                    report.added += 1;
                } else {
                    index.remove(&path);
                    report.failed += 1;
                }
            }
            Action::Duplicate { of, .. } => {
                log::info!("DUP {}|{}", of.display(), path.display());
                index.remove(&path);
                match relocator.move_into(&path, &config.quarantine) {
                    Ok(dest) => {
                        log::info!("MOVDUP {} -> {}", path.display(), dest.display());
                        journal.record(MoveAction::Quarantined, &path, &dest);
                        report.quarantined += 1;
                    }
                    Err(e) => {
                        log::error!("quarantine {} failed: {}", path.display(), e);
                        report.failed += 1;
                    }
                }
            }
        }
    }

    // Entries the walk never reached (unreadable subtree, replaced by a
    // symlink) are not in the new file either.
    for path in index.retain(|p| recorded.contains(p)) {
        log::info!("DEL {} (not reached by walk)", path.display());
        report.pruned += 1;
    }

    log::debug!("STEP 5 commit");
    if let Some(pending) = pending {
        report.written = pending.commit()?;
    } else {
        report.written = recorded.len();
    }
    log::debug!("check done: {}", report);

    Ok((index, report))
}

/// Encode and append one record. `Ok(false)` when the path cannot be stored.
fn write_record(
    pending: Option<&mut PendingIndex>,
    path: &Path,
    fingerprint: Fingerprint,
) -> Result<bool, IndexError> {
    let record = match Record::new(path, fingerprint) {
        Ok(record) => record,
        Err(e) => {
            log::error!("not indexing {}: {}", path.display(), e);
            return Ok(false);
        }
    };
    if let Some(pending) = pending {
        pending.append(&record)?;
    }
    Ok(true)
}

fn within(path: &Path, archive: &Path, excluded: &[PathBuf]) -> bool {
    path.starts_with(archive) && !excluded.iter().any(|e| path.starts_with(e))
}
