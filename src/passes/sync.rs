use crate::config::Config;
use crate::core::exif::CaptureDateSource;
use crate::core::hash::HashService;
use crate::core::relocate::Relocator;
use crate::core::resolver::{resolve_incoming, Incoming};
use crate::core::walk;
use crate::index::Index;
use crate::journal::{Journal, MoveAction};
use indicatif::ProgressBar;
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub visited: usize,
    pub imported: usize,
    pub duplicates: usize,
    /// No usable capture date; left in the input directory.
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} imported, {} duplicates, {} without date, {} failed",
            self.visited, self.imported, self.duplicates, self.skipped, self.failed
        )
    }
}

/// Import the input directory into the archive.
///
/// Files whose content is already in `index` go to quarantine, the rest to
/// `<archive>/<YYYY-MM>/`. Imported files are added to `index` in memory so
/// repeats within the input are caught; the index file is left for the next
/// check to update.
pub fn run_sync(
    config: &Config,
    index: &mut Index,
    dates: &dyn CaptureDateSource,
    journal: &mut Journal,
    progress: &ProgressBar,
) -> SyncReport {
    let mut report = SyncReport::default();
    let Some(source) = config.source.as_deref() else {
        log::error!("sync needs an input directory");
        return report;
    };

    let excluded = config.excluded();
    let hasher = HashService::new();
    let relocator = Relocator::new(config.dry_run);

    for path in walk::regular_files(source, &excluded) {
        progress.inc(1);
        report.visited += 1;
        log::trace!("{:06} SYNC {}", report.visited, path.display());

        let action = match resolve_incoming(&hasher, &path, index) {
            Ok(action) => action,
            Err(e) => {
                log::error!("hash {} failed: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        match action {
            Incoming::Duplicate { of, .. } => {
                log::info!("DUP {}|{}", of.display(), path.display());
                match relocator.move_into(&path, &config.quarantine) {
                    Ok(dest) => {
                        log::info!("MOVDUP {} -> {}", path.display(), dest.display());
                        journal.record(MoveAction::Quarantined, &path, &dest);
                        report.duplicates += 1;
                    }
                    Err(e) => {
                        log::error!("quarantine {} failed: {}", path.display(), e);
                        report.failed += 1;
                    }
                }
            }
            Incoming::New(fingerprint) => {
                let date = match dates.capture_date(&path) {
                    Ok(date) => date,
                    Err(e) => {
                        log::error!("no capture date for {}: {}", path.display(), e);
                        report.skipped += 1;
                        continue;
                    }
                };

                let dir = config.archive.join(date.folder_name());
                match relocator.move_into(&path, &dir) {
                    Ok(dest) => {
                        log::info!("SYNC {} -> {}", path.display(), dest.display());
                        journal.record(MoveAction::Filed, &path, &dest);
                        index.insert(dest, fingerprint);
                        report.imported += 1;
                    }
                    Err(e) => {
                        log::error!("sync {} failed: {}", path.display(), e);
                        report.failed += 1;
                    }
                }
            }
        }
    }

    log::debug!("sync done: {}", report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::core::exif::{CaptureDate, ExifError};
    use crate::core::hash::Fingerprint;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Dates every file 2022-11, except names starting with "nodate".
    struct FixedDate;

    impl CaptureDateSource for FixedDate {
        fn capture_date(&self, path: &Path) -> Result<CaptureDate, ExifError> {
            let name = path.file_name().unwrap().to_string_lossy();
            if name.starts_with("nodate") {
                Err(ExifError::MissingDate)
            } else {
                Ok(CaptureDate {
                    year: 2022,
                    month: 11,
                })
            }
        }
    }

    fn config(root: &Path) -> Config {
        for dir in ["archive", "dups", "incoming"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        Config {
            archive: root.join("archive"),
            quarantine: root.join("dups"),
            index_file: root.join("md5.sum"),
            source: Some(root.join("incoming")),
            mode: Mode::Sync,
            dry_run: false,
        }
    }

    fn sync(config: &Config, index: &mut Index) -> SyncReport {
        run_sync(
            config,
            index,
            &FixedDate,
            &mut Journal::disabled(),
            &ProgressBar::hidden(),
        )
    }

    #[test]
    fn test_unique_file_is_filed_by_month() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        fs::write(temp_dir.path().join("incoming/c.jpg"), b"c").unwrap();

        let mut index = Index::new();
        let report = sync(&config, &mut index);

        assert_eq!(report.imported, 1);
        let filed = config.archive.join("2022-11/c.jpg");
        assert_eq!(fs::read(&filed).unwrap(), b"c");
        assert!(!temp_dir.path().join("incoming/c.jpg").exists());
        assert!(index.fingerprint_of(&filed).is_some());
    }

    #[test]
    fn test_known_content_goes_to_quarantine() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        fs::write(temp_dir.path().join("incoming/b.jpg"), b"same").unwrap();

        let mut index = Index::new();
        index.insert(
            config.archive.join("a.jpg"),
            Fingerprint::new(blake3::hash(b"same").to_hex().to_string()),
        );
        let report = sync(&config, &mut index);

        assert_eq!(report.duplicates, 1);
        assert!(config.quarantine.join("b.jpg").exists());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_repeat_within_input_is_caught() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        fs::write(temp_dir.path().join("incoming/a.jpg"), b"twin").unwrap();
        fs::write(temp_dir.path().join("incoming/b.jpg"), b"twin").unwrap();

        let report = sync(&config, &mut Index::new());
        assert_eq!(report.imported, 1);
        assert_eq!(report.duplicates, 1);
        assert!(config.archive.join("2022-11/a.jpg").exists());
        assert!(config.quarantine.join("b.jpg").exists());
    }

    #[test]
    fn test_missing_date_leaves_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        let src = temp_dir.path().join("incoming/nodate.jpg");
        fs::write(&src, b"n").unwrap();

        let mut index = Index::new();
        let report = sync(&config, &mut index);
        assert_eq!(report.skipped, 1);
        assert!(src.exists());
        assert!(index.is_empty());
    }

    #[test]
    fn test_name_collision_gets_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        fs::create_dir_all(config.archive.join("2022-11")).unwrap();
        fs::write(config.archive.join("2022-11/c.jpg"), b"resident").unwrap();
        fs::write(temp_dir.path().join("incoming/c.jpg"), b"incoming").unwrap();

        let report = sync(&config, &mut Index::new());
        assert_eq!(report.imported, 1);
        assert_eq!(fs::read(config.archive.join("2022-11/c.jpg")).unwrap(), b"resident");
        assert_eq!(fs::read(config.archive.join("2022-11/c_1.jpg")).unwrap(), b"incoming");
    }

    #[test]
    fn test_blocked_month_dir_leaves_source() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(temp_dir.path());
        // a regular file where the month directory should go
        fs::write(config.archive.join("2022-11"), b"").unwrap();
        let src = temp_dir.path().join("incoming/c.jpg");
        fs::write(&src, b"c").unwrap();

        let mut index = Index::new();
        let report = sync(&config, &mut index);
        assert_eq!(report.failed, 1);
        assert_eq!(report.imported, 0);
        assert_eq!(fs::read(&src).unwrap(), b"c");
        assert!(index.is_empty());
    }

    #[test]
    fn test_failed_quarantine_leaves_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(temp_dir.path());
        config.quarantine = temp_dir.path().join("dups-file");
        fs::write(&config.quarantine, b"").unwrap();
        let src = temp_dir.path().join("incoming/b.jpg");
        fs::write(&src, b"same").unwrap();

        let mut index = Index::new();
        index.insert(
            config.archive.join("a.jpg"),
            Fingerprint::new(blake3::hash(b"same").to_hex().to_string()),
        );
        let report = sync(&config, &mut index);
        assert_eq!(report.failed, 1);
        assert_eq!(report.duplicates, 0);
        assert!(src.exists());
    }

    #[test]
    fn test_without_source_does_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(temp_dir.path());
        config.source = None;
        assert_eq!(sync(&config, &mut Index::new()), SyncReport::default());
    }
}
