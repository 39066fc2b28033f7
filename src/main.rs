use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use photosync::cli::{Cli, Commands, HistoryCmd, RunArgs};
use photosync::core::exif::ExifService;
use photosync::core::relocate::Relocator;
use photosync::journal::{self, Journal, Selection};
use photosync::{logging, passes, Config, Mode};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose, cli.quiet);

    let result = match cli.command {
        Some(Commands::History { command }) => history(command),
        None => run(&cli.run, !cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RunArgs, show_progress: bool) -> Result<()> {
    let config = Config::from_args(args)?;
    log::debug!("{:?}", config);

    let mut journal = if config.dry_run {
        Journal::disabled()
    } else {
        Journal::new(Journal::path_for(&config.index_file))
    };

    let spinner = passes::spinner(show_progress, "Checking archive…");
    let (mut index, report) = benchmark("check", || {
        passes::run_check(&config, &mut journal, &spinner)
    })
    .context("archive check aborted, index left unchanged")?;
    spinner.finish_and_clear();
    log::info!("check: {}", report);

    if config.mode == Mode::Sync {
        let spinner = passes::spinner(show_progress, "Importing…");
        let dates = ExifService::new();
        let report = benchmark("sync", || {
            passes::run_sync(&config, &mut index, &dates, &mut journal, &spinner)
        });
        spinner.finish_and_clear();
        log::info!("sync: {}", report);
    }

    if config.dry_run {
        log::warn!("dry-run only; no files were changed");
    }
    Ok(())
}

fn history(command: HistoryCmd) -> Result<()> {
    match command {
        HistoryCmd::List { index_file } => {
            let path = Journal::path_for(&index_file);
            let entries = journal::read_entries(&path)
                .with_context(|| format!("Could not read journal {}", path.display()))?;
            if entries.is_empty() {
                println!("No journaled moves.");
            }
            for (i, (entry, _)) in entries.iter().enumerate() {
                println!(
                    "[{}] {} {:?}\n     from: {}\n     to:   {}",
                    i,
                    entry.timestamp,
                    entry.action,
                    entry.from.display(),
                    entry.to.display()
                );
            }
        }

        HistoryCmd::Restore {
            index_file,
            record,
            all,
            yes,
            dry_run,
        } => {
            let path = Journal::path_for(&index_file);
            let selection = match (record, all) {
                (_, true) => Selection::All,
                (Some(i), false) => Selection::One(i),
                (None, false) => Selection::Last,
            };
            if !yes && !dry_run && !confirm_restore(&path, selection)? {
                println!("Nothing restored.");
                return Ok(());
            }
            let restored = journal::restore(&path, selection, &Relocator::new(dry_run))
                .with_context(|| format!("Failed to restore from {}", path.display()))?;
            if dry_run {
                println!("Would restore {} file(s)", restored);
            } else {
                println!("Restored {} file(s)", restored);
            }
        }
    }
    Ok(())
}

fn confirm_restore(journal_path: &Path, selection: Selection) -> Result<bool> {
    let prompt = match selection {
        Selection::All => format!("Restore every move in {}?", journal_path.display()),
        Selection::One(i) => format!("Restore entry {} of {}?", i, journal_path.display()),
        Selection::Last => format!("Restore the last move in {}?", journal_path.display()),
    };
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("confirmation prompt failed")
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!("{} took {:.2?}", label, start.elapsed());
    result
}
