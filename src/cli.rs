use crate::config::Mode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "photosync",
    version,
    about = "Deduplicate a photo archive and file new photos by capture month",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Directory to import photos from (sync mode)
    #[arg(short = 'i', long = "input", value_name = "DIR", env = "PHOTOSYNC_INPUT")]
    pub input: Option<PathBuf>,

    /// Archive root, organised as <YYYY-MM>/<file>
    #[arg(short = 'o', long = "output", value_name = "DIR", env = "PHOTOSYNC_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Directory duplicates are moved into
    #[arg(short = 'd', long = "dup-dir", value_name = "DIR", env = "PHOTOSYNC_DUP_DIR")]
    pub dup_dir: Option<PathBuf>,

    /// Content index of the archive
    #[arg(short = 'm', long = "md5-file", value_name = "FILE", env = "PHOTOSYNC_INDEX")]
    pub index_file: Option<PathBuf>,

    /// check: reconcile the archive only; sync: reconcile, then import
    #[arg(short = 'M', long, value_enum, default_value_t = Mode::Check)]
    pub mode: Mode,

    /// Only show what would be moved
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with the move journal
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCmd {
    /// List journaled moves
    List {
        /// Index file the journal belongs to
        #[arg(short = 'm', long = "md5-file", value_name = "FILE", env = "PHOTOSYNC_INDEX")]
        index_file: PathBuf,
    },

    /// Move journaled files back to where they came from
    Restore {
        /// Index file the journal belongs to
        #[arg(short = 'm', long = "md5-file", value_name = "FILE", env = "PHOTOSYNC_INDEX")]
        index_file: PathBuf,
        /// Restore a specific entry (default: the last one)
        #[arg(long, conflicts_with = "all")]
        record: Option<usize>,
        /// Restore every entry
        #[arg(long, conflicts_with = "record")]
        all: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Only show what would be restored
        #[arg(long)]
        dry_run: bool,
    },
}
