pub mod cli;
pub mod config;
pub mod core;
pub mod index;
pub mod journal;
pub mod logging;
pub mod passes;

pub use config::{Config, ConfigError, Mode};
pub use index::{Index, IndexStore};
pub use passes::{run_check, run_sync, CheckReport, SyncReport};
