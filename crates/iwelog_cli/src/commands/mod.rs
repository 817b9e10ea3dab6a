//! CLI command implementations.

pub mod ingest;
pub mod init;
pub mod status;
pub mod submit;
pub mod verify;

use iwelog_core::{Config, LogStore};
use std::path::Path;

/// Opens an existing store for a command.
///
/// Only `init` may create a store; every other command fails on a missing
/// directory instead of silently creating an empty one.
pub fn open_existing(path: &Path, config: Config) -> Result<LogStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }
    Ok(LogStore::open(path, config.create_if_missing(false))?)
}
