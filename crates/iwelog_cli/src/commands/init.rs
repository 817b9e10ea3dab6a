//! Init command implementation.

use iwelog_core::{LogStore, Severity};
use std::path::Path;

/// Runs the init command.
pub fn run(path: &Path, config: iwelog_core::Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = LogStore::open(path, config.create_if_missing(true))?;
    store.initialize()?;

    println!("Initialized store at {}", path.display());
    for severity in Severity::ALL {
        println!("  {:<8} {}", severity, store.active_segment(severity)?);
    }

    store.close()?;
    Ok(())
}
