//! Submit command implementation.

use iwelog_core::Config;
use std::path::Path;

/// Runs the submit command.
pub fn run(
    path: &Path,
    config: Config,
    tag: &str,
    project: &str,
    location: &str,
    body: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path, config)?;
    let outcome = store.submit(tag, project, location, body)?;

    println!("{} {}", outcome.segment, outcome.sequence);
    if let Some(next) = &outcome.rotated_to {
        println!("rotated to {next}");
    }

    store.close()?;
    Ok(())
}
