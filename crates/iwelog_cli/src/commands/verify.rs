//! Verify command implementation.

use iwelog_core::{Config, SegmentReport};
use serde::Serialize;
use std::path::Path;

/// Verification result of one segment.
#[derive(Debug, Serialize)]
pub struct SegmentCheck {
    /// Segment name.
    pub segment: String,
    /// Number of complete rows.
    pub rows: u64,
    /// Bytes of complete rows.
    pub bytes: u64,
    /// First sequence, if any.
    pub first_sequence: Option<u64>,
    /// Last sequence, if any.
    pub last_sequence: Option<u64>,
    /// Bytes of an interrupted append, dropped on the next append.
    pub torn_tail_bytes: u64,
}

impl From<&SegmentReport> for SegmentCheck {
    fn from(report: &SegmentReport) -> Self {
        Self {
            segment: report.segment.to_string(),
            rows: report.rows,
            bytes: report.bytes,
            first_sequence: report.first_sequence.map(|s| s.as_u64()),
            last_sequence: report.last_sequence.map(|s| s.as_u64()),
            torn_tail_bytes: report.torn_tail_bytes,
        }
    }
}

/// Runs the verify command.
///
/// Nothing is modified. A torn trailing row is reported, not an error; any
/// error is damage inside the complete rows.
pub fn run(path: &Path, config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path, config)?;

    let reports = match store.verify() {
        Ok(reports) => reports,
        Err(e) => {
            println!("✗ Store verification failed: {e}");
            return Err("Verification failed".into());
        }
    };
    let checks: Vec<SegmentCheck> = reports.iter().map(SegmentCheck::from).collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&checks)?);
        }
        _ => {
            println!("Verifying store at {}", path.display());
            println!();
            for check in &checks {
                let range = match (check.first_sequence, check.last_sequence) {
                    (Some(first), Some(last)) => format!("seq {first}..={last}"),
                    _ => "empty".to_string(),
                };
                println!(
                    "  {:<12} {:>8} rows {:>10} bytes  {}",
                    check.segment, check.rows, check.bytes, range
                );
                if check.torn_tail_bytes > 0 {
                    println!("  {:<12} torn tail of {} bytes", "", check.torn_tail_bytes);
                }
            }
            println!();
            println!("✓ Store verification passed ({} segments)", checks.len());
        }
    }

    Ok(())
}
