//! Status command implementation.

use iwelog_core::{Config, StoreStatus};
use serde::Serialize;
use std::path::Path;

/// Store status as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Store path.
    pub path: String,
    /// Whether the directory record exists.
    pub initialized: bool,
    /// Active segment per severity.
    pub active: Vec<ActiveSegment>,
    /// Every segment with its row count.
    pub segments: Vec<SegmentRows>,
    /// Fatal error that stopped writes, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poisoned: Option<String>,
}

/// The active segment of one severity.
#[derive(Debug, Serialize)]
pub struct ActiveSegment {
    /// Severity name.
    pub severity: String,
    /// Segment name.
    pub segment: String,
    /// Rows in the segment.
    pub rows: u64,
    /// Rotation threshold.
    pub capacity: u64,
}

/// Row count of one segment.
#[derive(Debug, Serialize)]
pub struct SegmentRows {
    /// Segment name.
    pub segment: String,
    /// Number of rows.
    pub rows: u64,
}

impl StatusReport {
    fn new(path: &Path, status: StoreStatus) -> Self {
        Self {
            path: path.display().to_string(),
            initialized: status.initialized,
            active: status
                .severities
                .into_iter()
                .map(|s| ActiveSegment {
                    severity: s.severity.to_string(),
                    segment: s.active.to_string(),
                    rows: s.rows,
                    capacity: s.capacity,
                })
                .collect(),
            segments: status
                .segments
                .into_iter()
                .map(|(name, rows)| SegmentRows {
                    segment: name.to_string(),
                    rows,
                })
                .collect(),
            poisoned: status.poisoned,
        }
    }
}

/// Runs the status command.
pub fn run(path: &Path, config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path, config)?;
    let report = StatusReport::new(path, store.status()?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

fn print_text_output(report: &StatusReport) {
    println!("Store: {}", report.path);
    if !report.initialized {
        println!("Not initialized (run `iwelog init`)");
        return;
    }
    if let Some(reason) = &report.poisoned {
        println!("POISONED: {reason}");
    }

    println!();
    println!("Active segments:");
    for active in &report.active {
        println!(
            "  {:<8} {:<12} {:>8} / {} rows",
            active.severity, active.segment, active.rows, active.capacity
        );
    }

    println!();
    println!("Segments ({}):", report.segments.len());
    for segment in &report.segments {
        println!("  {:<12} {:>8} rows", segment.segment, segment.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iwelog_core::{LogStore, NewRecord, Severity};

    #[test]
    fn report_mirrors_store() {
        let store = LogStore::open_in_memory(
            Config::default()
                .capacity(Severity::Error, 1)
                .sync_on_append(false),
        )
        .unwrap();
        store.initialize().unwrap();
        for _ in 0..2 {
            store
                .append(Severity::Error, &NewRecord::new("p", "l", "b"))
                .unwrap();
        }

        let report = StatusReport::new(Path::new("mem"), store.status().unwrap());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["initialized"], true);
        assert_eq!(json["active"][2]["segment"], "logE_2");
        assert_eq!(json["segments"][0]["segment"], "logE_1");
        assert_eq!(json["segments"][0]["rows"], 2);
        assert!(json.get("poisoned").is_none());
    }
}
