//! Stress tests for IWELog.
//!
//! These helpers drive a store from many threads at once and then check
//! that every severity chain is still well formed.

use crate::fixtures::sample_record;
use iwelog_core::{LogStore, SegmentName, Severity};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Rotations observed.
    pub rotations: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, rotations: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            rotations,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Rotations: {}", self.rotations);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Appends per thread.
    pub appends_per_thread: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Severities the threads write to, assigned round robin.
    pub severities: Vec<Severity>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            appends_per_thread: 1_000,
            threads: 4,
            severities: Severity::ALL.to_vec(),
        }
    }
}

/// Appends from `config.threads` threads at once.
pub fn stress_concurrent_appends(store: &Arc<LogStore>, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(store);
            let severity = config.severities[t % config.severities.len()];
            let appends = config.appends_per_thread;
            thread::spawn(move || {
                let (mut ok, mut failed, mut rotations) = (0usize, 0usize, 0usize);
                for n in 0..appends {
                    match store.append(severity, &sample_record(t * appends + n)) {
                        Ok(outcome) => {
                            ok += 1;
                            if outcome.rotated_to.is_some() {
                                rotations += 1;
                            }
                        }
                        Err(_) => failed += 1,
                    }
                }
                (ok, failed, rotations)
            })
        })
        .collect();

    let (mut ok, mut failed, mut rotations) = (0, 0, 0);
    for handle in handles {
        let (o, f, r) = handle.join().expect("Stress thread panicked");
        ok += o;
        failed += f;
        rotations += r;
    }

    StressTestResult::new(ok, failed, rotations, start.elapsed())
}

/// Checks that the chain of `severity` is contiguous and that every
/// retired segment holds exactly `capacity + 1` rows.
///
/// Returns the total number of rows in the chain.
pub fn check_chain(store: &LogStore, severity: Severity) -> Result<u64, String> {
    let status = store.status().map_err(|e| e.to_string())?;
    let chain: Vec<&(SegmentName, u64)> = status
        .segments
        .iter()
        .filter(|(name, _)| name.severity() == Some(severity))
        .collect();

    let capacity = store.config().capacities.get(severity);
    let active = store.active_segment(severity).map_err(|e| e.to_string())?;

    let indices: HashSet<u64> = chain.iter().map(|(name, _)| name.index()).collect();
    for index in 1..=active.index() {
        if !indices.contains(&index) {
            return Err(format!("{severity} chain is missing index {index}"));
        }
    }

    let mut total = 0;
    for (name, rows) in chain {
        if name.index() < active.index() && *rows != capacity + 1 {
            return Err(format!(
                "{name} holds {rows} rows, expected {}",
                capacity + 1
            ));
        }
        if name.index() > active.index() && *rows != 0 {
            return Err(format!("{name} is ahead of the active segment but has rows"));
        }
        total += rows;
    }
    Ok(total)
}
