//! Benchmark utilities.

#![warn(missing_docs)]

use iwelog_core::{NewRecord, Severity};
use rand::Rng;

/// Generate a random printable message body of the specified size.
pub fn random_body(size: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..size.max(1))
        .map(|_| char::from(rng.gen_range(b' '..=b'~')))
        .collect()
}

/// Generate a record with a random body of the specified size.
pub fn random_record(body_size: usize) -> NewRecord {
    let mut rng = rand::thread_rng();
    NewRecord::new(
        "bench",
        format!("src/main.rs:{}", rng.gen_range(1..2_000)),
        random_body(body_size),
    )
}

/// Generate a batch of records with the specified body size.
pub fn generate_records(count: usize, body_size: usize) -> Vec<NewRecord> {
    (0..count).map(|_| random_record(body_size)).collect()
}

/// Generate a random severity workload.
pub fn random_severities(count: usize) -> Vec<Severity> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| Severity::ALL[rng.gen_range(0..Severity::ALL.len())])
        .collect()
}
