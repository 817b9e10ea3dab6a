//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use iwelog_core::{NewRecord, SegmentName, Severity};
use proptest::prelude::*;

/// Strategy for generating severities.
pub fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

/// Strategy for generating tags that parse to a severity, in any accepted
/// spelling.
pub fn valid_tag_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "I", "W", "E", "i", "w", "e", "info", "INFO", "warn", "Warning", "error", "ERROR",
    ])
    .prop_map(str::to_string)
}

/// Strategy for generating tags that parse to no severity.
pub fn invalid_tag_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z]{0,6}")
        .expect("Invalid regex")
        .prop_filter("Tag must not name a severity", |tag| {
            tag.parse::<Severity>().is_err()
        })
}

/// Strategy for generating valid segment names of a severity.
pub fn segment_name_strategy(severity: Severity) -> impl Strategy<Value = SegmentName> {
    (1u64..1_000_000).prop_map(move |index| {
        SegmentName::new(severity.segment_prefix(), index).expect("Generated name is valid")
    })
}

/// Strategy for generating valid records.
pub fn record_strategy() -> impl Strategy<Value = NewRecord> {
    (
        prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex"),
        prop::string::string_regex("[a-z/]{1,20}\\.(go|rs):[0-9]{1,4}").expect("Invalid regex"),
        prop::string::string_regex(".{1,200}").expect("Invalid regex"),
    )
        .prop_map(|(project, location, body)| NewRecord::new(project, location, body))
}

/// Strategy for generating records with at least one empty field.
pub fn invalid_record_strategy() -> impl Strategy<Value = NewRecord> {
    (record_strategy(), 0usize..3).prop_map(|(mut record, field)| {
        match field {
            0 => record.project.clear(),
            1 => record.location.clear(),
            _ => record.body.clear(),
        }
        record
    })
}

/// Strategy for generating a workload: which severity each append goes to.
pub fn workload_strategy(max_len: usize) -> impl Strategy<Value = Vec<Severity>> {
    prop::collection::vec(severity_strategy(), 0..max_len)
}
