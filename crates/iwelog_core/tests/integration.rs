//! Integration tests for the log store.

use iwelog_core::{
    increment_id_in_name, Capacities, Config, LogStore, NewRecord, SegmentName, Severity,
    StoreError,
};
use iwelog_storage::{FileBackend, StorageBackend};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn record(n: usize) -> NewRecord {
    NewRecord::new("netlog", format!("cmd/main.go:{n}"), format!("event {n}"))
}

fn name(raw: &str) -> SegmentName {
    SegmentName::parse(raw).unwrap()
}

fn memory_store(capacities: Capacities) -> LogStore {
    let store = LogStore::open_in_memory(
        Config::default()
            .capacities(capacities)
            .sync_on_append(false),
    )
    .unwrap();
    store.initialize().unwrap();
    store
}

#[test]
fn warning_segment_overruns_by_one_row() {
    let store = memory_store(Capacities::uniform(10_000).with(Severity::Warning, 3));

    let mut segments = Vec::new();
    for n in 0..4 {
        let outcome = store.append(Severity::Warning, &record(n)).unwrap();
        segments.push(outcome.segment.to_string());
    }

    assert_eq!(segments, ["logW_1"; 4]);
    assert_eq!(store.active_segment(Severity::Warning).unwrap(), name("logW_2"));
    assert_eq!(store.row_count(&name("logW_1")).unwrap(), 4);
    assert_eq!(store.row_count(&name("logW_2")).unwrap(), 0);

    let fifth = store.append(Severity::Warning, &record(4)).unwrap();
    assert_eq!(fifth.segment, name("logW_2"));
    assert_eq!(fifth.sequence.as_u64(), 1);
}

#[test]
fn initialize_twice_changes_nothing() {
    let store = memory_store(Capacities::uniform(1));
    store.append(Severity::Info, &record(0)).unwrap();
    store.append(Severity::Info, &record(1)).unwrap();

    let before = store.status().unwrap();
    store.initialize().unwrap();
    assert_eq!(store.status().unwrap(), before);
    assert_eq!(store.active_segment(Severity::Info).unwrap(), name("logI_2"));
}

#[test]
fn rejected_records_leave_no_trace() {
    let store = memory_store(Capacities::uniform(2));
    let before = store.status().unwrap();

    for bad in [
        NewRecord::new("", "l", "b"),
        NewRecord::new("p", "", "b"),
        NewRecord::new("p", "l", ""),
    ] {
        assert!(matches!(
            store.append(Severity::Error, &bad),
            Err(StoreError::Validation { .. })
        ));
    }
    assert!(matches!(
        store.submit("X", "p", "l", "b"),
        Err(StoreError::UnsupportedSeverity { .. })
    ));

    assert_eq!(store.status().unwrap(), before);
}

#[test]
fn rotated_segment_receives_later_records_only() {
    let store = memory_store(Capacities::uniform(2));

    let outcomes: Vec<_> = (0..7)
        .map(|n| store.append(Severity::Error, &record(n)).unwrap())
        .collect();

    let placement: Vec<(String, u64)> = outcomes
        .iter()
        .map(|o| (o.segment.to_string(), o.sequence.as_u64()))
        .collect();
    assert_eq!(
        placement,
        [
            ("logE_1".to_string(), 1),
            ("logE_1".to_string(), 2),
            ("logE_1".to_string(), 3),
            ("logE_2".to_string(), 1),
            ("logE_2".to_string(), 2),
            ("logE_2".to_string(), 3),
            ("logE_3".to_string(), 1),
        ]
    );
    let rotations: Vec<_> = outcomes.iter().filter_map(|o| o.rotated_to.clone()).collect();
    assert_eq!(rotations, [name("logE_2"), name("logE_3")]);
}

#[test]
fn file_store_resumes_after_reopen() {
    let dir = TempDir::new().unwrap();
    let config = Config::default().capacity(Severity::Info, 2);

    {
        let store = LogStore::open(dir.path(), config.clone()).unwrap();
        store.initialize().unwrap();
        for n in 0..4 {
            store.append(Severity::Info, &record(n)).unwrap();
        }
        store.close().unwrap();
    }

    let store = LogStore::open(dir.path(), config).unwrap();
    store.initialize().unwrap();
    assert_eq!(store.active_segment(Severity::Info).unwrap(), name("logI_2"));
    assert_eq!(store.row_count(&name("logI_1")).unwrap(), 3);

    let outcome = store.append(Severity::Info, &record(4)).unwrap();
    assert_eq!(outcome.segment, name("logI_2"));
    assert_eq!(outcome.sequence.as_u64(), 2);
}

#[test]
fn second_open_is_locked() {
    let dir = TempDir::new().unwrap();
    let _first = LogStore::open(dir.path(), Config::default()).unwrap();

    assert!(matches!(
        LogStore::open(dir.path(), Config::default()),
        Err(StoreError::StoreLocked)
    ));
}

#[test]
fn torn_tail_is_dropped_on_reopen() {
    let dir = TempDir::new().unwrap();
    let segment_path;
    {
        let store = LogStore::open(dir.path(), Config::default()).unwrap();
        store.initialize().unwrap();
        store.append(Severity::Error, &record(0)).unwrap();
        store.append(Severity::Error, &record(1)).unwrap();
        store.close().unwrap();
        segment_path = dir.path().join("segments").join("logE_1.seg");
    }

    let mut backend = FileBackend::open(&segment_path).unwrap();
    backend.append(&[0x40, 0, 0, 0, 1, 2, 3]).unwrap();
    backend.sync().unwrap();
    drop(backend);

    let store = LogStore::open(dir.path(), Config::default()).unwrap();
    let report_for = |store: &LogStore| {
        store
            .verify()
            .unwrap()
            .into_iter()
            .find(|r| r.segment == name("logE_1"))
            .unwrap()
    };

    // Reading reports the tail; the first append drops it.
    let report = report_for(&store);
    assert_eq!(report.rows, 2);
    assert_eq!(report.torn_tail_bytes, 7);

    let outcome = store.append(Severity::Error, &record(2)).unwrap();
    assert_eq!(outcome.sequence.as_u64(), 3);

    let report = report_for(&store);
    assert_eq!(report.rows, 3);
    assert_eq!(report.torn_tail_bytes, 0);
}

#[test]
fn damaged_length_prefix_keeps_later_rows() {
    let dir = TempDir::new().unwrap();
    let segment_path = dir.path().join("segments").join("logW_1.seg");
    {
        let store = LogStore::open(dir.path(), Config::default()).unwrap();
        store.initialize().unwrap();
        for n in 0..3 {
            store.append(Severity::Warning, &record(n)).unwrap();
        }
        store.close().unwrap();
    }

    let mut bytes = std::fs::read(&segment_path).unwrap();
    let second = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    bytes[second..second + 4].copy_from_slice(&0xFFFFu32.to_le_bytes());
    std::fs::write(&segment_path, &bytes).unwrap();

    let store = LogStore::open(dir.path(), Config::default()).unwrap();
    assert!(matches!(
        store.append(Severity::Warning, &record(3)),
        Err(StoreError::SegmentCorruption { .. })
    ));
    assert!(matches!(
        store.verify(),
        Err(StoreError::SegmentCorruption { .. })
    ));
    assert_eq!(std::fs::read(&segment_path).unwrap(), bytes);
}

#[test]
fn many_rotations_keep_file_store_usable() {
    let dir = TempDir::new().unwrap();
    let config = Config::default()
        .capacity(Severity::Info, 1)
        .sync_on_append(false);
    let store = LogStore::open(dir.path(), config).unwrap();
    store.initialize().unwrap();

    for n in 0..2_400 {
        store.append(Severity::Info, &record(n)).unwrap();
    }
    assert_eq!(store.active_segment(Severity::Info).unwrap(), name("logI_1201"));

    let status = store.status().unwrap();
    assert_eq!(status.segments.len(), 1_201 + 2);
    assert_eq!(store.verify().unwrap().len(), 1_203);

    // Still appending after every retired segment was read.
    let outcome = store.append(Severity::Info, &record(2_400)).unwrap();
    assert_eq!(outcome.segment, name("logI_1201"));
}

#[test]
fn concurrent_appends_rotate_exactly_once_per_overflow() {
    let store = Arc::new(memory_store(Capacities::uniform(59)));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..25)
                    .map(|n| store.append(Severity::Warning, &record(t * 100 + n)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let placements: HashSet<(String, u64)> = outcomes
        .iter()
        .map(|o| (o.segment.to_string(), o.sequence.as_u64()))
        .collect();
    assert_eq!(placements.len(), 100, "every (segment, sequence) is unique");

    let rotations: Vec<_> = outcomes.iter().filter_map(|o| o.rotated_to.clone()).collect();
    assert_eq!(rotations, [name("logW_2")]);
    assert_eq!(store.row_count(&name("logW_1")).unwrap(), 60);
    assert_eq!(store.row_count(&name("logW_2")).unwrap(), 40);
}

#[test]
fn concurrent_severities_do_not_interfere() {
    let store = Arc::new(memory_store(Capacities::uniform(9)));

    let handles: Vec<_> = Severity::ALL
        .into_iter()
        .map(|severity| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..25 {
                    store.append(severity, &record(n)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for severity in Severity::ALL {
        let active = store.active_segment(severity).unwrap();
        assert_eq!(active.prefix(), severity.segment_prefix());
        assert_eq!(active.index(), 3);
    }
    for report in store.verify().unwrap() {
        assert_eq!(report.torn_tail_bytes, 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn segments_hold_capacity_plus_one(capacity in 1u64..8, appends in 1usize..40) {
        let store = memory_store(Capacities::uniform(capacity));
        for n in 0..appends {
            store.append(Severity::Info, &record(n)).unwrap();
        }

        let status = store.status().unwrap();
        let info: Vec<_> = status
            .segments
            .iter()
            .filter(|(name, _)| name.severity() == Some(Severity::Info))
            .collect();

        let (active, _) = info.last().unwrap();
        prop_assert_eq!(active, &store.active_segment(Severity::Info).unwrap());
        for (_, rows) in &info[..info.len() - 1] {
            prop_assert_eq!(*rows, capacity + 1);
        }
        let total: u64 = info.iter().map(|(_, rows)| rows).sum();
        prop_assert_eq!(total, appends as u64);
    }

    #[test]
    fn increment_keeps_prefix(prefix in "log[IWE]", index in 1u64..1_000_000) {
        let next = increment_id_in_name(&format!("{prefix}_{index}")).unwrap();
        prop_assert_eq!(next, format!("{prefix}_{}", index + 1));
    }
}
