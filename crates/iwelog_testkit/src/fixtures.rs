//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up initialized test stores
//! and common test scenarios.

use iwelog_core::{Config, LogStore, NewRecord};
use std::path::PathBuf;
use tempfile::TempDir;

/// An initialized test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: LogStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store with default capacities.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates a new in-memory test store.
    pub fn memory_with(config: Config) -> Self {
        let store = LogStore::open_in_memory(config.sync_on_append(false))
            .expect("Failed to open in-memory store");
        store.initialize().expect("Failed to initialize store");
        Self {
            store,
            _temp_dir: None,
        }
    }

    /// Creates a new file-based test store in a temporary directory.
    pub fn file_with(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            LogStore::open(temp_dir.path(), config).expect("Failed to open file store");
        store.initialize().expect("Failed to initialize store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().to_path_buf())
    }

    /// Closes the store and reopens it from disk.
    ///
    /// Panics for in-memory stores, whose contents do not survive closing.
    pub fn reopen(self, config: Config) -> Self {
        let temp_dir = self
            ._temp_dir
            .expect("Only file stores can be reopened");
        self.store.close().expect("Failed to close store");

        let store =
            LogStore::open(temp_dir.path(), config).expect("Failed to reopen file store");
        store.initialize().expect("Failed to initialize store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = LogStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Returns a valid record whose fields are derived from `n`.
pub fn sample_record(n: usize) -> NewRecord {
    NewRecord::new(
        "netlog",
        format!("cmd/main.go:{}", 10 + n),
        format!("event number {n}"),
    )
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use iwelog_testkit::{sample_record, with_temp_store};
/// use iwelog_core::Severity;
///
/// with_temp_store(|store| {
///     store.append(Severity::Error, &sample_record(1)).unwrap();
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&LogStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-based store.
pub fn with_file_store<F, R>(config: Config, f: F) -> R
where
    F: FnOnce(&LogStore, &std::path::Path) -> R,
{
    let test_store = TestStore::file_with(config);
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use iwelog_core::Severity;

    /// Creates a store where `severity` has already received `count`
    /// records.
    pub fn populated_store(config: Config, severity: Severity, count: usize) -> TestStore {
        let store = TestStore::memory_with(config);
        for n in 0..count {
            store
                .append(severity, &sample_record(n))
                .expect("Failed to append record");
        }
        store
    }
}
