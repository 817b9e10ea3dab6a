//! Fault injection for IWELog.
//!
//! [`FaultyVolume`] wraps another volume and fails selected operations on
//! demand. It is used to exercise the error paths of initialization,
//! appends and rotation.
//!
//! ## Usage
//!
//! ```rust
//! use iwelog_testkit::faults::FaultyVolume;
//! use iwelog_core::{Config, LogStore};
//! use std::sync::Arc;
//!
//! let volume = Arc::new(FaultyVolume::in_memory());
//! volume.fail_create("logE_1");
//!
//! let store = LogStore::open_with_volume(volume.clone(), Config::default()).unwrap();
//! assert!(store.initialize().is_err());
//!
//! volume.reset();
//! store.initialize().unwrap();
//! ```

use iwelog_storage::{MemoryVolume, StorageBackend, StorageError, StorageResult, Volume};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn injected(operation: &str) -> StorageError {
    StorageError::Io(io::Error::new(
        io::ErrorKind::Other,
        format!("injected {operation} failure"),
    ))
}

/// Switches shared by a faulty volume and every backend it opened.
#[derive(Debug, Default)]
struct Switches {
    fail_appends: AtomicBool,
    partial_appends: AtomicBool,
    fail_syncs: AtomicBool,
    fail_blob_writes: AtomicBool,
    fail_create: Mutex<HashSet<String>>,
    appends_attempted: AtomicUsize,
}

/// A volume wrapper that can fail on demand.
#[derive(Debug)]
pub struct FaultyVolume {
    inner: Arc<dyn Volume>,
    switches: Arc<Switches>,
}

impl FaultyVolume {
    /// Wraps an existing volume.
    pub fn new(inner: Arc<dyn Volume>) -> Self {
        Self {
            inner,
            switches: Arc::new(Switches::default()),
        }
    }

    /// Wraps a fresh in-memory volume.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryVolume::new()))
    }

    /// Sets whether appends fail before writing anything.
    pub fn set_fail_appends(&self, fail: bool) {
        self.switches.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Sets whether appends write half of their bytes and then fail, as a
    /// crash in the middle of a write would.
    pub fn set_partial_appends(&self, partial: bool) {
        self.switches.partial_appends.store(partial, Ordering::SeqCst);
    }

    /// Sets whether backend syncs fail.
    pub fn set_fail_syncs(&self, fail: bool) {
        self.switches.fail_syncs.store(fail, Ordering::SeqCst);
    }

    /// Sets whether blob writes (the directory) fail.
    pub fn set_fail_blob_writes(&self, fail: bool) {
        self.switches.fail_blob_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes creation of the backend `name` fail.
    pub fn fail_create(&self, name: &str) {
        self.switches.fail_create.lock().insert(name.to_string());
    }

    /// Clears every injected fault.
    pub fn reset(&self) {
        self.set_fail_appends(false);
        self.set_partial_appends(false);
        self.set_fail_syncs(false);
        self.set_fail_blob_writes(false);
        self.switches.fail_create.lock().clear();
    }

    /// Returns the number of appends attempted through this volume.
    pub fn appends_attempted(&self) -> usize {
        self.switches.appends_attempted.load(Ordering::SeqCst)
    }
}

impl Volume for FaultyVolume {
    fn create_backend(&self, name: &str) -> StorageResult<bool> {
        if self.switches.fail_create.lock().contains(name) {
            return Err(injected("create"));
        }
        self.inner.create_backend(name)
    }

    fn open_backend(&self, name: &str) -> StorageResult<Box<dyn StorageBackend>> {
        Ok(Box::new(FaultyBackend {
            inner: self.inner.open_backend(name)?,
            switches: Arc::clone(&self.switches),
        }))
    }

    fn contains_backend(&self, name: &str) -> StorageResult<bool> {
        self.inner.contains_backend(name)
    }

    fn backend_names(&self) -> StorageResult<Vec<String>> {
        self.inner.backend_names()
    }

    fn read_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.read_blob(name)
    }

    fn write_blob(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        if self.switches.fail_blob_writes.load(Ordering::SeqCst) {
            return Err(injected("blob write"));
        }
        self.inner.write_blob(name, data)
    }
}

/// A backend opened through a [`FaultyVolume`].
struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    switches: Arc<Switches>,
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        self.switches.appends_attempted.fetch_add(1, Ordering::SeqCst);

        if self.switches.fail_appends.load(Ordering::SeqCst) {
            return Err(injected("append"));
        }
        if self.switches.partial_appends.load(Ordering::SeqCst) {
            self.inner.append(&bytes[..bytes.len() / 2])?;
            return Err(injected("append"));
        }
        self.inner.append(bytes)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.switches.fail_syncs.load(Ordering::SeqCst) {
            return Err(injected("sync"));
        }
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_record;
    use iwelog_core::{Config, LogStore, SegmentName, Severity, StoreError};

    fn name(raw: &str) -> SegmentName {
        SegmentName::parse(raw).unwrap()
    }

    fn open(volume: &Arc<FaultyVolume>, config: Config) -> LogStore {
        LogStore::open_with_volume(volume.clone(), config).unwrap()
    }

    #[test]
    fn partial_initialization_reports_available_segments() {
        let volume = Arc::new(FaultyVolume::in_memory());
        volume.fail_create("logE_1");
        let store = open(&volume, Config::default());

        let err = store.initialize().unwrap_err();
        match &err {
            StoreError::Initialization { message, source } => {
                assert_eq!(message, "2/3 segments available");
                assert!(matches!(**source, StoreError::Schema { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        volume.reset();
        store.initialize().unwrap();
        assert!(volume.contains_backend("logE_1").unwrap());
    }

    #[test]
    fn unwritable_directory_fails_initialization() {
        let volume = Arc::new(FaultyVolume::in_memory());
        volume.set_fail_blob_writes(true);
        let store = open(&volume, Config::default());

        assert!(matches!(
            store.initialize(),
            Err(StoreError::Initialization { .. })
        ));
        assert!(matches!(
            store.append(Severity::Info, &sample_record(0)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn failed_append_leaves_no_row() {
        let volume = Arc::new(FaultyVolume::in_memory());
        let store = open(&volume, Config::default());
        store.initialize().unwrap();
        store.append(Severity::Info, &sample_record(0)).unwrap();

        volume.set_partial_appends(true);
        assert!(matches!(
            store.append(Severity::Info, &sample_record(1)),
            Err(StoreError::Write { .. })
        ));
        volume.set_partial_appends(false);

        let outcome = store.append(Severity::Info, &sample_record(2)).unwrap();
        assert_eq!(outcome.sequence.as_u64(), 2);

        let report = store
            .verify()
            .unwrap()
            .into_iter()
            .find(|r| r.segment == name("logI_1"))
            .unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.torn_tail_bytes, 0);
    }

    #[test]
    fn failed_sync_rolls_back_append() {
        let volume = Arc::new(FaultyVolume::in_memory());
        let store = open(&volume, Config::default().sync_on_append(true));
        store.initialize().unwrap();

        volume.set_fail_syncs(true);
        assert!(matches!(
            store.append(Severity::Error, &sample_record(0)),
            Err(StoreError::Write { .. })
        ));
        volume.set_fail_syncs(false);

        assert_eq!(store.row_count(&name("logE_1")).unwrap(), 0);
        let outcome = store.append(Severity::Error, &sample_record(1)).unwrap();
        assert_eq!(outcome.sequence.as_u64(), 1);
    }

    #[test]
    fn validation_never_reaches_storage() {
        let volume = Arc::new(FaultyVolume::in_memory());
        let store = open(&volume, Config::default());
        store.initialize().unwrap();

        let result = store.submit("W", "netlog", "", "body");
        assert!(matches!(result, Err(StoreError::Validation { .. })));
        assert!(matches!(
            store.submit("T", "netlog", "cmd/main.go:1", "ping"),
            Err(StoreError::UnsupportedSeverity { .. })
        ));
        assert_eq!(volume.appends_attempted(), 0);
    }

    #[test]
    fn rotation_retries_after_segment_creation_fails() {
        let volume = Arc::new(FaultyVolume::in_memory());
        let store = open(&volume, Config::default().capacity(Severity::Warning, 1));
        store.initialize().unwrap();
        volume.fail_create("logW_2");

        store.append(Severity::Warning, &sample_record(0)).unwrap();
        assert!(matches!(
            store.append(Severity::Warning, &sample_record(1)),
            Err(StoreError::Schema { .. })
        ));
        assert!(!store.is_poisoned());
        assert_eq!(store.active_segment(Severity::Warning).unwrap(), name("logW_1"));
        assert_eq!(store.row_count(&name("logW_1")).unwrap(), 2);

        volume.reset();
        let outcome = store.append(Severity::Warning, &sample_record(2)).unwrap();
        assert_eq!(outcome.segment, name("logW_1"));
        assert_eq!(outcome.sequence.as_u64(), 3);
        assert_eq!(outcome.rotated_to, Some(name("logW_2")));
    }

    #[test]
    fn rotation_retries_after_directory_write_fails() {
        let volume = Arc::new(FaultyVolume::in_memory());
        let store = open(&volume, Config::default().capacity(Severity::Error, 1));
        store.initialize().unwrap();

        store.append(Severity::Error, &sample_record(0)).unwrap();
        volume.set_fail_blob_writes(true);
        match store.append(Severity::Error, &sample_record(1)) {
            Err(StoreError::Write { target, .. }) => assert_eq!(target, "DIRECTORY"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(store.active_segment(Severity::Error).unwrap(), name("logE_1"));
        assert!(volume.contains_backend("logE_2").unwrap());

        volume.reset();
        let outcome = store.append(Severity::Error, &sample_record(2)).unwrap();
        assert_eq!(outcome.rotated_to, Some(name("logE_2")));
        assert_eq!(store.active_segment(Severity::Error).unwrap(), name("logE_2"));
        assert_eq!(store.row_count(&name("logE_2")).unwrap(), 0);
    }
}
