//! The log store facade.

use crate::config::Config;
use crate::directory::Directory;
use crate::error::{StoreError, StoreResult};
use crate::name::SegmentName;
use crate::record::NewRecord;
use crate::rotation::{AppendOutcome, RotationController};
use crate::segment::{SegmentReport, SegmentStore};
use crate::types::Severity;
use iwelog_storage::{DirVolume, MemoryVolume, StorageError, Volume};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// State of one severity's segment chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityStatus {
    /// The severity.
    pub severity: Severity,
    /// Its active segment.
    pub active: SegmentName,
    /// Rows in the active segment.
    pub rows: u64,
    /// Rotation threshold.
    pub capacity: u64,
}

/// Snapshot of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    /// Whether the directory record exists.
    pub initialized: bool,
    /// Per-severity state, empty until initialized.
    pub severities: Vec<SeverityStatus>,
    /// Every segment with its row count, sorted by prefix then index.
    pub segments: Vec<(SegmentName, u64)>,
    /// The fatal error that stopped writes, if any.
    pub poisoned: Option<String>,
}

/// A rotating, severity-partitioned log store.
///
/// `LogStore` is `Send + Sync`; share it with `Arc` between request
/// handlers. Call [`LogStore::initialize`] once after opening.
///
/// # Example
///
/// ```rust
/// use iwelog_core::{Config, LogStore, NewRecord, Severity};
///
/// let store = LogStore::open_in_memory(Config::default())?;
/// store.initialize()?;
///
/// let outcome = store.append(
///     Severity::Warning,
///     &NewRecord::new("netlog", "cmd/main.go:65", "Not equal"),
/// )?;
/// assert_eq!(outcome.segment.to_string(), "logW_1");
/// assert_eq!(outcome.sequence.as_u64(), 1);
/// # Ok::<(), iwelog_core::StoreError>(())
/// ```
pub struct LogStore {
    config: Config,
    volume: Arc<dyn Volume>,
    directory: Arc<Directory>,
    segments: Arc<SegmentStore>,
    rotation: RotationController,
    poisoned: RwLock<Option<String>>,
}

impl LogStore {
    /// Opens a store in a directory on the local file system.
    ///
    /// The directory is locked for as long as the store is open.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidConfig`] if a capacity is zero
    /// - [`StoreError::StoreLocked`] if another process has the store open
    /// - [`StoreError::InvalidFormat`] or [`StoreError::NameFormat`] if the
    ///   directory record is damaged
    pub fn open(path: &Path, config: Config) -> StoreResult<Self> {
        config.validate()?;
        let volume = DirVolume::open(path, config.create_if_missing).map_err(|e| match e {
            StorageError::Locked => StoreError::StoreLocked,
            other => StoreError::Storage(other),
        })?;
        info!(path = %path.display(), "opened store");
        Self::open_with_volume(Arc::new(volume), config)
    }

    /// Opens an empty store that lives in memory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if a capacity is zero.
    pub fn open_in_memory(config: Config) -> StoreResult<Self> {
        Self::open_with_volume(Arc::new(MemoryVolume::new()), config)
    }

    /// Opens a store over an existing volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the directory
    /// record cannot be loaded.
    pub fn open_with_volume(volume: Arc<dyn Volume>, config: Config) -> StoreResult<Self> {
        config.validate()?;

        let directory = Arc::new(Directory::load(Arc::clone(&volume))?);
        let segments = Arc::new(SegmentStore::new(
            Arc::clone(&volume),
            config.sync_on_append,
        ));
        let rotation = RotationController::new(
            Arc::clone(&directory),
            Arc::clone(&segments),
            config.capacities,
        );

        Ok(Self {
            config,
            volume,
            directory,
            segments,
            rotation,
            poisoned: RwLock::new(None),
        })
    }

    /// Creates the directory record and the first segment of every severity
    /// if they are missing. Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialization`] if not all three active
    /// segments could be made available.
    pub fn initialize(&self) -> StoreResult<()> {
        self.directory.ensure_initialized(&self.segments)?;
        info!("store initialized");
        Ok(())
    }

    /// Appends a record to the active segment of `severity`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Poisoned`] after an earlier fatal error
    /// - [`StoreError::Validation`] if a field is empty; nothing is written
    /// - [`StoreError::NotFound`] if the store has not been initialized
    /// - any append or rotation error; a rotation error means the record was
    ///   stored but the segment did not rotate
    pub fn append(&self, severity: Severity, record: &NewRecord) -> StoreResult<AppendOutcome> {
        if let Some(reason) = self.poisoned.read().as_ref() {
            return Err(StoreError::Poisoned {
                reason: reason.clone(),
            });
        }

        self.rotation.append(severity, record).inspect_err(|e| {
            if e.is_fatal() {
                self.poison(e);
            }
        })
    }

    /// Parses a severity tag and appends the record.
    ///
    /// This is the ingestion entry point: `tag` is `I`, `W` or `E` (or a
    /// severity name).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedSeverity`] for any other tag, without
    /// writing; otherwise as [`LogStore::append`].
    pub fn submit(
        &self,
        tag: &str,
        project: &str,
        location: &str,
        body: &str,
    ) -> StoreResult<AppendOutcome> {
        let severity: Severity = tag.parse()?;
        self.append(severity, &NewRecord::new(project, location, body))
    }

    /// Returns the active segment of `severity`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the store has not been initialized.
    pub fn active_segment(&self, severity: Severity) -> StoreResult<SegmentName> {
        self.directory.active_segment(severity)
    }

    /// Returns the number of rows in a segment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the segment does not exist.
    pub fn row_count(&self, segment: &SegmentName) -> StoreResult<u64> {
        self.segments.row_count(segment)
    }

    /// Returns a snapshot of the directory and every segment.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment cannot be opened.
    pub fn status(&self) -> StoreResult<StoreStatus> {
        let record = self.directory.snapshot();

        let mut severities = Vec::new();
        if let Some(record) = &record {
            for (severity, active) in record.entries() {
                severities.push(SeverityStatus {
                    severity,
                    active: active.clone(),
                    rows: self.segments.row_count(active)?,
                    capacity: self.config.capacities.get(severity),
                });
            }
        }

        let segments = self
            .segments
            .segment_names()?
            .into_iter()
            .map(|name| {
                let rows = self.segments.row_count(&name)?;
                Ok((name, rows))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(StoreStatus {
            initialized: record.is_some(),
            severities,
            segments,
            poisoned: self.poisoned.read().clone(),
        })
    }

    /// Re-reads every segment, checking checksums and sequence order.
    ///
    /// # Errors
    ///
    /// Returns the first corruption found.
    pub fn verify(&self) -> StoreResult<Vec<SegmentReport>> {
        self.segments
            .segment_names()?
            .iter()
            .map(|name| self.segments.verify(name))
            .collect()
    }

    /// Returns whether a fatal error has stopped writes.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.read().is_some()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Syncs every open segment and releases the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment cannot be synced.
    pub fn close(self) -> StoreResult<()> {
        self.segments.sync_all()?;
        info!("store closed");
        Ok(())
    }

    fn poison(&self, cause: &StoreError) {
        let mut poisoned = self.poisoned.write();
        if poisoned.is_none() {
            error!(error = %cause, "directory can no longer be trusted, refusing writes");
            *poisoned = Some(cause.to_string());
        }
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("config", &self.config)
            .field("volume", &self.volume)
            .field("directory", &self.directory)
            .field("poisoned", &*self.poisoned.read())
            .finish_non_exhaustive()
    }
}
