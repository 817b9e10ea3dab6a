//! The set of segments in a volume.

use super::table::{SegmentReport, SegmentTable};
use crate::error::{StoreError, StoreResult};
use crate::name::SegmentName;
use crate::record::NewRecord;
use crate::types::SequenceNumber;
use iwelog_storage::{StorageBackend, Volume};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates, opens and appends to segments.
///
/// Segments that receive appends are cached so every segment has exactly one
/// writer. A segment leaves the cache when it is released after rotation;
/// reads of segments outside the cache open them only for the duration of
/// the read.
pub struct SegmentStore {
    volume: Arc<dyn Volume>,
    sync_on_append: bool,
    tables: RwLock<HashMap<SegmentName, Arc<SegmentTable>>>,
}

impl SegmentStore {
    /// Creates a segment store over `volume`.
    pub fn new(volume: Arc<dyn Volume>, sync_on_append: bool) -> Self {
        Self {
            volume,
            sync_on_append,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Creates the segment if it does not exist yet.
    ///
    /// Returns `true` if the segment was created. An existing segment is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] if the segment cannot be created.
    pub fn ensure_segment_exists(&self, name: &SegmentName) -> StoreResult<bool> {
        let label = name.to_string();
        let created = self
            .volume
            .create_backend(&label)
            .map_err(|source| StoreError::Schema {
                segment: label,
                source,
            })?;
        if created {
            info!(segment = %name, "created segment");
        }
        Ok(created)
    }

    /// Returns whether the segment exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be queried.
    pub fn contains(&self, name: &SegmentName) -> StoreResult<bool> {
        if self.tables.read().contains_key(name) {
            return Ok(true);
        }
        Ok(self.volume.contains_backend(&name.to_string())?)
    }

    /// Validates `record` and appends it to the segment.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if a field is empty; nothing is written
    /// - [`StoreError::NotFound`] if the segment does not exist
    /// - [`StoreError::Write`] or [`StoreError::Identity`] from the append
    pub fn append(&self, name: &SegmentName, record: &NewRecord) -> StoreResult<SequenceNumber> {
        record.validate()?;
        self.table(name)?.append(record)
    }

    /// Returns the number of rows in the segment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the segment does not exist.
    pub fn row_count(&self, name: &SegmentName) -> StoreResult<u64> {
        if let Some(table) = self.cached(name) {
            return Ok(table.row_count());
        }
        Ok(self.inspect(name)?.rows)
    }

    /// Re-reads the segment and reports its contents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the segment does not exist, or a
    /// corruption error if a row is damaged.
    pub fn verify(&self, name: &SegmentName) -> StoreResult<SegmentReport> {
        match self.cached(name) {
            Some(table) => table.verify(),
            None => self.inspect(name),
        }
    }

    /// Syncs the segment and drops it from the cache, closing its backend.
    ///
    /// Returns `false` if the segment was not open. A later append reopens it.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be synced. It is released
    /// regardless.
    pub fn release(&self, name: &SegmentName) -> StoreResult<bool> {
        let Some(table) = self.tables.write().remove(name) else {
            return Ok(false);
        };
        table.sync()?;
        debug!(segment = %name, "released segment");
        Ok(true)
    }

    /// Returns the number of segments currently open for appends.
    #[must_use]
    pub fn open_segments(&self) -> usize {
        self.tables.read().len()
    }

    /// Lists every segment in the volume, sorted by prefix then index.
    ///
    /// Backends whose names are not segment names are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be listed.
    pub fn segment_names(&self) -> StoreResult<Vec<SegmentName>> {
        let mut names: Vec<SegmentName> = self
            .volume
            .backend_names()?
            .into_iter()
            .filter_map(|raw| match SegmentName::parse(&raw) {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!(backend = %raw, error = %e, "ignoring backend with foreign name");
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Syncs every open segment.
    ///
    /// # Errors
    ///
    /// Returns the first sync failure.
    pub fn sync_all(&self) -> StoreResult<()> {
        let tables: Vec<_> = self.tables.read().values().cloned().collect();
        for table in tables {
            table.sync()?;
        }
        Ok(())
    }

    fn cached(&self, name: &SegmentName) -> Option<Arc<SegmentTable>> {
        self.tables.read().get(name).cloned()
    }

    fn open_backend(&self, name: &SegmentName) -> StoreResult<Box<dyn StorageBackend>> {
        self.volume.open_backend(&name.to_string()).map_err(|e| {
            if e.is_not_found() {
                StoreError::not_found(format!("segment {name}"))
            } else {
                StoreError::Storage(e)
            }
        })
    }

    fn inspect(&self, name: &SegmentName) -> StoreResult<SegmentReport> {
        let backend = self.open_backend(name)?;
        SegmentTable::inspect(name, backend.as_ref())
    }

    fn table(&self, name: &SegmentName) -> StoreResult<Arc<SegmentTable>> {
        if let Some(table) = self.cached(name) {
            return Ok(table);
        }

        let mut tables = self.tables.write();
        if let Some(table) = tables.get(name) {
            return Ok(Arc::clone(table));
        }

        let backend = self.open_backend(name)?;
        let table = Arc::new(SegmentTable::open(
            name.clone(),
            backend,
            self.sync_on_append,
        )?);
        tables.insert(name.clone(), Arc::clone(&table));
        Ok(table)
    }
}

impl std::fmt::Debug for SegmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentStore")
            .field("volume", &self.volume)
            .field("open_segments", &self.tables.read().len())
            .finish()
    }
}
