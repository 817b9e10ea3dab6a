//! In-memory storage for tests and ephemeral stores.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::volume::{validate_name, Volume};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// An in-memory storage backend.
///
/// Clones share the same bytes, which is how [`MemoryVolume`] hands out
/// several handles to one segment.
///
/// # Example
///
/// ```rust
/// use iwelog_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let offset = backend.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(backend.size().unwrap(), 9);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend with pre-existing data.
    ///
    /// Useful for recovery tests that start from a hand-built segment.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        let start = offset as usize;
        Ok(data[start..start + len].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let current_size = data.len() as u64;

        if new_size > current_size {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {} which is greater than current size {}",
                    new_size, current_size
                ),
            )));
        }

        data.truncate(new_size as usize);
        Ok(())
    }
}

/// A volume that keeps every backend and blob in memory.
///
/// Nothing survives the process, but the sharing semantics match
/// [`crate::DirVolume`]: opening the same backend twice yields two handles
/// onto the same bytes.
#[derive(Debug, Default)]
pub struct MemoryVolume {
    backends: RwLock<BTreeMap<String, InMemoryBackend>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryVolume {
    /// Creates an empty volume.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a backend with the given contents, replacing any existing one.
    ///
    /// Lets tests plant damaged or hand-crafted segments.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid.
    pub fn insert_backend(&self, name: &str, data: Vec<u8>) -> StorageResult<()> {
        validate_name(name)?;
        self.backends
            .write()
            .insert(name.to_string(), InMemoryBackend::with_data(data));
        Ok(())
    }
}

impl Volume for MemoryVolume {
    fn create_backend(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        let mut backends = self.backends.write();
        if backends.contains_key(name) {
            return Ok(false);
        }
        backends.insert(name.to_string(), InMemoryBackend::new());
        Ok(true)
    }

    fn open_backend(&self, name: &str) -> StorageResult<Box<dyn StorageBackend>> {
        validate_name(name)?;
        self.backends
            .read()
            .get(name)
            .map(|backend| Box::new(backend.clone()) as Box<dyn StorageBackend>)
            .ok_or_else(|| StorageError::not_found(name))
    }

    fn contains_backend(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        Ok(self.backends.read().contains_key(name))
    }

    fn backend_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.backends.read().keys().cloned().collect())
    }

    fn read_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_name(name)?;
        Ok(self.blobs.read().get(name).cloned())
    }

    fn write_blob(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        self.blobs.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }
}
