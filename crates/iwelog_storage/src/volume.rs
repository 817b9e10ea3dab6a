//! Named storage namespaces.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use std::fmt;

/// Longest accepted backend or blob name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// A namespace of named append-only backends and atomically replaced blobs.
///
/// A volume plays the role a database plays for a set of tables: segments
/// are backends created by name, and small metadata records (the segment
/// directory) are blobs.
///
/// # Invariants
///
/// - `create_backend` is idempotent: it returns `Ok(false)` when the backend
///   already exists and never truncates it
/// - `open_backend` never creates; a missing backend is
///   [`StorageError::NotFound`]
/// - `write_blob` replaces the whole blob atomically: a reader sees either
///   the previous contents or the new contents, never a mix
/// - A backend should have at most one writing handle at a time; the
///   segment layer caches one open handle per segment
pub trait Volume: Send + Sync + fmt::Debug {
    /// Creates an empty backend named `name`.
    ///
    /// Returns `true` if the backend was created, `false` if it already
    /// existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or creation fails.
    fn create_backend(&self, name: &str) -> StorageResult<bool>;

    /// Opens an existing backend.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no backend has this name.
    fn open_backend(&self, name: &str) -> StorageResult<Box<dyn StorageBackend>>;

    /// Returns whether a backend named `name` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be queried.
    fn contains_backend(&self, name: &str) -> StorageResult<bool>;

    /// Lists all backend names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be listed.
    fn backend_names(&self) -> StorageResult<Vec<String>>;

    /// Reads a blob, returning `None` if it has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read.
    fn read_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically replaces the contents of a blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the previous contents are kept.
    fn write_blob(&self, name: &str, data: &[u8]) -> StorageResult<()>;
}

/// Checks that `name` can be used as a backend or blob name.
///
/// Names map directly onto file names in [`crate::DirVolume`], so only ASCII
/// letters, digits, `_` and `-` are accepted.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] describing the first violated rule.
pub fn validate_name(name: &str) -> StorageResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > MAX_NAME_LEN {
        "name is too long"
    } else if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        "only ASCII letters, digits, '_' and '-' are allowed"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidName {
        name: name.to_string(),
        reason,
    })
}
