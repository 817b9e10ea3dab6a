//! Directory-backed volume.
//!
//! Layout on disk:
//!
//! ```text
//! <volume_path>/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ <blob>            # Atomically replaced metadata blobs (e.g. DIRECTORY)
//! └─ segments/
//!    ├─ logI_1.seg     # One file per backend
//!    └─ ...
//! ```
//!
//! The LOCK file ensures only one process writes to the volume at a time.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::file::FileBackend;
use crate::volume::{validate_name, Volume};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const SEGMENTS_DIR: &str = "segments";
const SEGMENT_EXT: &str = "seg";
const TEMP_SUFFIX: &str = ".tmp";

/// A [`Volume`] stored in a directory on the local file system.
///
/// # Thread Safety
///
/// A `DirVolume` holds an exclusive advisory lock on its directory for its
/// whole lifetime. Within the process it may be shared freely.
#[derive(Debug)]
pub struct DirVolume {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl DirVolume {
    /// Opens or creates a volume directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path is not a directory
    /// - Another process holds the lock ([`StorageError::Locked`])
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StorageError::InvalidVolume(format!(
                    "volume directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StorageError::InvalidVolume(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        fs::create_dir_all(path.join(SEGMENTS_DIR))?;
        debug!(path = %path.display(), "opened volume");

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the root directory of the volume.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory holding segment files.
    #[must_use]
    pub fn segments_dir(&self) -> PathBuf {
        self.path.join(SEGMENTS_DIR)
    }

    /// Returns the file path used for the backend `name`.
    #[must_use]
    pub fn backend_path(&self, name: &str) -> PathBuf {
        self.segments_dir().join(format!("{name}.{SEGMENT_EXT}"))
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Syncs a directory so that entry creations and renames are durable.
    ///
    /// NTFS journals metadata itself, so this is a no-op off Unix.
    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> StorageResult<()> {
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> StorageResult<()> {
        Ok(())
    }
}

impl Volume for DirVolume {
    fn create_backend(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        let path = self.backend_path(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                file.sync_all()?;
                Self::sync_dir(&self.segments_dir())?;
                debug!(segment = name, "created segment file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn open_backend(&self, name: &str) -> StorageResult<Box<dyn StorageBackend>> {
        validate_name(name)?;
        let backend = FileBackend::open(&self.backend_path(name))
            .map_err(|e| if e.is_not_found() { StorageError::not_found(name) } else { e })?;
        Ok(Box::new(backend))
    }

    fn contains_backend(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        Ok(self.backend_path(name).is_file())
    }

    fn backend_names(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.segments_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_blob(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_name(name)?;
        match fs::read(self.blob_path(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Uses write-then-rename for crash safety:
    /// 1. Write to `<name>.tmp`
    /// 2. Sync the temporary file
    /// 3. Rename over `<name>`
    /// 4. Sync the volume directory so the rename is durable
    fn write_blob(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        let target = self.blob_path(name);
        let temp = self.path.join(format!("{name}{TEMP_SUFFIX}"));

        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &target)?;
        Self::sync_dir(&self.path)?;

        Ok(())
    }
}
