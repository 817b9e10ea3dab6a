//! File-based storage backend for persistent segments.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A segment stored in a single OS file.
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_data()` so appended rows survive a power loss
///
/// The file is opened, never created: creating segment files is the job of
/// [`crate::DirVolume::create_backend`], which must be able to tell "created"
/// apart from "already there".
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens an existing segment file for reading and appending.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist, or an
    /// I/O error if it cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let file = self.file.write();
        file.sync_data()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {} which is greater than current size {}",
                    new_size, *size
                ),
            )));
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn empty_segment(dir: &Path) -> PathBuf {
        let path = dir.join("logW_1.seg");
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let result = FileBackend::open(&dir.path().join("logI_9.seg"));
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn appends_are_contiguous() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&empty_segment(dir.path())).unwrap();

        assert_eq!(backend.append(b"row-one").unwrap(), 0);
        assert_eq!(backend.append(b"row-two").unwrap(), 7);
        assert_eq!(backend.size().unwrap(), 14);
        assert_eq!(backend.read_at(7, 7).unwrap(), b"row-two");
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&empty_segment(dir.path())).unwrap();
        backend.append(b"abc").unwrap();

        let result = backend.read_at(2, 5);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = empty_segment(dir.path());

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"durable row").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(0, 11).unwrap(), b"durable row");
    }

    #[test]
    fn truncate_discards_tail_and_next_append_reuses_offset() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&empty_segment(dir.path())).unwrap();
        backend.append(b"keep").unwrap();
        backend.append(b"torn").unwrap();

        backend.truncate(4).unwrap();
        assert_eq!(backend.size().unwrap(), 4);

        assert_eq!(backend.append(b"next").unwrap(), 4);
        assert_eq!(backend.read_at(0, 8).unwrap(), b"keepnext");
    }

    #[test]
    fn truncate_cannot_grow() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&empty_segment(dir.path())).unwrap();
        backend.append(b"x").unwrap();
        assert!(backend.truncate(10).is_err());
    }

    #[test]
    fn path_is_reported() {
        let dir = tempdir().unwrap();
        let path = empty_segment(dir.path());
        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.path(), path);
    }
}
