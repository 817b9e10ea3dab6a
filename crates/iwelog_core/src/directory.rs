//! The segment directory.
//!
//! A single record naming the active segment of every severity. It is
//! persisted as the `DIRECTORY` blob of the volume:
//!
//! ```text
//! | magic "IWDR" | version u16 | (name_len u16 | name) x 3 | crc32 u32 |
//! ```
//!
//! Names are stored in [`Severity::ALL`] order.

use crate::error::{StoreError, StoreResult};
use crate::name::SegmentName;
use crate::segment::SegmentStore;
use crate::types::Severity;
use iwelog_storage::Volume;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the blob holding the directory record.
pub const DIRECTORY_BLOB: &str = "DIRECTORY";

/// Magic bytes of the directory blob.
pub const DIRECTORY_MAGIC: [u8; 4] = *b"IWDR";

/// Current directory blob version.
pub const DIRECTORY_VERSION: u16 = 1;

/// The active segment of every severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    active: [SegmentName; 3],
}

impl DirectoryRecord {
    /// Creates a record from names given in [`Severity::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NameFormat`] if a name's prefix does not belong
    /// to the severity at its position.
    pub fn new(active: [SegmentName; 3]) -> StoreResult<Self> {
        for (severity, name) in Severity::ALL.into_iter().zip(&active) {
            check_prefix(severity, name)?;
        }
        Ok(Self { active })
    }

    /// The record of a fresh store: every severity at index 1.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            active: Severity::ALL.map(SegmentName::first),
        }
    }

    /// Returns the active segment of `severity`.
    #[must_use]
    pub fn active(&self, severity: Severity) -> &SegmentName {
        &self.active[severity.index()]
    }

    /// Returns `(severity, active segment)` pairs in directory order.
    pub fn entries(&self) -> impl Iterator<Item = (Severity, &SegmentName)> {
        Severity::ALL.into_iter().zip(self.active.iter())
    }

    fn replace(&mut self, severity: Severity, name: SegmentName) {
        self.active[severity.index()] = name;
    }

    /// Encodes the record.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&DIRECTORY_MAGIC);
        buf.extend_from_slice(&DIRECTORY_VERSION.to_le_bytes());

        for name in &self.active {
            let name = name.to_string();
            let len = u16::try_from(name.len()).unwrap_or(u16::MAX);
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(&name.as_bytes()[..usize::from(len)]);
        }

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decodes a record.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidFormat`] if the framing, version or checksum is
    ///   wrong
    /// - [`StoreError::NameFormat`] if a stored name is not
    ///   `<prefix>_<index>` or belongs to the wrong severity
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        if data.len() < DIRECTORY_MAGIC.len() + 2 + 4 || data[..4] != DIRECTORY_MAGIC {
            return Err(StoreError::invalid_format("invalid directory magic"));
        }

        let body_end = data.len() - 4;
        let stored = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        if crc32fast::hash(&data[..body_end]) != stored {
            return Err(StoreError::invalid_format("directory checksum mismatch"));
        }

        let body = &data[..body_end];
        let version = u16::from_le_bytes([body[4], body[5]]);
        if version > DIRECTORY_VERSION {
            return Err(StoreError::invalid_format(format!(
                "unsupported directory version: {version}"
            )));
        }

        let mut cursor = 6;
        let mut names = Vec::with_capacity(3);
        for _ in Severity::ALL {
            if cursor + 2 > body.len() {
                return Err(StoreError::invalid_format("directory too short"));
            }
            let len = usize::from(u16::from_le_bytes([body[cursor], body[cursor + 1]]));
            cursor += 2;

            let raw = body
                .get(cursor..cursor + len)
                .ok_or_else(|| StoreError::invalid_format("directory too short"))?;
            let raw = std::str::from_utf8(raw)
                .map_err(|_| StoreError::invalid_format("directory name is not UTF-8"))?;
            names.push(SegmentName::parse(raw)?);
            cursor += len;
        }
        if cursor != body.len() {
            return Err(StoreError::invalid_format("trailing bytes in directory"));
        }

        let active: [SegmentName; 3] = names
            .try_into()
            .map_err(|_| StoreError::invalid_format("directory must name three segments"))?;
        Self::new(active)
    }
}

fn check_prefix(severity: Severity, name: &SegmentName) -> StoreResult<()> {
    if name.prefix() == severity.segment_prefix() {
        Ok(())
    } else {
        Err(StoreError::name_format(
            name.to_string(),
            format!(
                "{severity} segments must use prefix {}",
                severity.segment_prefix()
            ),
        ))
    }
}

/// Access to the persisted directory record.
///
/// The record is cached after the first load; the cache only changes after
/// the blob has been written successfully.
pub struct Directory {
    volume: Arc<dyn Volume>,
    record: RwLock<Option<DirectoryRecord>>,
}

impl Directory {
    /// Loads the directory from `volume`, if one has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be read or decoded.
    pub fn load(volume: Arc<dyn Volume>) -> StoreResult<Self> {
        let record = volume
            .read_blob(DIRECTORY_BLOB)?
            .map(|data| DirectoryRecord::decode(&data))
            .transpose()?;
        if let Some(record) = &record {
            debug!(?record, "loaded directory");
        }
        Ok(Self {
            volume,
            record: RwLock::new(record),
        })
    }

    /// Returns whether a directory record exists.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.record.read().is_some()
    }

    /// Creates the record if missing and makes sure every segment it names
    /// exists.
    ///
    /// Safe to call repeatedly: an existing record is never rewritten, and
    /// segments that went missing are recreated empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialization`] if the record cannot be written
    /// or fewer than three segments are available afterwards.
    pub fn ensure_initialized(&self, segments: &SegmentStore) -> StoreResult<()> {
        let mut guard = self.record.write();

        let existed = guard.is_some();
        let record = match guard.as_ref() {
            Some(record) => record.clone(),
            None => {
                let record = DirectoryRecord::initial();
                self.volume
                    .write_blob(DIRECTORY_BLOB, &record.encode())
                    .map_err(|e| {
                        StoreError::initialization(
                            "cannot write directory record",
                            StoreError::Write {
                                target: DIRECTORY_BLOB.to_string(),
                                source: e,
                            },
                        )
                    })?;
                info!("created directory record");
                *guard = Some(record.clone());
                record
            }
        };

        let mut available = 0;
        let mut first_error = None;
        for (severity, name) in record.entries() {
            match segments.contains(name) {
                Ok(true) => {
                    available += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                    continue;
                }
            }
            match segments.ensure_segment_exists(name) {
                Ok(created) => {
                    if created && existed {
                        warn!(%severity, segment = %name, "recreated missing active segment");
                    }
                    available += 1;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(StoreError::initialization(
                format!("{available}/3 segments available"),
                e,
            )),
        }
    }

    /// Returns the active segment of `severity`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the directory has not been
    /// initialized.
    pub fn active_segment(&self, severity: Severity) -> StoreResult<SegmentName> {
        self.record
            .read()
            .as_ref()
            .map(|record| record.active(severity).clone())
            .ok_or_else(|| StoreError::not_found("directory record"))
    }

    /// Replaces the active segment of `severity`, provided it is still
    /// `expected`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Consistency`] if the directory does not exist, the
    ///   stored value is not `expected`, the persisted record no longer
    ///   matches the one this directory loaded, or `new` belongs to another
    ///   severity
    /// - [`StoreError::Write`] if the blob cannot be written; the previous
    ///   record stays in effect
    pub fn set_active_segment(
        &self,
        severity: Severity,
        expected: &SegmentName,
        new: &SegmentName,
    ) -> StoreResult<()> {
        let mut guard = self.record.write();
        let Some(current) = guard.as_ref() else {
            return Err(StoreError::consistency(format!(
                "no directory record to update for {severity}"
            )));
        };

        if current.active(severity) != expected {
            return Err(StoreError::consistency(format!(
                "{severity} segment is {}, expected {expected}",
                current.active(severity)
            )));
        }
        if check_prefix(severity, new).is_err() {
            return Err(StoreError::consistency(format!(
                "{new} cannot become the active {severity} segment"
            )));
        }

        let persisted = self
            .volume
            .read_blob(DIRECTORY_BLOB)?
            .map(|data| DirectoryRecord::decode(&data))
            .transpose()?;
        if persisted.as_ref() != Some(current) {
            return Err(StoreError::consistency(format!(
                "directory record changed on disk, refusing to move {severity} to {new}"
            )));
        }

        let mut updated = current.clone();
        updated.replace(severity, new.clone());
        self.volume
            .write_blob(DIRECTORY_BLOB, &updated.encode())
            .map_err(|source| StoreError::Write {
                target: DIRECTORY_BLOB.to_string(),
                source,
            })?;

        *guard = Some(updated);
        Ok(())
    }

    /// Returns a copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> Option<DirectoryRecord> {
        self.record.read().clone()
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("record", &*self.record.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iwelog_storage::MemoryVolume;

    fn setup() -> (Arc<MemoryVolume>, Directory, SegmentStore) {
        let volume = Arc::new(MemoryVolume::new());
        let directory = Directory::load(volume.clone()).unwrap();
        let segments = SegmentStore::new(volume.clone(), false);
        (volume, directory, segments)
    }

    fn name(raw: &str) -> SegmentName {
        SegmentName::parse(raw).unwrap()
    }

    #[test]
    fn initial_record_names_first_segments() {
        let record = DirectoryRecord::initial();
        assert_eq!(record.active(Severity::Info), &name("logI_1"));
        assert_eq!(record.active(Severity::Warning), &name("logW_1"));
        assert_eq!(record.active(Severity::Error), &name("logE_1"));
    }

    #[test]
    fn record_survives_encoding() {
        let record =
            DirectoryRecord::new([name("logI_4"), name("logW_1"), name("logE_12")]).unwrap();
        assert_eq!(DirectoryRecord::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn damaged_blob_is_invalid_format() {
        let mut data = DirectoryRecord::initial().encode();
        data[7] ^= 0x01;
        assert!(matches!(
            DirectoryRecord::decode(&data),
            Err(StoreError::InvalidFormat { .. })
        ));
        assert!(matches!(
            DirectoryRecord::decode(b"nope"),
            Err(StoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn misplaced_prefix_is_name_format() {
        assert!(matches!(
            DirectoryRecord::new([name("logW_1"), name("logW_1"), name("logE_1")]),
            Err(StoreError::NameFormat { .. })
        ));
    }

    #[test]
    fn uninitialized_directory_has_no_active_segment() {
        let (_, directory, _) = setup();
        assert!(!directory.is_initialized());
        assert!(matches!(
            directory.active_segment(Severity::Info),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn ensure_initialized_creates_record_and_segments() {
        let (volume, directory, segments) = setup();
        directory.ensure_initialized(&segments).unwrap();

        assert_eq!(directory.active_segment(Severity::Error).unwrap(), name("logE_1"));
        assert_eq!(
            volume.backend_names().unwrap(),
            ["logE_1", "logI_1", "logW_1"]
        );

        let reloaded = Directory::load(volume).unwrap();
        assert_eq!(reloaded.snapshot(), directory.snapshot());
    }

    #[test]
    fn ensure_initialized_keeps_existing_record() {
        let (volume, directory, segments) = setup();
        directory.ensure_initialized(&segments).unwrap();
        segments.ensure_segment_exists(&name("logI_2")).unwrap();
        directory
            .set_active_segment(Severity::Info, &name("logI_1"), &name("logI_2"))
            .unwrap();

        let reloaded = Directory::load(volume).unwrap();
        reloaded.ensure_initialized(&segments).unwrap();
        assert_eq!(reloaded.active_segment(Severity::Info).unwrap(), name("logI_2"));
    }

    #[test]
    fn ensure_initialized_heals_missing_segment() {
        let volume = Arc::new(MemoryVolume::new());
        let record =
            DirectoryRecord::new([name("logI_1"), name("logW_5"), name("logE_1")]).unwrap();
        volume.write_blob(DIRECTORY_BLOB, &record.encode()).unwrap();

        let directory = Directory::load(volume.clone()).unwrap();
        let segments = SegmentStore::new(volume.clone(), false);
        directory.ensure_initialized(&segments).unwrap();

        assert!(volume.contains_backend("logW_5").unwrap());
    }

    #[test]
    fn compare_and_set() {
        let (_, directory, segments) = setup();
        directory.ensure_initialized(&segments).unwrap();

        directory
            .set_active_segment(Severity::Warning, &name("logW_1"), &name("logW_2"))
            .unwrap();
        assert_eq!(directory.active_segment(Severity::Warning).unwrap(), name("logW_2"));
        assert_eq!(directory.active_segment(Severity::Info).unwrap(), name("logI_1"));

        // A second controller acting on the stale value affects nothing.
        let stale = directory.set_active_segment(Severity::Warning, &name("logW_1"), &name("logW_2"));
        assert!(matches!(stale, Err(StoreError::Consistency { .. })));
        assert_eq!(directory.active_segment(Severity::Warning).unwrap(), name("logW_2"));
    }

    #[test]
    fn record_changed_on_disk_is_consistency_error() {
        let (volume, directory, segments) = setup();
        directory.ensure_initialized(&segments).unwrap();

        let elsewhere =
            DirectoryRecord::new([name("logI_3"), name("logW_1"), name("logE_1")]).unwrap();
        volume.write_blob(DIRECTORY_BLOB, &elsewhere.encode()).unwrap();

        assert!(matches!(
            directory.set_active_segment(Severity::Warning, &name("logW_1"), &name("logW_2")),
            Err(StoreError::Consistency { .. })
        ));
        let persisted = volume.read_blob(DIRECTORY_BLOB).unwrap().unwrap();
        assert_eq!(DirectoryRecord::decode(&persisted).unwrap(), elsewhere);
    }

    #[test]
    fn update_without_record_is_consistency_error() {
        let (_, directory, _) = setup();
        assert!(matches!(
            directory.set_active_segment(Severity::Info, &name("logI_1"), &name("logI_2")),
            Err(StoreError::Consistency { .. })
        ));
    }

    #[test]
    fn cross_severity_update_is_rejected() {
        let (_, directory, segments) = setup();
        directory.ensure_initialized(&segments).unwrap();
        assert!(matches!(
            directory.set_active_segment(Severity::Info, &name("logI_1"), &name("logE_2")),
            Err(StoreError::Consistency { .. })
        ));
    }
}
