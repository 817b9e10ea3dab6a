//! Ingested records and their on-disk row format.
//!
//! ## Row Format
//!
//! ```text
//! | row_len (4) | sequence (8) | inserted_at_ms (8) |
//! | project_len (2) | project | location_len (2) | location |
//! | body_len (4) | body | crc32 (4) |
//! ```
//!
//! All integers are little endian. `row_len` counts the whole row including
//! itself and the checksum; the CRC covers every byte before it.

use crate::error::{StoreError, StoreResult};
use crate::types::SequenceNumber;
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest accepted `project` or `location`, in bytes.
pub const MAX_SHORT_FIELD_LEN: usize = u16::MAX as usize;

/// Longest accepted `body`, in bytes.
pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// A record submitted for appending.
///
/// Sequence and insertion time are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Project that emitted the event.
    pub project: String,
    /// Call site or component, e.g. `cmd/main.go:65`.
    pub location: String,
    /// Message text.
    pub body: String,
}

impl NewRecord {
    /// Creates a new record.
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            body: body.into(),
        }
    }

    /// Checks that every field is non-empty and fits the row format.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] naming the first bad field.
    pub fn validate(&self) -> StoreResult<()> {
        check_field("project", &self.project, MAX_SHORT_FIELD_LEN)?;
        check_field("location", &self.location, MAX_SHORT_FIELD_LEN)?;
        check_field("body", &self.body, MAX_BODY_LEN)
    }
}

fn check_field(field: &'static str, value: &str, max_len: usize) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    if value.len() > max_len {
        return Err(StoreError::validation(
            field,
            format!("is {} bytes, limit is {max_len}", value.len()),
        ));
    }
    Ok(())
}

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// A row as stored in a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRow {
    /// Sequence assigned within the segment.
    pub sequence: SequenceNumber,
    /// Insertion time, milliseconds since the Unix epoch.
    pub inserted_at_ms: u64,
    /// Project that emitted the event.
    pub project: String,
    /// Call site or component.
    pub location: String,
    /// Message text.
    pub body: String,
}

impl SegmentRow {
    /// Size of the `row_len` prefix.
    pub const LEN_PREFIX_SIZE: usize = 4;
    /// Fixed bytes per row: len (4) + seq (8) + ts (8) + 2 + 2 + 4 + crc (4).
    pub const FIXED_SIZE: usize = 4 + 8 + 8 + 2 + 2 + 4 + 4;
    const CRC_SIZE: usize = 4;

    /// Builds the row for an already validated record.
    #[must_use]
    pub fn from_record(record: &NewRecord, sequence: SequenceNumber, inserted_at_ms: u64) -> Self {
        Self {
            sequence,
            inserted_at_ms,
            project: record.project.clone(),
            location: record.location.clone(),
            body: record.body.clone(),
        }
    }

    /// Returns the encoded size of this row.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        Self::FIXED_SIZE + self.project.len() + self.location.len() + self.body.len()
    }

    /// Encodes the row. Field lengths must already be validated.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let row_len = self.encoded_size();
        let mut buf = Vec::with_capacity(row_len);

        buf.extend_from_slice(&(row_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.sequence.as_u64().to_le_bytes());
        buf.extend_from_slice(&self.inserted_at_ms.to_le_bytes());

        buf.extend_from_slice(&(self.project.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.project.as_bytes());
        buf.extend_from_slice(&(self.location.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.location.as_bytes());
        buf.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.body.as_bytes());

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        buf
    }

    /// Reads the `row_len` prefix of an encoded row.
    #[must_use]
    pub fn peek_len(prefix: [u8; 4]) -> usize {
        u32::from_le_bytes(prefix) as usize
    }

    /// Decodes one complete row.
    ///
    /// `segment` and `offset` are only used to describe failures.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChecksumMismatch`] if the CRC does not match and
    /// [`StoreError::SegmentCorruption`] if the framing is inconsistent.
    pub fn decode(data: &[u8], segment: &str, offset: u64) -> StoreResult<Self> {
        let corrupt = |message: &str| StoreError::segment_corruption(segment, offset, message);

        if data.len() < Self::FIXED_SIZE {
            return Err(corrupt("row shorter than fixed header"));
        }
        let row_len = Self::peek_len([data[0], data[1], data[2], data[3]]);
        if row_len != data.len() {
            return Err(corrupt("row length does not match frame"));
        }

        let body_end = row_len - Self::CRC_SIZE;
        let stored = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let computed = crc32fast::hash(&data[..body_end]);
        if stored != computed {
            return Err(StoreError::ChecksumMismatch {
                segment: segment.to_string(),
                offset,
                expected: stored,
                actual: computed,
            });
        }

        let mut cursor = Cursor {
            data: &data[..body_end],
            pos: Self::LEN_PREFIX_SIZE,
        };
        let sequence = cursor
            .u64()
            .map(SequenceNumber::new)
            .ok_or_else(|| corrupt("truncated sequence"))?;
        let inserted_at_ms = cursor.u64().ok_or_else(|| corrupt("truncated timestamp"))?;

        let project_len = cursor.u16().ok_or_else(|| corrupt("truncated project length"))?;
        let project = cursor
            .string(usize::from(project_len))
            .ok_or_else(|| corrupt("invalid project"))?;
        let location_len = cursor.u16().ok_or_else(|| corrupt("truncated location length"))?;
        let location = cursor
            .string(usize::from(location_len))
            .ok_or_else(|| corrupt("invalid location"))?;
        let body_len = cursor.u32().ok_or_else(|| corrupt("truncated body length"))?;
        let body = cursor
            .string(body_len as usize)
            .ok_or_else(|| corrupt("invalid body"))?;

        if cursor.pos != body_end {
            return Err(corrupt("trailing bytes after body"));
        }

        Ok(Self {
            sequence,
            inserted_at_ms,
            project,
            location,
            body,
        })
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Option<u64> {
        self.take(8).map(|b| {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
    }

    fn string(&mut self, len: usize) -> Option<String> {
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).ok().map(str::to_string)
    }
}
