//! A single open segment.

use crate::error::{StoreError, StoreResult};
use crate::name::SegmentName;
use crate::record::{now_millis, NewRecord, SegmentRow};
use crate::types::SequenceNumber;
use iwelog_storage::StorageBackend;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Integrity summary of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    /// The segment inspected.
    pub segment: SegmentName,
    /// Number of complete rows.
    pub rows: u64,
    /// Bytes occupied by complete rows.
    pub bytes: u64,
    /// Sequence of the first row, if any.
    pub first_sequence: Option<SequenceNumber>,
    /// Sequence of the last row, if any.
    pub last_sequence: Option<SequenceNumber>,
    /// Bytes after the last complete row (an interrupted append).
    pub torn_tail_bytes: u64,
}

/// Result of walking every row of a backend.
#[derive(Debug, Default)]
struct Scan {
    rows: u64,
    valid_len: u64,
    first: Option<SequenceNumber>,
    last: SequenceNumber,
    torn_tail_bytes: u64,
}

impl Scan {
    fn report(&self, segment: &SegmentName) -> SegmentReport {
        SegmentReport {
            segment: segment.clone(),
            rows: self.rows,
            bytes: self.valid_len,
            first_sequence: self.first,
            last_sequence: (self.rows > 0).then_some(self.last),
            torn_tail_bytes: self.torn_tail_bytes,
        }
    }
}

/// Returns whether `data` starts with a complete, checksummed row whose
/// sequence comes after `after`.
fn complete_row_at(data: &[u8], after: SequenceNumber) -> bool {
    if data.len() < SegmentRow::FIXED_SIZE {
        return false;
    }
    let row_len = SegmentRow::peek_len([data[0], data[1], data[2], data[3]]);
    if row_len < SegmentRow::FIXED_SIZE || row_len > data.len() {
        return false;
    }
    SegmentRow::decode(&data[..row_len], "", 0).is_ok_and(|row| row.sequence > after)
}

/// Returns whether everything from `offset` to the end of `backend` is what
/// an interrupted append leaves behind: zeros, or a partial row with no
/// complete row after it.
fn is_torn_tail(
    backend: &dyn StorageBackend,
    offset: u64,
    size: u64,
    after: SequenceNumber,
) -> StoreResult<bool> {
    let rest = backend.read_at(offset, (size - offset) as usize)?;
    if rest.iter().all(|&b| b == 0) {
        return Ok(true);
    }
    Ok(!(1..rest.len()).any(|start| complete_row_at(&rest[start..], after)))
}

/// Walks the rows of `backend`, checking checksums and sequence order.
///
/// A row whose length prefix runs past the end of the segment (or is zero)
/// is reported as torn only when nothing but zeros or the remains of that
/// one row follow it. If complete rows follow, the prefix itself is damaged
/// and the segment is corrupt.
fn scan(backend: &dyn StorageBackend, segment: &str) -> StoreResult<Scan> {
    let size = backend.size()?;
    let mut scan = Scan::default();
    let mut offset = 0u64;

    while offset < size {
        let remaining = size - offset;
        if remaining < SegmentRow::LEN_PREFIX_SIZE as u64 {
            scan.torn_tail_bytes = remaining;
            break;
        }

        let prefix = backend.read_at(offset, SegmentRow::LEN_PREFIX_SIZE)?;
        let row_len = SegmentRow::peek_len([prefix[0], prefix[1], prefix[2], prefix[3]]);

        if row_len == 0 || row_len as u64 > remaining {
            if is_torn_tail(backend, offset, size, scan.last)? {
                scan.torn_tail_bytes = remaining;
                break;
            }
            return Err(StoreError::segment_corruption(
                segment,
                offset,
                format!("row length {row_len} is damaged, complete rows follow it"),
            ));
        }
        if row_len < SegmentRow::FIXED_SIZE {
            return Err(StoreError::segment_corruption(
                segment,
                offset,
                format!("row length {row_len} below minimum"),
            ));
        }

        let data = backend.read_at(offset, row_len)?;
        let row = SegmentRow::decode(&data, segment, offset)?;
        if row.sequence <= scan.last {
            return Err(StoreError::segment_corruption(
                segment,
                offset,
                format!("sequence {} does not follow {}", row.sequence, scan.last),
            ));
        }

        scan.first.get_or_insert(row.sequence);
        scan.last = row.sequence;
        scan.rows += 1;
        offset += row_len as u64;
        scan.valid_len = offset;
    }

    Ok(scan)
}

struct TableState {
    backend: Box<dyn StorageBackend>,
    last_sequence: SequenceNumber,
    rows: u64,
    size: u64,
}

impl TableState {
    /// Undoes a failed append. Failure here is logged: the original write
    /// error is what the caller needs to see.
    fn rollback(&mut self, size: u64, segment: &str) {
        if let Err(e) = self.backend.truncate(size) {
            warn!(segment, size, error = %e, "could not roll back failed append");
        }
    }
}

/// An open segment accepting appends.
///
/// Sequence assignment and the physical write happen under one lock, so
/// concurrent appends get unique, strictly increasing sequences without any
/// counter outside the segment.
pub struct SegmentTable {
    name: SegmentName,
    label: String,
    sync_on_append: bool,
    state: Mutex<TableState>,
}

impl SegmentTable {
    /// Opens a segment over `backend`, recovering its last sequence.
    ///
    /// A torn trailing row is truncated away.
    ///
    /// # Errors
    ///
    /// Returns a corruption or checksum error if a complete row is damaged.
    pub fn open(
        name: SegmentName,
        mut backend: Box<dyn StorageBackend>,
        sync_on_append: bool,
    ) -> StoreResult<Self> {
        let label = name.to_string();
        let scan = scan(backend.as_ref(), &label)?;

        if scan.torn_tail_bytes > 0 {
            warn!(
                segment = %label,
                bytes = scan.torn_tail_bytes,
                "discarding torn row at end of segment"
            );
            backend.truncate(scan.valid_len)?;
        }

        debug!(segment = %label, rows = scan.rows, last = %scan.last, "opened segment");

        Ok(Self {
            name,
            label,
            sync_on_append,
            state: Mutex::new(TableState {
                backend,
                last_sequence: scan.last,
                rows: scan.rows,
                size: scan.valid_len,
            }),
        })
    }

    /// Returns the segment name.
    #[must_use]
    pub fn name(&self) -> &SegmentName {
        &self.name
    }

    /// Appends a validated record and returns its sequence.
    ///
    /// On failure nothing is left in the segment.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Identity`] if no further sequence can be assigned
    /// - [`StoreError::Write`] if the backend rejects the write or sync
    pub fn append(&self, record: &NewRecord) -> StoreResult<SequenceNumber> {
        let mut state = self.state.lock();

        let sequence = state
            .last_sequence
            .checked_next()
            .ok_or_else(|| StoreError::identity(&self.label, "sequence space exhausted"))?;

        let encoded = SegmentRow::from_record(record, sequence, now_millis()).encode();
        let before = state.size;

        let offset = match state.backend.append(&encoded) {
            Ok(offset) => offset,
            Err(source) => {
                state.rollback(before, &self.label);
                return Err(StoreError::Write {
                    target: self.label.clone(),
                    source,
                });
            }
        };
        if offset != before {
            state.rollback(before, &self.label);
            return Err(StoreError::identity(
                &self.label,
                format!("row landed at offset {offset}, expected {before}"),
            ));
        }

        if self.sync_on_append {
            if let Err(source) = state.backend.sync() {
                state.rollback(before, &self.label);
                return Err(StoreError::Write {
                    target: self.label.clone(),
                    source,
                });
            }
        }

        state.size = before + encoded.len() as u64;
        state.last_sequence = sequence;
        state.rows += 1;

        debug!(segment = %self.label, sequence = sequence.as_u64(), "appended row");
        Ok(sequence)
    }

    /// Returns the number of rows in the segment.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.state.lock().rows
    }

    /// Returns the sequence of the newest row (`ZERO` when empty).
    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        self.state.lock().last_sequence
    }

    /// Re-reads every row and reports what it found.
    ///
    /// # Errors
    ///
    /// Returns a corruption or checksum error if a complete row is damaged.
    pub fn verify(&self) -> StoreResult<SegmentReport> {
        let state = self.state.lock();
        Ok(scan(state.backend.as_ref(), &self.label)?.report(&self.name))
    }

    /// Reads a segment that is not open for appends and reports its
    /// contents. Nothing is written, not even a torn tail truncation.
    ///
    /// # Errors
    ///
    /// Returns a corruption or checksum error if a complete row is damaged.
    pub fn inspect(name: &SegmentName, backend: &dyn StorageBackend) -> StoreResult<SegmentReport> {
        Ok(scan(backend, &name.to_string())?.report(name))
    }

    /// Flushes and syncs the segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot sync.
    pub fn sync(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.backend.flush()?;
        state.backend.sync()?;
        Ok(())
    }

    #[cfg(test)]
    fn with_last_sequence(self, last: SequenceNumber) -> Self {
        self.state.lock().last_sequence = last;
        self
    }
}

impl std::fmt::Debug for SegmentTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentTable")
            .field("name", &self.label)
            .field("rows", &self.row_count())
            .finish_non_exhaustive()
    }
}
