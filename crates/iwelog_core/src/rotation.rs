//! Capacity-driven segment rotation.

use crate::config::Capacities;
use crate::directory::Directory;
use crate::error::StoreResult;
use crate::name::SegmentName;
use crate::record::NewRecord;
use crate::segment::SegmentStore;
use crate::types::{SequenceNumber, Severity};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to an appended record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Segment the record was written to.
    pub segment: SegmentName,
    /// Sequence the record received in that segment.
    pub sequence: SequenceNumber,
    /// The new active segment, if this append triggered a rotation.
    pub rotated_to: Option<SegmentName>,
}

/// Routes records to the active segment of their severity and rotates the
/// segment once it overflows.
///
/// The trigger is trailing-edge: the record whose sequence first exceeds the
/// capacity is kept in the old segment, and only later records go to the new
/// one. A full segment therefore holds `capacity + 1` rows.
///
/// Each severity has its own lock, held from reading the active segment until
/// the directory has been updated. Severities never wait on each other.
pub struct RotationController {
    directory: Arc<Directory>,
    segments: Arc<SegmentStore>,
    capacities: Capacities,
    locks: [Mutex<()>; 3],
}

impl RotationController {
    /// Creates a controller.
    pub fn new(
        directory: Arc<Directory>,
        segments: Arc<SegmentStore>,
        capacities: Capacities,
    ) -> Self {
        Self {
            directory,
            segments,
            capacities,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    /// Appends `record` to the active segment of `severity`, rotating if the
    /// segment is now over capacity.
    ///
    /// A rotation failure is returned even though the record itself is
    /// stored; the next append of the same severity retries the rotation.
    ///
    /// # Errors
    ///
    /// Returns the first error from the directory lookup, the append, or the
    /// rotation.
    pub fn append(&self, severity: Severity, record: &NewRecord) -> StoreResult<AppendOutcome> {
        let _guard = self.locks[severity.index()].lock();

        let segment = self.directory.active_segment(severity)?;
        let sequence = self.segments.append(&segment, record)?;

        let capacity = self.capacities.get(severity);
        let rotated_to = if sequence.as_u64() > capacity {
            Some(self.rotate(severity, &segment, sequence)?)
        } else {
            None
        };

        Ok(AppendOutcome {
            segment,
            sequence,
            rotated_to,
        })
    }

    fn rotate(
        &self,
        severity: Severity,
        current: &SegmentName,
        sequence: SequenceNumber,
    ) -> StoreResult<SegmentName> {
        let next = current.next()?;
        self.segments.ensure_segment_exists(&next)?;
        self.directory.set_active_segment(severity, current, &next)?;

        // The retired segment is complete; nothing appends to it again.
        if let Err(e) = self.segments.release(current) {
            warn!(segment = %current, error = %e, "could not sync retired segment");
        }

        info!(
            %severity,
            from = %current,
            to = %next,
            rows = sequence.as_u64(),
            "rotated segment"
        );
        Ok(next)
    }

    /// Returns the configured capacities.
    #[must_use]
    pub const fn capacities(&self) -> &Capacities {
        &self.capacities
    }
}

impl std::fmt::Debug for RotationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationController")
            .field("capacities", &self.capacities)
            .finish_non_exhaustive()
    }
}
