//! # IWELog Core
//!
//! Rotating, severity-partitioned log storage.
//!
//! Every ingested record has a severity (info, warning, error). Each severity
//! writes into its own chain of segments named `<prefix>_<index>`
//! (`logI_1`, `logI_2`, ...). A directory record names the active segment of
//! each chain, and once an append pushes a segment past its capacity the
//! chain rotates to the next index.
//!
//! This crate provides:
//! - [`LogStore`], the facade used by the ingestion layer
//! - [`Directory`], the persisted map from severity to active segment
//! - [`SegmentStore`] and [`SegmentTable`], checksummed append-only segments
//! - [`RotationController`], the per-severity rotation algorithm

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod directory;
mod error;
mod name;
mod record;
mod rotation;
mod segment;
mod store;
mod types;

pub use config::{Capacities, Config, DEFAULT_CAPACITY};
pub use directory::{Directory, DirectoryRecord, DIRECTORY_BLOB};
pub use error::{StoreError, StoreResult};
pub use name::{increment_id_in_name, SegmentName};
pub use record::{NewRecord, SegmentRow, MAX_BODY_LEN, MAX_SHORT_FIELD_LEN};
pub use rotation::{AppendOutcome, RotationController};
pub use segment::{SegmentReport, SegmentStore, SegmentTable};
pub use store::{LogStore, SeverityStatus, StoreStatus};
pub use types::{SequenceNumber, Severity};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
