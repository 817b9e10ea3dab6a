//! Segment tables.
//!
//! A segment is an append-only file of checksummed rows. Each row carries a
//! sequence number assigned by its segment: the first row is 1 and every
//! following row is one greater, so the last sequence doubles as the row
//! count the rotation controller compares against capacity.

mod store;
mod table;

pub use store::SegmentStore;
pub use table::{SegmentReport, SegmentTable};
