//! # IWELog Testkit
//!
//! Test utilities for IWELog.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - Property-based test generators using proptest
//! - A reference model of segment rotation
//! - A fault-injecting volume for failure-path tests
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use iwelog_testkit::prelude::*;
//! use iwelog_core::Severity;
//!
//! with_temp_store(|store| {
//!     let outcome = store.append(Severity::Info, &sample_record(0)).unwrap();
//!     assert_eq!(outcome.sequence.as_u64(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
