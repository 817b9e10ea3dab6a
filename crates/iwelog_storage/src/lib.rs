//! # IWELog Storage
//!
//! Storage backends and volumes for the IWELog segment store.
//!
//! This crate is the lowest layer of IWELog. It knows nothing about
//! severities, rows or rotation:
//!
//! - A [`StorageBackend`] is an **opaque append-only byte store** (one per
//!   segment).
//! - A [`Volume`] is a namespace of named backends plus a handful of small
//!   blobs that are replaced atomically (the segment directory lives in one).
//!
//! ## Available Implementations
//!
//! - [`InMemoryBackend`] / [`MemoryVolume`] - For tests and ephemeral stores
//! - [`FileBackend`] / [`DirVolume`] - Persistent storage on the local file system
//!
//! ## Example
//!
//! ```rust
//! use iwelog_storage::{MemoryVolume, Volume};
//!
//! let volume = MemoryVolume::new();
//! assert!(volume.create_backend("logI_1").unwrap());
//!
//! let mut backend = volume.open_backend("logI_1").unwrap();
//! let offset = backend.append(b"row").unwrap();
//! assert_eq!(offset, 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod dir;
mod error;
mod file;
mod memory;
mod volume;

pub use backend::StorageBackend;
pub use dir::DirVolume;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::{InMemoryBackend, MemoryVolume};
pub use volume::{validate_name, Volume, MAX_NAME_LEN};
