//! Error types for the IWELog store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// The store never retries: every error is surfaced to the caller of
/// `initialize`, `append` or `submit`. [`StoreError::is_fatal`] marks the
/// errors that indicate directory corruption.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required record field is empty or oversized. Nothing was written.
    #[error("invalid record: {field} {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The severity tag is not one of the supported severities.
    #[error("unsupported severity: {tag:?}")]
    UnsupportedSeverity {
        /// The tag as received.
        tag: String,
    },

    /// Writing to a segment or to the directory failed.
    #[error("write to {target} failed: {source}")]
    Write {
        /// The segment or blob being written.
        target: String,
        /// The underlying storage error.
        #[source]
        source: iwelog_storage::StorageError,
    },

    /// Creating a segment failed for a reason other than "already exists".
    #[error("cannot create segment {segment}: {source}")]
    Schema {
        /// The segment being created.
        segment: String,
        /// The underlying storage error.
        #[source]
        source: iwelog_storage::StorageError,
    },

    /// The segment could not assign or report a sequence number.
    #[error("segment {segment} cannot assign a sequence: {message}")]
    Identity {
        /// The segment being appended to.
        segment: String,
        /// Description of the failure.
        message: String,
    },

    /// A segment name does not follow `<prefix>_<index>`.
    #[error("malformed segment name {name:?}: {message}")]
    NameFormat {
        /// The offending name.
        name: String,
        /// Description of the violation.
        message: String,
    },

    /// A directory update did not affect exactly one record.
    #[error("directory consistency violated: {message}")]
    Consistency {
        /// Description of the violation.
        message: String,
    },

    /// The store could not establish its directory and initial segments.
    #[error("initialization failed: {message}")]
    Initialization {
        /// Description of what could not be established.
        message: String,
        /// The first underlying failure.
        #[source]
        source: Box<StoreError>,
    },

    /// A directory entry or segment does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Storage backend error outside of a segment append.
    #[error("storage error: {0}")]
    Storage(#[from] iwelog_storage::StorageError),

    /// The directory record cannot be decoded.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A segment contains a damaged row.
    #[error("segment {segment} corrupted at offset {offset}: {message}")]
    SegmentCorruption {
        /// The damaged segment.
        segment: String,
        /// Byte offset of the damaged row.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// A row checksum does not match its contents.
    #[error("checksum mismatch in {segment} at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// The damaged segment.
        segment: String,
        /// Byte offset of the damaged row.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Another process has the store open.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// The configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A previous fatal error stopped the store from accepting writes.
    #[error("store refuses writes after fatal error: {reason}")]
    Poisoned {
        /// The fatal error that poisoned the store.
        reason: String,
    },
}

impl StoreError {
    /// Creates a validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates a name format error.
    pub fn name_format(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NameFormat {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a consistency error.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Creates an identity error.
    pub fn identity(segment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Identity {
            segment: segment.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a segment corruption error.
    pub fn segment_corruption(
        segment: impl Into<String>,
        offset: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::SegmentCorruption {
            segment: segment.into(),
            offset,
            message: message.into(),
        }
    }

    /// Wraps `source` as an initialization failure.
    pub fn initialization(message: impl Into<String>, source: StoreError) -> Self {
        Self::Initialization {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Returns true if this error means the directory can no longer be
    /// trusted and the store must stop accepting writes.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NameFormat { .. } | Self::Consistency { .. })
    }
}
