//! Core type definitions for IWELog.

use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::str::FromStr;

/// Classification of an ingested record.
///
/// Each severity owns an independent chain of segments. The set is closed:
/// adding a severity means adding a variant here and handling it in every
/// `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational event (`I`).
    Info,
    /// Warning event (`W`).
    Warning,
    /// Error event (`E`).
    Error,
}

impl Severity {
    /// All severities, in directory order.
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    /// Returns the single-letter wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Severity::Info => "I",
            Severity::Warning => "W",
            Severity::Error => "E",
        }
    }

    /// Returns the segment name prefix for this severity.
    #[must_use]
    pub const fn segment_prefix(self) -> &'static str {
        match self {
            Severity::Info => "logI",
            Severity::Warning => "logW",
            Severity::Error => "logE",
        }
    }

    /// Returns the position of this severity in [`Severity::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    /// Returns the severity whose segments use `prefix`.
    #[must_use]
    pub fn from_segment_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|severity| severity.segment_prefix() == prefix)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

impl FromStr for Severity {
    type Err = StoreError;

    /// Parses a wire tag (`I`, `W`, `E`) or a severity name, ignoring case.
    fn from_str(tag: &str) -> StoreResult<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "i" | "info" => Ok(Severity::Info),
            "w" | "warn" | "warning" => Ok(Severity::Warning),
            "e" | "error" => Ok(Severity::Error),
            _ => Err(StoreError::UnsupportedSeverity {
                tag: tag.to_string(),
            }),
        }
    }
}

/// Sequence number assigned to a row within its segment.
///
/// The first row of every segment gets sequence 1. `SequenceNumber::ZERO`
/// stands for "no rows yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// The sequence of an empty segment.
    pub const ZERO: Self = Self(0);

    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number, or `None` once the space is exhausted.
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}
