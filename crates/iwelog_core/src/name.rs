//! Segment names.
//!
//! A segment is named `<prefix>_<index>`: the prefix identifies the severity
//! (`logI`, `logW`, `logE`) and the index counts rotations from 1. The string
//! form only exists at the storage boundary; everything else works with the
//! structured [`SegmentName`].

use crate::error::{StoreError, StoreResult};
use crate::types::Severity;
use std::fmt;
use std::str::FromStr;

/// Separator between prefix and index.
const SEPARATOR: char = '_';

/// A parsed segment name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentName {
    prefix: String,
    index: u64,
}

impl SegmentName {
    /// Creates a segment name from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NameFormat`] if the prefix is empty or contains
    /// the separator, or if `index` is zero.
    pub fn new(prefix: impl Into<String>, index: u64) -> StoreResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.contains(SEPARATOR) {
            return Err(StoreError::name_format(
                format!("{prefix}{SEPARATOR}{index}"),
                "prefix must be non-empty and must not contain '_'",
            ));
        }
        if index == 0 {
            return Err(StoreError::name_format(
                format!("{prefix}{SEPARATOR}{index}"),
                "index must start at 1",
            ));
        }
        Ok(Self { prefix, index })
    }

    /// Returns the first segment of a severity's chain (`<prefix>_1`).
    #[must_use]
    pub fn first(severity: Severity) -> Self {
        Self {
            prefix: severity.segment_prefix().to_string(),
            index: 1,
        }
    }

    /// Parses `<prefix>_<index>`.
    ///
    /// The name must contain exactly one `_`, a non-empty prefix, and a
    /// positive decimal index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NameFormat`] otherwise.
    pub fn parse(name: &str) -> StoreResult<Self> {
        let mut parts = name.split(SEPARATOR);
        let (Some(prefix), Some(index), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(StoreError::name_format(
                name,
                "expected exactly one '_' between prefix and index",
            ));
        };

        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::name_format(name, "index is not a decimal number"));
        }
        let index = index
            .parse::<u64>()
            .map_err(|_| StoreError::name_format(name, "index is out of range"))?;

        Self::new(prefix, index)
    }

    /// Returns the name of the segment that follows this one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NameFormat`] if the index cannot be incremented.
    pub fn next(&self) -> StoreResult<Self> {
        let index = self
            .index
            .checked_add(1)
            .ok_or_else(|| StoreError::name_format(self.to_string(), "index exhausted"))?;
        Ok(Self {
            prefix: self.prefix.clone(),
            index,
        })
    }

    /// Returns the prefix part.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the index part.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Returns the severity this segment belongs to, if the prefix is known.
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        Severity::from_segment_prefix(&self.prefix)
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, SEPARATOR, self.index)
    }
}

impl FromStr for SegmentName {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Self::parse(s)
    }
}

/// Increments the index embedded in a segment name.
///
/// `increment_id_in_name("logI_9")` is `"logI_10"`.
///
/// # Errors
///
/// Returns [`StoreError::NameFormat`] if `name` is not `<prefix>_<index>`.
pub fn increment_id_in_name(name: &str) -> StoreResult<String> {
    Ok(SegmentName::parse(name)?.next()?.to_string())
}
