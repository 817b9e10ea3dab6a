//! Store configuration.

use crate::error::{StoreError, StoreResult};
use crate::types::Severity;

/// Default rotation threshold for every severity.
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Per-severity rotation thresholds.
///
/// A segment rotates once an append receives a sequence *greater* than its
/// severity's capacity, so a full segment holds `capacity + 1` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    /// Threshold for informational segments.
    pub info: u64,
    /// Threshold for warning segments.
    pub warning: u64,
    /// Threshold for error segments.
    pub error: u64,
}

impl Capacities {
    /// Uses the same threshold for every severity.
    #[must_use]
    pub const fn uniform(capacity: u64) -> Self {
        Self {
            info: capacity,
            warning: capacity,
            error: capacity,
        }
    }

    /// Returns the threshold for `severity`.
    #[must_use]
    pub const fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
        }
    }

    /// Returns a copy with the threshold for `severity` replaced.
    #[must_use]
    pub const fn with(mut self, severity: Severity, capacity: u64) -> Self {
        match severity {
            Severity::Info => self.info = capacity,
            Severity::Warning => self.warning = capacity,
            Severity::Error => self.error = capacity,
        }
        self
    }
}

impl Default for Capacities {
    fn default() -> Self {
        Self::uniform(DEFAULT_CAPACITY)
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Rotation thresholds.
    pub capacities: Capacities,

    /// Whether to sync the segment after every append (safer but slower).
    pub sync_on_append: bool,

    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacities: Capacities::default(),
            sync_on_append: true,
            create_if_missing: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets all rotation thresholds.
    #[must_use]
    pub const fn capacities(mut self, capacities: Capacities) -> Self {
        self.capacities = capacities;
        self
    }

    /// Sets the rotation threshold for one severity.
    #[must_use]
    pub const fn capacity(mut self, severity: Severity, capacity: u64) -> Self {
        self.capacities = self.capacities.with(severity, capacity);
        self
    }

    /// Sets whether to sync after every append.
    #[must_use]
    pub const fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Checks that every capacity is a positive integer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] naming the first zero capacity.
    pub fn validate(&self) -> StoreResult<()> {
        for severity in Severity::ALL {
            if self.capacities.get(severity) == 0 {
                return Err(StoreError::invalid_config(format!(
                    "{severity} capacity must be positive"
                )));
            }
        }
        Ok(())
    }
}
