//! A reference model of segment rotation.
//!
//! [`RotationModel`] predicts where each append lands using nothing but
//! arithmetic, so tests can compare a real store against it append by
//! append.

use iwelog_core::{AppendOutcome, Capacities, SegmentName, Severity};

/// Where an append is expected to land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Segment written to.
    pub segment: SegmentName,
    /// Sequence assigned.
    pub sequence: u64,
    /// Segment rotated to, if any.
    pub rotated_to: Option<SegmentName>,
}

impl From<&AppendOutcome> for Placement {
    fn from(outcome: &AppendOutcome) -> Self {
        Self {
            segment: outcome.segment.clone(),
            sequence: outcome.sequence.as_u64(),
            rotated_to: outcome.rotated_to.clone(),
        }
    }
}

/// Expected state of every severity chain.
#[derive(Debug, Clone)]
pub struct RotationModel {
    capacities: Capacities,
    active: [SegmentName; 3],
    rows: [u64; 3],
}

impl RotationModel {
    /// Creates the model of a freshly initialized store.
    pub fn new(capacities: Capacities) -> Self {
        Self {
            capacities,
            active: Severity::ALL.map(SegmentName::first),
            rows: [0; 3],
        }
    }

    /// Records one append and returns where it should land.
    pub fn append(&mut self, severity: Severity) -> Placement {
        let slot = severity.index();
        self.rows[slot] += 1;

        let segment = self.active[slot].clone();
        let sequence = self.rows[slot];

        let rotated_to = if sequence > self.capacities.get(severity) {
            let next = segment.next().expect("Model index overflow");
            self.active[slot] = next.clone();
            self.rows[slot] = 0;
            Some(next)
        } else {
            None
        };

        Placement {
            segment,
            sequence,
            rotated_to,
        }
    }

    /// Returns the expected active segment of `severity`.
    pub fn active(&self, severity: Severity) -> &SegmentName {
        &self.active[severity.index()]
    }

    /// Returns the expected row count of the active segment of `severity`.
    pub fn active_rows(&self, severity: Severity) -> u64 {
        self.rows[severity.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_record, TestStore};
    use crate::generators::workload_strategy;
    use iwelog_core::Config;
    use proptest::prelude::*;

    #[test]
    fn model_overruns_by_one() {
        let mut model = RotationModel::new(Capacities::uniform(3));
        let placements: Vec<_> = (0..5).map(|_| model.append(Severity::Warning)).collect();

        assert_eq!(placements[3].sequence, 4);
        assert_eq!(placements[3].rotated_to.as_ref().unwrap().to_string(), "logW_2");
        assert_eq!(placements[4].segment.to_string(), "logW_2");
        assert_eq!(placements[4].sequence, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn store_matches_model(
            info in 1u64..5,
            warning in 1u64..5,
            error in 1u64..5,
            workload in workload_strategy(60),
        ) {
            let capacities = Capacities { info, warning, error };
            let store = TestStore::memory_with(Config::default().capacities(capacities));
            let mut model = RotationModel::new(capacities);

            for (n, severity) in workload.into_iter().enumerate() {
                let outcome = store.append(severity, &sample_record(n)).unwrap();
                prop_assert_eq!(Placement::from(&outcome), model.append(severity));
            }

            for severity in Severity::ALL {
                let active = store.active_segment(severity).unwrap();
                prop_assert_eq!(&active, model.active(severity));
                prop_assert_eq!(store.row_count(&active).unwrap(), model.active_rows(severity));
            }
        }
    }
}
