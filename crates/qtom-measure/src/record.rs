//! Outcome statistics accumulated per measurement setting.

use serde::{Deserialize, Serialize};

use qtom_core::errors::ErrorInfo;
use qtom_core::QtomError;

use crate::design::MeasurementDesign;

/// Counts per outcome, per setting, for one tomography experiment.
///
/// A record is owned by a tomograph and only replaced wholesale, either by a
/// simulated experiment or by injecting externally measured counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    counts: Vec<Vec<u64>>,
}

impl OutcomeRecord {
    /// Wraps raw per-setting outcome counts.
    pub fn from_counts(counts: Vec<Vec<u64>>) -> Result<Self, QtomError> {
        if counts.is_empty() || counts.iter().any(|setting| setting.is_empty()) {
            return Err(QtomError::Serde(ErrorInfo::new(
                "empty-record",
                "outcome record needs at least one setting with at least one outcome",
            )));
        }
        if counts.iter().any(|setting| setting.iter().sum::<u64>() == 0) {
            return Err(QtomError::Serde(ErrorInfo::new(
                "zero-shots",
                "every setting needs at least one recorded shot",
            )));
        }
        Ok(Self { counts })
    }

    /// Raw counts per setting.
    pub fn counts(&self) -> &[Vec<u64>] {
        &self.counts
    }

    /// Number of settings recorded.
    pub fn n_settings(&self) -> usize {
        self.counts.len()
    }

    /// Total shots recorded for one setting.
    pub fn shots(&self, setting: usize) -> u64 {
        self.counts[setting].iter().sum()
    }

    /// Empirical outcome frequencies per setting.
    pub fn frequencies(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .map(|setting| {
                let total: u64 = setting.iter().sum();
                setting
                    .iter()
                    .map(|count| *count as f64 / total as f64)
                    .collect()
            })
            .collect()
    }

    /// Checks that the record's shape matches a design.
    pub fn check_against(&self, design: &MeasurementDesign) -> Result<(), QtomError> {
        if self.counts.len() != design.n_settings() {
            return Err(QtomError::dimension_mismatch(
                "record settings",
                design.n_settings(),
                self.counts.len(),
            ));
        }
        for (setting, counts) in self.counts.iter().enumerate() {
            if counts.len() != design.effects(setting).len() {
                return Err(QtomError::dimension_mismatch(
                    "record outcomes",
                    design.effects(setting).len(),
                    counts.len(),
                ));
            }
        }
        Ok(())
    }
}
