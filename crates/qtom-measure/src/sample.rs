//! Multinomial sampling of simulated experiments.

use rand::distributions::{Distribution, WeightedIndex};

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, RngHandle};
use qtom_qobj::Qobj;

use crate::design::MeasurementDesign;
use crate::record::OutcomeRecord;

/// Draws `shots` independent outcomes per setting from the distribution the
/// design assigns to `object`.
///
/// Tiny negative probabilities from numerical noise on physical objects are
/// clamped to zero before sampling; genuinely negative distributions (raw
/// non-physical estimates) are a caller error and surface as
/// [`QtomError::Numeric`].
pub fn sample(
    design: &MeasurementDesign,
    object: &Qobj,
    shots: u64,
    rng: &mut RngHandle,
) -> Result<OutcomeRecord, QtomError> {
    if shots == 0 {
        return Err(QtomError::Serde(ErrorInfo::new(
            "zero-shots",
            "cannot sample an experiment with zero shots",
        )));
    }
    let probabilities = design.probabilities(object)?;
    let mut counts = Vec::with_capacity(probabilities.len());
    for (setting, distribution) in probabilities.iter().enumerate() {
        if distribution.iter().any(|p| *p < -1e-7) {
            return Err(QtomError::Numeric(
                ErrorInfo::new("negative-probability", "outcome distribution is negative")
                    .with_context("setting", setting.to_string())
                    .with_hint("project the object onto the physical set before sampling"),
            ));
        }
        let weights: Vec<f64> = distribution.iter().map(|p| p.max(0.0)).collect();
        let sampler = WeightedIndex::new(&weights).map_err(|err| {
            QtomError::Numeric(
                ErrorInfo::new("degenerate-distribution", err.to_string())
                    .with_context("setting", setting.to_string()),
            )
        })?;
        let mut setting_counts = vec![0u64; weights.len()];
        for _ in 0..shots {
            setting_counts[sampler.sample(rng)] += 1;
        }
        counts.push(setting_counts);
    }
    OutcomeRecord::from_counts(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_is_seed_reproducible() {
        let design = MeasurementDesign::pauli_projective(1);
        let mixed = Qobj::fully_mixed(1);
        let a = sample(&design, &mixed, 500, &mut RngHandle::from_seed(11)).unwrap();
        let b = sample(&design, &mixed, 500, &mut RngHandle::from_seed(11)).unwrap();
        assert_eq!(a, b);
        let c = sample(&design, &mixed, 500, &mut RngHandle::from_seed(12)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn counts_follow_the_distribution() {
        let design = MeasurementDesign::pauli_projective(1);
        let up = Qobj::pure(&[num_complex::Complex::new(1.0, 0.0), num_complex::Complex::new(0.0, 0.0)]).unwrap();
        let record = sample(&design, &up, 2000, &mut RngHandle::from_seed(3)).unwrap();
        // The Z setting is the last of the three; |0⟩ is deterministic there.
        let z_counts = &record.counts()[2];
        assert_eq!(z_counts[0], 2000);
        assert_eq!(z_counts[1], 0);
        // X outcomes on |0⟩ are unbiased; allow wide statistical slack.
        let x_counts = &record.counts()[0];
        assert!(x_counts[0] > 800 && x_counts[0] < 1200, "{x_counts:?}");
    }
}
