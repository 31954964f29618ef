//! State tomograph: simulated experiments against a reference state and
//! constrained point estimation from the accumulated record.

use std::collections::BTreeMap;

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, RngHandle};
use qtom_measure::{sample, MeasurementDesign, OutcomeRecord};
use qtom_qobj::Qobj;

use crate::estimator::EstimatorMode;
use crate::view::{ObjectKind, TomographyView};
use crate::DEFAULT_SEED;

/// Tomograph for quantum states.
///
/// The bound reference state is used only when simulating experiments; point
/// estimation reads nothing but the design and the outcome record, so a
/// tomograph replayed with externally measured counts never touches the
/// reference. Point estimates are cached per estimator mode and the cache is
/// dropped on every write to the record.
#[derive(Debug, Clone)]
pub struct StateTomograph {
    reference: Qobj,
    seed: u64,
    design: Option<MeasurementDesign>,
    record: Option<OutcomeRecord>,
    cache: BTreeMap<EstimatorMode, Qobj>,
}

impl StateTomograph {
    /// Creates a tomograph bound to a reference state for simulation.
    pub fn new(reference: Qobj) -> Self {
        Self {
            reference,
            seed: DEFAULT_SEED,
            design: None,
            record: None,
            cache: BTreeMap::new(),
        }
    }

    /// Overrides the master seed used for simulated experiments.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Runs a simulated experiment: `shots` multinomial draws per setting of
    /// the design against the reference state. Overwrites any prior record.
    pub fn experiment(&mut self, shots: u64, design: MeasurementDesign) -> Result<(), QtomError> {
        let mut rng = RngHandle::substream(self.seed, 0);
        let record = sample(&design, &self.reference, shots, &mut rng)?;
        self.design = Some(design);
        self.record = Some(record);
        self.cache.clear();
        Ok(())
    }

    /// Replaces the outcome record with externally measured counts.
    ///
    /// Requires a design (from a prior [`StateTomograph::experiment`] call),
    /// since the counts are meaningless without the effects they refer to.
    pub fn set_results(&mut self, record: OutcomeRecord) -> Result<(), QtomError> {
        let design = self.design.as_ref().ok_or_else(|| {
            QtomError::NotReady(
                ErrorInfo::new("design-required", "no measurement design bound to this tomograph")
                    .with_hint("run experiment() first to bind a design"),
            )
        })?;
        record.check_against(design)?;
        self.record = Some(record);
        self.cache.clear();
        Ok(())
    }

    /// Currently bound outcome record, if any.
    pub fn results(&self) -> Option<&OutcomeRecord> {
        self.record.as_ref()
    }

    /// Currently bound measurement design, if any.
    pub fn design(&self) -> Option<&MeasurementDesign> {
        self.design.as_ref()
    }

    /// Reference state the tomograph simulates against.
    pub fn reference(&self) -> &Qobj {
        &self.reference
    }

    /// Immutable snapshot for interval estimation, fitted with `mode`.
    pub fn view(&mut self, mode: EstimatorMode) -> Result<TomographyView, QtomError> {
        let (design, record) = self.fitted_inputs()?;
        let effects = design.settings().to_vec();
        let counts = record.counts().to_vec();
        let view = TomographyView::new(effects, counts, mode, ObjectKind::State)?;
        self.cache.insert(mode, view.estimate().clone());
        Ok(view)
    }

    /// Point estimate under the selected constraint mode, cached until the
    /// record changes.
    pub fn point_estimate(&mut self, mode: EstimatorMode) -> Result<Qobj, QtomError> {
        if let Some(hit) = self.cache.get(&mode) {
            return Ok(hit.clone());
        }
        Ok(self.view(mode)?.estimate().clone())
    }

    fn fitted_inputs(&self) -> Result<(&MeasurementDesign, &OutcomeRecord), QtomError> {
        match (self.design.as_ref(), self.record.as_ref()) {
            (Some(design), Some(record)) => Ok((design, record)),
            _ => Err(QtomError::NotReady(
                ErrorInfo::new("no-data", "tomograph has no outcome record")
                    .with_hint("run experiment() or inject results first"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;
    use qtom_core::EPS_PSD;
    use qtom_qobj::Complex64;

    /// Binary projective settings onto |0⟩, |1⟩, |+⟩ and |+i⟩.
    fn projector_settings() -> MeasurementDesign {
        let r = 1.0 / 2.0_f64.sqrt();
        let amplitude_sets: [[Complex64; 2]; 4] = [
            [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
            [Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)],
            [Complex::new(r, 0.0), Complex::new(r, 0.0)],
            [Complex::new(r, 0.0), Complex::new(0.0, r)],
        ];
        let settings = amplitude_sets
            .iter()
            .map(|amps| {
                let proj = Qobj::pure(amps).unwrap();
                let complement =
                    nalgebra::DMatrix::<Complex64>::identity(2, 2) - proj.matrix();
                vec![proj, Qobj::from_matrix(complement).unwrap()]
            })
            .collect();
        MeasurementDesign::from_settings(settings).unwrap()
    }

    #[test]
    fn mixed_state_estimate_has_small_bloch_norm() {
        let mut tmg = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(17);
        tmg.experiment(1000, projector_settings()).unwrap();
        let estimate = tmg.point_estimate(EstimatorMode::ProjectedLinear).unwrap();
        assert!(estimate.is_physical_state(EPS_PSD, 1e-9));
        let bloch = estimate.bloch();
        let norm = (bloch[1] * bloch[1] + bloch[2] * bloch[2] + bloch[3] * bloch[3]).sqrt();
        assert!(norm < 0.2, "bloch norm {norm} too large for 1000 shots");
    }

    #[test]
    fn linear_inversion_recovers_exact_frequencies() {
        // Counts matching the exact outcome distribution of the state with
        // Bloch vector (1, 0.5, 0, 0.5) make the linear system consistent.
        let mut tmg = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(5);
        tmg.experiment(400, projector_settings()).unwrap();
        let exact = OutcomeRecord::from_counts(vec![
            vec![750, 250],
            vec![250, 750],
            vec![750, 250],
            vec![500, 500],
        ])
        .unwrap();
        tmg.set_results(exact).unwrap();
        let raw = tmg.point_estimate(EstimatorMode::LinearInversion).unwrap();
        let bloch = raw.bloch();
        let expected = [1.0, 0.5, 0.0, 0.5];
        for (value, target) in bloch.iter().zip(expected.iter()) {
            assert!((value - target).abs() < 1e-10, "bloch {bloch:?}");
        }
    }

    #[test]
    fn injected_results_invalidate_the_cache() {
        let mut tmg = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(9);
        tmg.experiment(1000, projector_settings()).unwrap();
        let before = tmg.point_estimate(EstimatorMode::LinearInversion).unwrap();
        let skewed = OutcomeRecord::from_counts(vec![
            vec![950, 50],
            vec![50, 950],
            vec![500, 500],
            vec![500, 500],
        ])
        .unwrap();
        tmg.set_results(skewed).unwrap();
        let after = tmg.point_estimate(EstimatorMode::LinearInversion).unwrap();
        assert_ne!(before, after);
        let bloch = after.bloch();
        assert!(bloch[3] > 0.8, "z component should follow injected counts");
    }

    #[test]
    fn results_before_any_design_is_rejected() {
        let mut tmg = StateTomograph::new(Qobj::fully_mixed(1));
        let record = OutcomeRecord::from_counts(vec![vec![1, 1]]).unwrap();
        assert!(matches!(
            tmg.set_results(record),
            Err(QtomError::NotReady(_))
        ));
    }

    #[test]
    fn experiments_replay_bit_identically_for_a_seed() {
        let mut a = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(123);
        let mut b = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(123);
        a.experiment(500, projector_settings()).unwrap();
        b.experiment(500, projector_settings()).unwrap();
        assert_eq!(a.results(), b.results());
    }
}
