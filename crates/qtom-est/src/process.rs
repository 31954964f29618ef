//! Process tomograph: prepares a spanning set of input states, measures the
//! channel outputs, and reconstructs the Choi state.

use std::collections::BTreeMap;

use num_complex::Complex;

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, RngHandle};
use qtom_measure::{sample, MeasurementDesign, OutcomeRecord};
use qtom_qobj::{proj_set, Channel, Qobj};

use crate::estimator::EstimatorMode;
use crate::view::{ObjectKind, TomographyView};
use crate::DEFAULT_SEED;

/// Tomograph for quantum processes.
///
/// Each experiment applies the bound reference channel to every input state
/// and measures the outputs with one POVM design. The flattened record holds
/// `inputs × design settings` settings, outer index first. Estimation lifts
/// every `(input, effect)` pair to the operator `d · (ρᵀ ⊗ E)` on the Choi
/// space, so the state estimation machinery applies unchanged.
#[derive(Debug, Clone)]
pub struct ProcessTomograph {
    reference: Channel,
    input_states: Vec<Qobj>,
    seed: u64,
    design: Option<MeasurementDesign>,
    record: Option<OutcomeRecord>,
    cache: BTreeMap<EstimatorMode, Qobj>,
}

impl ProcessTomograph {
    /// Creates a tomograph with an explicit preparation basis.
    pub fn new(reference: Channel, input_states: Vec<Qobj>) -> Result<Self, QtomError> {
        if input_states.is_empty() {
            return Err(QtomError::InvalidDesign(ErrorInfo::new(
                "no-input-states",
                "process tomography needs at least one input state",
            )));
        }
        for state in &input_states {
            if state.dim() != reference.dim() {
                return Err(QtomError::dimension_mismatch(
                    "input state",
                    reference.dim(),
                    state.dim(),
                ));
            }
        }
        Ok(Self {
            reference,
            input_states,
            seed: DEFAULT_SEED,
            design: None,
            record: None,
            cache: BTreeMap::new(),
        })
    }

    /// Creates a tomograph with the standard `proj-set` preparation basis,
    /// the `4^n` tensor products of `{|0⟩, |1⟩, |+⟩, |+i⟩}`.
    pub fn with_proj_set(reference: Channel) -> Result<Self, QtomError> {
        let n_qubits = (reference.dim() as f64).log2().round() as usize;
        let inputs = proj_set(n_qubits);
        Self::new(reference, inputs)
    }

    /// Overrides the master seed used for simulated experiments.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Runs a simulated experiment against every input state.
    pub fn experiment(&mut self, shots: u64, design: MeasurementDesign) -> Result<(), QtomError> {
        let mut counts = Vec::with_capacity(self.input_states.len() * design.n_settings());
        for (input_index, input) in self.input_states.iter().enumerate() {
            let output = self.reference.apply(input)?;
            let mut rng = RngHandle::substream(self.seed, input_index as u64);
            let partial = sample(&design, &output, shots, &mut rng)?;
            counts.extend(partial.counts().iter().cloned());
        }
        self.design = Some(design);
        self.record = Some(OutcomeRecord::from_counts(counts)?);
        self.cache.clear();
        Ok(())
    }

    /// Replaces the outcome record with externally measured counts, shaped as
    /// `inputs × design settings` flattened settings.
    pub fn set_results(&mut self, record: OutcomeRecord) -> Result<(), QtomError> {
        let design = self.design.as_ref().ok_or_else(|| {
            QtomError::NotReady(
                ErrorInfo::new("design-required", "no measurement design bound to this tomograph")
                    .with_hint("run experiment() first to bind a design"),
            )
        })?;
        let expected = self.input_states.len() * design.n_settings();
        if record.n_settings() != expected {
            return Err(QtomError::dimension_mismatch(
                "record settings",
                expected,
                record.n_settings(),
            ));
        }
        for (flat, counts) in record.counts().iter().enumerate() {
            let design_setting = flat % design.n_settings();
            if counts.len() != design.effects(design_setting).len() {
                return Err(QtomError::dimension_mismatch(
                    "record outcomes",
                    design.effects(design_setting).len(),
                    counts.len(),
                ));
            }
        }
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

    /// Reference channel the tomograph simulates against.
    pub fn reference(&self) -> &Channel {
        &self.reference
    }

    /// Preparation basis.
    pub fn input_states(&self) -> &[Qobj] {
        &self.input_states
    }

    /// Immutable snapshot for interval estimation, fitted with `mode`.
    pub fn view(&mut self, mode: EstimatorMode) -> Result<TomographyView, QtomError> {
        let (design, record) = match (self.design.as_ref(), self.record.as_ref()) {
            (Some(design), Some(record)) => (design, record),
            _ => {
                return Err(QtomError::NotReady(
                    ErrorInfo::new("no-data", "tomograph has no outcome record")
                        .with_hint("run experiment() or inject results first"),
                ))
            }
        };
        let dim = self.reference.dim();
        let scale = Complex::new(dim as f64, 0.0);
        let mut effects = Vec::with_capacity(record.n_settings());
        for input in &self.input_states {
            let lifted_input = input.transpose();
            for setting in design.settings() {
                let lifted: Vec<Qobj> = setting
                    .iter()
                    .map(|effect| {
                        let product = lifted_input.tensor(effect);
                        Qobj::from_matrix(product.matrix() * scale)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                effects.push(lifted);
            }
        }
        let counts = record.counts().to_vec();
        let view = TomographyView::new(effects, counts, mode, ObjectKind::Process(dim))?;
        self.cache.insert(mode, view.estimate().clone());
        Ok(view)
    }

    /// Choi point estimate under the selected constraint mode, cached until
    /// the record changes. `LinearInversion` returns the raw solution; both
    /// physical modes project onto the CPTP set.
    pub fn point_estimate(&mut self, mode: EstimatorMode) -> Result<Channel, QtomError> {
        if let Some(hit) = self.cache.get(&mode) {
            return Channel::from_choi(hit.clone());
        }
        let view = self.view(mode)?;
        Channel::from_choi(view.estimate().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtom_measure::MeasurementDesign;

    #[test]
    fn identity_channel_is_recovered() {
        let mut tmg = ProcessTomograph::with_proj_set(Channel::identity(1))
            .unwrap()
            .with_seed(31);
        tmg.experiment(2000, MeasurementDesign::pauli_projective(1))
            .unwrap();
        let estimate = tmg.point_estimate(EstimatorMode::ProjectedLinear).unwrap();
        assert!(estimate.is_cptp(1e-5));
        let fidelity = estimate.fidelity(&Channel::identity(1)).unwrap();
        assert!(fidelity > 0.9, "process fidelity {fidelity}");
    }

    #[test]
    fn raw_choi_estimate_has_near_unit_trace() {
        let mut tmg = ProcessTomograph::with_proj_set(Channel::depolarizing(1, 0.5))
            .unwrap()
            .with_seed(7);
        tmg.experiment(3000, MeasurementDesign::pauli_projective(1))
            .unwrap();
        let raw = tmg.point_estimate(EstimatorMode::LinearInversion).unwrap();
        let trace = raw.choi().trace();
        assert!((trace.re - 1.0).abs() < 0.1, "choi trace {trace}");
    }

    #[test]
    fn input_dimension_mismatch_is_rejected() {
        let bad_inputs = vec![Qobj::fully_mixed(2)];
        assert!(matches!(
            ProcessTomograph::new(Channel::identity(1), bad_inputs),
            Err(QtomError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn replayed_counts_shape_is_validated() {
        let mut tmg = ProcessTomograph::with_proj_set(Channel::identity(1))
            .unwrap()
            .with_seed(2);
        tmg.experiment(100, MeasurementDesign::pauli_projective(1))
            .unwrap();
        let wrong = OutcomeRecord::from_counts(vec![vec![50, 50]; 3]).unwrap();
        assert!(matches!(
            tmg.set_results(wrong),
            Err(QtomError::DimensionMismatch(_))
        ));
    }
}
