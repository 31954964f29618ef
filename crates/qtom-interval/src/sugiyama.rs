//! Confidence-ball intervals in Hilbert–Schmidt norm.

use qtom_core::QtomError;
use qtom_est::TomographyView;
use qtom_qobj::Qobj;

use crate::holder::HolderInterval;
use crate::{validate_levels, ConfidenceReport, IntervalDiagnostics, IntervalEstimator};

/// Confidence ball around the raw estimator, extremized in closed form.
///
/// The region is a Hilbert–Schmidt ball centered on the estimator whose
/// radius comes from the same per-row Hoeffding concentration as the Hölder
/// method, but calibrated to the design: the frequency deviation is mapped
/// through the least singular value and kept in Hilbert–Schmidt geometry
/// (`‖Δρ‖_HS = ‖Δb‖₂ / √d` in Bloch coordinates) instead of being relaxed to
/// trace norm. Over that ball the linear fidelity surrogate `tr(σ ρ)` moves
/// at most `r · ‖σ − (tr σ / d) I‖_HS`, since the trace component of the
/// deviation is fixed; both bounds are closed-form. Deterministic given the
/// data, and never looser than the Hölder interval.
#[derive(Debug, Clone)]
pub struct SugiyamaInterval {
    view: TomographyView,
    target: Qobj,
    prepared: Option<SugiyamaSetup>,
}

#[derive(Debug, Clone)]
struct SugiyamaSetup {
    center: f64,
    least_singular_value: f64,
    traceless_target_norm: f64,
    inverse_double_shots: Vec<f64>,
    dim: usize,
}

impl SugiyamaInterval {
    /// Builds the estimator from a fitted tomograph view and a target.
    pub fn new(view: TomographyView, target: Qobj) -> Result<Self, QtomError> {
        if target.dim() != view.dim() {
            return Err(QtomError::dimension_mismatch(
                "target",
                view.dim(),
                target.dim(),
            ));
        }
        Ok(Self {
            view,
            target,
            prepared: None,
        })
    }
}

impl IntervalEstimator for SugiyamaInterval {
    fn setup(&mut self) -> Result<(), QtomError> {
        let center = self.view.estimate().expectation(&self.target)?;
        let least_singular_value = HolderInterval::design_least_singular_value(&self.view)?;
        let dim = self.view.dim();
        // ‖σ − (tr σ / d) I‖_HS from the target spectrum.
        let eigenvalues = self.target.eigvalsh();
        let mean = eigenvalues.iter().sum::<f64>() / dim as f64;
        let traceless_target_norm = eigenvalues
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            .sqrt();
        let inverse_double_shots = self
            .view
            .shots_per_row()
            .into_iter()
            .map(|shots| 1.0 / (2.0 * shots as f64))
            .collect();
        self.prepared = Some(SugiyamaSetup {
            center,
            least_singular_value,
            traceless_target_norm,
            inverse_double_shots,
            dim,
        });
        Ok(())
    }

    fn estimate(&self, levels: &[f64]) -> Result<ConfidenceReport, QtomError> {
        let setup = self
            .prepared
            .as_ref()
            .ok_or_else(|| QtomError::not_ready("sugiyama"))?;
        validate_levels(levels)?;
        let n_rows = setup.inverse_double_shots.len() as f64;
        let mut fidelity_min = Vec::with_capacity(levels.len());
        let mut fidelity_max = Vec::with_capacity(levels.len());
        for level in levels {
            let alpha = 1.0 - level;
            let log_term = (2.0 * n_rows / alpha).ln();
            let frequency_error: f64 = setup
                .inverse_double_shots
                .iter()
                .map(|inverse| inverse * log_term)
                .sum::<f64>()
                .sqrt();
            let radius = frequency_error
                / setup.least_singular_value
                / (setup.dim as f64).sqrt();
            let half_width = radius * setup.traceless_target_norm;
            fidelity_min.push(setup.center - half_width);
            fidelity_max.push(setup.center + half_width);
        }
        Ok(ConfidenceReport {
            levels: levels.to_vec(),
            fidelity_min,
            fidelity_max,
            converged: true,
            diagnostics: IntervalDiagnostics::Sugiyama {
                center: setup.center,
                traceless_target_norm: setup.traceless_target_norm,
            },
        })
    }
}
