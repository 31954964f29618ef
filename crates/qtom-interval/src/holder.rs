//! Analytic Hölder-type fidelity bounds.

use nalgebra::{DMatrix, SVD};

use qtom_core::errors::ErrorInfo;
use qtom_core::QtomError;
use qtom_est::TomographyView;
use qtom_qobj::Qobj;

use crate::{validate_levels, ConfidenceReport, IntervalDiagnostics, IntervalEstimator};

/// Deterministic, sampling-free interval from the Hölder inequality
/// `|tr(σ ρ̂) − tr(σ ρ)| ≤ ‖σ‖_∞ ‖ρ̂ − ρ‖₁`.
///
/// The trace-norm deviation of the linear-inversion estimator is bounded by a
/// union-bound Hoeffding concentration: each design row's frequency deviates
/// from its probability by at most `√(ln(2m/α) / 2N_k)` simultaneously with
/// probability `1 − α`, the deviation is pushed through the design
/// pseudo-inverse via its least singular value, and `‖·‖₁ ≤ √d ‖·‖_HS`
/// converts to trace norm (in Bloch coordinates the two `√d` factors cancel).
/// The loosest of the five methods, and the only one with no dependence on
/// the data beyond the point estimate.
#[derive(Debug, Clone)]
pub struct HolderInterval {
    view: TomographyView,
    target: Qobj,
    prepared: Option<HolderSetup>,
}

#[derive(Debug, Clone)]
struct HolderSetup {
    estimate_fidelity: f64,
    least_singular_value: f64,
    target_sup_norm: f64,
    inverse_double_shots: Vec<f64>,
}

impl HolderInterval {
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

    /// Least singular value of the stacked effect-Bloch design matrix.
    pub(crate) fn design_least_singular_value(view: &TomographyView) -> Result<f64, QtomError> {
        let rows = view.rows();
        let n_params = rows[0].len();
        if rows.len() < n_params {
            return Err(QtomError::Numeric(
                ErrorInfo::new("design-incomplete", "fewer design rows than parameters")
                    .with_context("rows", rows.len().to_string())
                    .with_context("parameters", n_params.to_string())
                    .with_hint("analytic bounds need an informationally complete design"),
            ));
        }
        let matrix = DMatrix::from_fn(rows.len(), n_params, |r, c| rows[r][c]);
        let singular_values = SVD::new(matrix, false, false).singular_values;
        let smallest = singular_values
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if !(smallest.is_finite() && smallest > 1e-10) {
            return Err(QtomError::Numeric(
                ErrorInfo::new("design-singular", "design matrix is numerically singular")
                    .with_context("sigma_min", format!("{smallest:e}")),
            ));
        }
        Ok(smallest)
    }
}

impl IntervalEstimator for HolderInterval {
    fn setup(&mut self) -> Result<(), QtomError> {
        let estimate_fidelity = self.target.fidelity(self.view.estimate())?;
        let least_singular_value = Self::design_least_singular_value(&self.view)?;
        let target_sup_norm = self
            .target
            .eigvalsh()
            .into_iter()
            .map(f64::abs)
            .fold(0.0, f64::max);
        let inverse_double_shots = self
            .view
            .shots_per_row()
            .into_iter()
            .map(|shots| 1.0 / (2.0 * shots as f64))
            .collect();
        self.prepared = Some(HolderSetup {
            estimate_fidelity,
            least_singular_value,
            target_sup_norm,
            inverse_double_shots,
        });
        Ok(())
    }

    fn estimate(&self, levels: &[f64]) -> Result<ConfidenceReport, QtomError> {
        let setup = self
            .prepared
            .as_ref()
            .ok_or_else(|| QtomError::not_ready("holder"))?;
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
            let half_width =
                setup.target_sup_norm * frequency_error / setup.least_singular_value;
            fidelity_min.push(setup.estimate_fidelity - half_width);
            fidelity_max.push(setup.estimate_fidelity + half_width);
        }
        Ok(ConfidenceReport {
            levels: levels.to_vec(),
            fidelity_min,
            fidelity_max,
            converged: true,
            diagnostics: IntervalDiagnostics::Holder {
                estimate_fidelity: setup.estimate_fidelity,
                least_singular_value: setup.least_singular_value,
            },
        })
    }
}
