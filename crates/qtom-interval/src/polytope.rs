//! Confidence-polytope intervals via linear programming.

use qtom_core::QtomError;
use qtom_est::TomographyView;
use qtom_qobj::Qobj;

use crate::extremize::{extremize, LinearConstraint, Sense};
use crate::{validate_levels, ConfidenceReport, IntervalDiagnostics, IntervalEstimator};

/// Confidence polytope in Bloch coordinates, extremized by the shared LP
/// primitive.
///
/// Every design row contributes a slab `|a_k · b − f_k| ≤ δ_k(α)` with a
/// union-bound Hoeffding half-width, joined by the trace normalization
/// `b_0 = 1` and the Bloch box `|b_i| ≤ 1` (the standard linear outer
/// relaxation of positivity). The fidelity surrogate `tr(σ ρ) = c · b` is
/// linear, so both bounds are exact LP solves over the region. `setup` builds
/// the level-independent geometry once; `estimate` re-solves per level since
/// the slab widths depend on it. An empty region (tight bounds, inconsistent
/// data) surfaces as [`QtomError::InfeasibleRegion`].
#[derive(Debug, Clone)]
pub struct PolytopeInterval {
    view: TomographyView,
    target: Qobj,
    geometry: Option<Geometry>,
}

#[derive(Debug, Clone)]
struct Geometry {
    rows: Vec<Vec<f64>>,
    frequencies: Vec<f64>,
    inverse_double_shots: Vec<f64>,
    objective: Vec<f64>,
    n_params: usize,
}

impl PolytopeInterval {
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
            geometry: None,
        })
    }
}

impl IntervalEstimator for PolytopeInterval {
    fn setup(&mut self) -> Result<(), QtomError> {
        let rows: Vec<Vec<f64>> = self.view.rows().to_vec();
        let n_params = rows[0].len();
        let frequencies = self.view.frequencies();
        let inverse_double_shots = self
            .view
            .shots_per_row()
            .into_iter()
            .map(|shots| 1.0 / (2.0 * shots as f64))
            .collect();
        let objective = self.target.effect_bloch();
        self.geometry = Some(Geometry {
            rows,
            frequencies,
            inverse_double_shots,
            objective,
            n_params,
        });
        Ok(())
    }

    fn estimate(&self, levels: &[f64]) -> Result<ConfidenceReport, QtomError> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| QtomError::not_ready("polytope"))?;
        validate_levels(levels)?;
        let n_rows = geometry.rows.len() as f64;
        let mut fidelity_min = Vec::with_capacity(levels.len());
        let mut fidelity_max = Vec::with_capacity(levels.len());
        for level in levels {
            let alpha = 1.0 - level;
            let log_term = (2.0 * n_rows / alpha).ln();
            let mut constraints = Vec::with_capacity(geometry.rows.len() + geometry.n_params);
            for ((row, frequency), inverse) in geometry
                .rows
                .iter()
                .zip(geometry.frequencies.iter())
                .zip(geometry.inverse_double_shots.iter())
            {
                let half_width = (inverse * log_term).sqrt();
                constraints.push(LinearConstraint {
                    coeffs: row.clone(),
                    lower: frequency - half_width,
                    upper: frequency + half_width,
                });
            }
            // Trace normalization and the Bloch box.
            for index in 0..geometry.n_params {
                let mut unit = vec![0.0; geometry.n_params];
                unit[index] = 1.0;
                let (lower, upper) = if index == 0 { (1.0, 1.0) } else { (-1.0, 1.0) };
                constraints.push(LinearConstraint {
                    coeffs: unit,
                    lower,
                    upper,
                });
            }
            fidelity_min.push(extremize(&constraints, &geometry.objective, Sense::Minimize)?);
            fidelity_max.push(extremize(&constraints, &geometry.objective, Sense::Maximize)?);
        }
        Ok(ConfidenceReport {
            levels: levels.to_vec(),
            fidelity_min,
            fidelity_max,
            converged: true,
            diagnostics: IntervalDiagnostics::Polytope {
                constraint_rows: geometry.rows.len(),
            },
        })
    }
}
