//! Immutable snapshot of a fitted tomograph consumed by interval estimators.

use serde::{Deserialize, Serialize};

use qtom_core::QtomError;
use qtom_qobj::Qobj;

use crate::estimator::{self, EstimatorMode};

/// Which physical set a refit projects onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Density matrices: PSD, unit trace.
    State,
    /// Normalized Choi states of channels on a system of the given
    /// dimension: PSD, trace-preserving.
    Process(usize),
}

/// Snapshot of a fitted tomograph: effective effects, counts, the point
/// estimate, and enough structure to re-estimate from resampled counts.
///
/// For state tomography the effects are the design's POVM elements. For
/// process tomography they are the lifted operators `d · (ρ_jᵀ ⊗ E_k)` acting
/// on the normalized Choi state, so the same linear model serves both cases.
/// Views are cheap-to-clone immutable data; interval estimators may share one
/// tomograph's view concurrently without coordination.
#[derive(Debug, Clone)]
pub struct TomographyView {
    effects: Vec<Vec<Qobj>>,
    counts: Vec<Vec<u64>>,
    rows: Vec<Vec<f64>>,
    row_setting: Vec<usize>,
    mode: EstimatorMode,
    kind: ObjectKind,
    estimate: Qobj,
}

impl TomographyView {
    /// Builds a view and computes its point estimate with the given mode.
    pub fn new(
        effects: Vec<Vec<Qobj>>,
        counts: Vec<Vec<u64>>,
        mode: EstimatorMode,
        kind: ObjectKind,
    ) -> Result<Self, QtomError> {
        if effects.len() != counts.len() || effects.is_empty() {
            return Err(QtomError::dimension_mismatch(
                "view settings",
                effects.len(),
                counts.len(),
            ));
        }
        for (setting, (setting_effects, setting_counts)) in
            effects.iter().zip(counts.iter()).enumerate()
        {
            if setting_effects.len() != setting_counts.len() {
                return Err(QtomError::dimension_mismatch(
                    &format!("view outcomes in setting {setting}"),
                    setting_effects.len(),
                    setting_counts.len(),
                ));
            }
        }
        let mut rows = Vec::new();
        let mut row_setting = Vec::new();
        for (setting, setting_effects) in effects.iter().enumerate() {
            for effect in setting_effects {
                rows.push(effect.effect_bloch());
                row_setting.push(setting);
            }
        }
        let estimate = fit(&rows, &effects, &counts, mode, kind)?;
        Ok(Self {
            effects,
            counts,
            rows,
            row_setting,
            mode,
            kind,
            estimate,
        })
    }

    /// Effect Bloch rows, flattened over settings and outcomes.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Setting index of each flattened row.
    pub fn row_setting(&self) -> &[usize] {
        &self.row_setting
    }

    /// Observed frequencies, flattened in row order.
    pub fn frequencies(&self) -> Vec<f64> {
        self.counts
            .iter()
            .flat_map(|setting| {
                let total: u64 = setting.iter().sum();
                setting
                    .iter()
                    .map(move |count| *count as f64 / total as f64)
            })
            .collect()
    }

    /// Total shots of the setting each flattened row belongs to.
    pub fn shots_per_row(&self) -> Vec<u64> {
        self.row_setting
            .iter()
            .map(|setting| self.counts[*setting].iter().sum())
            .collect()
    }

    /// Raw counts per setting.
    pub fn counts(&self) -> &[Vec<u64>] {
        &self.counts
    }

    /// Effective effects per setting.
    pub fn effects(&self) -> &[Vec<Qobj>] {
        &self.effects
    }

    /// Estimation mode the view was fitted with.
    pub fn mode(&self) -> EstimatorMode {
        self.mode
    }

    /// Physical set refits project onto.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Point estimate of the view's own counts.
    pub fn estimate(&self) -> &Qobj {
        &self.estimate
    }

    /// Matrix dimension of the estimated object.
    pub fn dim(&self) -> usize {
        self.estimate.dim()
    }

    /// Outcome probabilities per setting predicted by an object.
    pub fn predicted(&self, object: &Qobj) -> Result<Vec<Vec<f64>>, QtomError> {
        self.effects
            .iter()
            .map(|setting_effects| {
                setting_effects
                    .iter()
                    .map(|effect| object.expectation(effect))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }

    /// Multinomial log-likelihood of an object against the observed counts.
    pub fn log_likelihood(&self, object: &Qobj) -> Result<f64, QtomError> {
        let predicted = self.predicted(object)?;
        let mut total = 0.0;
        for (setting_counts, setting_probs) in self.counts.iter().zip(predicted.iter()) {
            for (count, probability) in setting_counts.iter().zip(setting_probs.iter()) {
                if *count > 0 {
                    total += *count as f64 * probability.max(1e-300).ln();
                }
            }
        }
        Ok(total)
    }

    /// Re-estimates from replacement counts with the view's own mode.
    pub fn refit(&self, counts: &[Vec<u64>]) -> Result<Qobj, QtomError> {
        fit(&self.rows, &self.effects, counts, self.mode, self.kind)
    }
}

fn fit(
    rows: &[Vec<f64>],
    effects: &[Vec<Qobj>],
    counts: &[Vec<u64>],
    mode: EstimatorMode,
    kind: ObjectKind,
) -> Result<Qobj, QtomError> {
    let frequencies: Vec<f64> = counts
        .iter()
        .flat_map(|setting| {
            let total: u64 = setting.iter().sum();
            setting
                .iter()
                .map(move |count| *count as f64 / total.max(1) as f64)
        })
        .collect();
    let bloch = estimator::linear_inversion(rows, &frequencies)?;
    let raw = Qobj::from_bloch(&bloch)?;
    match (mode, kind) {
        (EstimatorMode::LinearInversion, _) => Ok(raw),
        (EstimatorMode::ProjectedLinear, ObjectKind::State) => estimator::project_to_state(&raw),
        (EstimatorMode::MaxLikelihood, ObjectKind::State) => {
            let flat_effects: Vec<Qobj> = effects
                .iter()
                .flat_map(|setting| setting.iter().cloned())
                .collect();
            let flat_counts: Vec<u64> = counts
                .iter()
                .flat_map(|setting| setting.iter().copied())
                .collect();
            estimator::mle_fixed_point(
                &flat_effects,
                &flat_counts,
                raw.dim(),
                estimator::default_tolerance(),
            )
        }
        // The closest-CPTP projection serves as the constrained criterion for
        // processes under both physical modes.
        (_, ObjectKind::Process(dim)) => {
            estimator::project_to_cptp(&raw, dim, estimator::default_tolerance())
        }
    }
}
