//! Parametric bootstrap intervals.

use rand::distributions::{Distribution, WeightedIndex};
use rayon::prelude::*;

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, RngHandle};
use qtom_est::TomographyView;
use qtom_qobj::Qobj;

use crate::config::BootstrapConfig;
use crate::{two_sided_bounds, validate_levels, ConfidenceReport, IntervalDiagnostics, IntervalEstimator};

/// Parametric bootstrap: resamples synthetic records from the point
/// estimate's predicted outcome distributions, refits each, and reads
/// empirical quantiles off the resulting fidelity pool.
///
/// Replica `r` always draws from seed substream `r`, and the pool is sorted
/// after an order-preserving collect, so the report is identical whether the
/// replicas run serially or on a worker pool.
#[derive(Debug, Clone)]
pub struct BootstrapInterval {
    view: TomographyView,
    target: Qobj,
    config: BootstrapConfig,
    fidelities: Option<Vec<f64>>,
}

impl BootstrapInterval {
    /// Builds the estimator from a fitted tomograph view and a target.
    pub fn new(
        view: TomographyView,
        target: Qobj,
        config: BootstrapConfig,
    ) -> Result<Self, QtomError> {
        if target.dim() != view.dim() {
            return Err(QtomError::dimension_mismatch(
                "target",
                view.dim(),
                target.dim(),
            ));
        }
        if config.replicas == 0 {
            return Err(QtomError::Numeric(ErrorInfo::new(
                "no-replicas",
                "bootstrap needs at least one replica",
            )));
        }
        Ok(Self {
            view,
            target,
            config,
            fidelities: None,
        })
    }

    fn resample_counts(
        predicted: &[Vec<f64>],
        shots: &[u64],
        rng: &mut RngHandle,
    ) -> Result<Vec<Vec<u64>>, QtomError> {
        predicted
            .iter()
            .zip(shots.iter())
            .enumerate()
            .map(|(setting, (distribution, setting_shots))| {
                let weights: Vec<f64> = distribution.iter().map(|p| p.max(0.0)).collect();
                let sampler = WeightedIndex::new(&weights).map_err(|err| {
                    QtomError::Numeric(
                        ErrorInfo::new("degenerate-distribution", err.to_string())
                            .with_context("setting", setting.to_string()),
                    )
                })?;
                let mut counts = vec![0u64; weights.len()];
                for _ in 0..*setting_shots {
                    counts[sampler.sample(rng)] += 1;
                }
                Ok(counts)
            })
            .collect()
    }
}

impl IntervalEstimator for BootstrapInterval {
    fn setup(&mut self) -> Result<(), QtomError> {
        let predicted = self.view.predicted(self.view.estimate())?;
        let shots: Vec<u64> = self
            .view
            .counts()
            .iter()
            .map(|setting| setting.iter().sum())
            .collect();

        let mut pool: Vec<f64> = (0..self.config.replicas)
            .into_par_iter()
            .map(|replica| {
                let mut rng = RngHandle::substream(self.config.seed, replica as u64);
                let counts = Self::resample_counts(&predicted, &shots, &mut rng)?;
                let refit = self.view.refit(&counts)?;
                self.target.fidelity(&refit)
            })
            .collect::<Result<Vec<_>, _>>()?;
        pool.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        self.fidelities = Some(pool);
        Ok(())
    }

    fn estimate(&self, levels: &[f64]) -> Result<ConfidenceReport, QtomError> {
        let pool = self
            .fidelities
            .as_ref()
            .ok_or_else(|| QtomError::not_ready("bootstrap"))?;
        validate_levels(levels)?;
        let mut fidelity_min = Vec::with_capacity(levels.len());
        let mut fidelity_max = Vec::with_capacity(levels.len());
        for level in levels {
            let (lo, hi) = two_sided_bounds(pool, *level);
            fidelity_min.push(lo);
            fidelity_max.push(hi);
        }
        Ok(ConfidenceReport {
            levels: levels.to_vec(),
            fidelity_min,
            fidelity_max,
            converged: true,
            diagnostics: IntervalDiagnostics::Bootstrap {
                replicas: pool.len(),
            },
        })
    }
}
