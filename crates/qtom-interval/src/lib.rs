#![deny(missing_docs)]
#![doc = "Interval estimators producing fidelity confidence bounds from a fitted tomograph and a target object, via five competing strategies."]

pub mod bootstrap;
pub mod config;
pub mod extremize;
pub mod holder;
pub mod mhmc;
pub mod polytope;
pub mod sugiyama;

use serde::{Deserialize, Serialize};

use qtom_core::errors::ErrorInfo;
use qtom_core::QtomError;

pub use bootstrap::BootstrapInterval;
pub use config::{BootstrapConfig, MhmcConfig};
pub use holder::HolderInterval;
pub use mhmc::MhmcInterval;
pub use polytope::PolytopeInterval;
pub use sugiyama::SugiyamaInterval;

/// Common contract of the five interval strategies.
///
/// `setup` performs the one-time precomputation (resampling pool, chains,
/// region geometry) and must run before `estimate`; querying first surfaces
/// [`QtomError::NotReady`]. Reported bounds are *not* clamped to `[0, 1]`:
/// statistical and numerical noise may push them slightly outside, and
/// clamping is the reporting boundary's responsibility.
pub trait IntervalEstimator {
    /// One-time precomputation.
    fn setup(&mut self) -> Result<(), QtomError>;

    /// Fidelity bounds, one `(min, max)` pair per requested confidence level.
    fn estimate(&self, levels: &[f64]) -> Result<ConfidenceReport, QtomError>;
}

/// Fidelity bounds for a set of confidence levels plus method diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    /// Requested confidence levels, in the caller's order.
    pub levels: Vec<f64>,
    /// Lower fidelity bounds, parallel to `levels`.
    pub fidelity_min: Vec<f64>,
    /// Upper fidelity bounds, parallel to `levels`.
    pub fidelity_max: Vec<f64>,
    /// Whether the method's internal iteration budget sufficed. Sampling
    /// methods report partial results with `converged = false` instead of
    /// running unbounded.
    pub converged: bool,
    /// Method-specific diagnostics.
    pub diagnostics: IntervalDiagnostics,
}

/// Diagnostics payload, tagged by method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum IntervalDiagnostics {
    /// Parametric bootstrap.
    Bootstrap {
        /// Number of resampled replicas pooled into the quantiles.
        replicas: usize,
    },
    /// Markov chain Monte Carlo posterior sampling.
    Mhmc {
        /// Independent chains pooled.
        chains: usize,
        /// Metropolis steps per chain, including burn-in.
        steps_per_chain: usize,
        /// Posterior fidelity samples kept after burn-in and thinning.
        samples_kept: usize,
        /// Pooled acceptance rate across chains.
        acceptance_rate: f64,
        /// Gelman–Rubin potential scale reduction across chains.
        potential_scale_reduction: f64,
    },
    /// Analytic Hölder-type bound.
    Holder {
        /// Fidelity of the point estimate to the target.
        estimate_fidelity: f64,
        /// Least singular value of the design matrix.
        least_singular_value: f64,
    },
    /// Confidence-ball extremization.
    Sugiyama {
        /// Linear fidelity surrogate at the estimator (ball center).
        center: f64,
        /// Hilbert–Schmidt norm of the traceless part of the target.
        traceless_target_norm: f64,
    },
    /// Confidence-polytope linear programming.
    Polytope {
        /// Number of slab constraints defining the polytope.
        constraint_rows: usize,
    },
}

/// Checks that every requested confidence level lies strictly inside (0, 1).
pub(crate) fn validate_levels(levels: &[f64]) -> Result<(), QtomError> {
    if levels.is_empty() {
        return Err(QtomError::Numeric(ErrorInfo::new(
            "no-levels",
            "at least one confidence level is required",
        )));
    }
    for level in levels {
        if !(level.is_finite() && *level > 0.0 && *level < 1.0) {
            return Err(QtomError::Numeric(
                ErrorInfo::new("confidence-level-range", "confidence levels must lie in (0, 1)")
                    .with_context("level", level.to_string()),
            ));
        }
    }
    Ok(())
}

/// Empirical quantile with linear interpolation over a sorted sample pool.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    if below == above {
        sorted[below]
    } else {
        let weight = position - below as f64;
        sorted[below] * (1.0 - weight) + sorted[above] * weight
    }
}

/// Two-sided quantile bounds `[α/2, 1 − α/2]` for one confidence level over a
/// sorted fidelity pool.
pub(crate) fn two_sided_bounds(sorted: &[f64], level: f64) -> (f64, f64) {
    let alpha = 1.0 - level;
    (
        quantile(sorted, alpha / 2.0),
        quantile(sorted, 1.0 - alpha / 2.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate() {
        let pool = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&pool, 0.0), 0.0);
        assert_eq!(quantile(&pool, 1.0), 4.0);
        assert!((quantile(&pool, 0.5) - 2.0).abs() < 1e-12);
        assert!((quantile(&pool, 0.625) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn levels_are_validated() {
        assert!(validate_levels(&[0.68, 0.95]).is_ok());
        assert!(validate_levels(&[]).is_err());
        assert!(validate_levels(&[0.0]).is_err());
        assert!(validate_levels(&[1.0]).is_err());
        assert!(validate_levels(&[f64::NAN]).is_err());
    }

    #[test]
    fn higher_levels_widen_two_sided_bounds() {
        let mut pool: Vec<f64> = (0..1000).map(|i| i as f64 / 1000.0).collect();
        pool.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let (lo68, hi68) = two_sided_bounds(&pool, 0.68);
        let (lo95, hi95) = two_sided_bounds(&pool, 0.95);
        assert!(hi95 - lo95 >= hi68 - lo68);
    }
}
