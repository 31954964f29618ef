//! Metropolis–Hastings Monte Carlo credible intervals.

use nalgebra::{Cholesky, DMatrix};
use num_complex::Complex;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, RngHandle};
use qtom_est::{estimator, TomographyView};
use qtom_qobj::{CMatrix, Complex64, Qobj};

use crate::config::MhmcConfig;
use crate::{two_sided_bounds, validate_levels, ConfidenceReport, IntervalDiagnostics, IntervalEstimator};

/// Posterior sampler over physical objects with stationary distribution
/// proportional to the multinomial likelihood of the observed record.
///
/// States are parameterized by a complex lower-triangular factor `T` with
/// `ρ = T T† / tr(T T†)`, which is PSD and unit-trace by construction, so
/// proposals never need projecting back onto the physical set. A Gaussian
/// random walk in the factor coordinates is accepted or rejected on the
/// log-likelihood ratio. Chains are independent, seeded per substream, and
/// pooled in chain order; the step budget is hard and exhausting it reports
/// partial results with `converged = false` instead of hanging.
#[derive(Debug, Clone)]
pub struct MhmcInterval {
    view: TomographyView,
    target: Qobj,
    config: MhmcConfig,
    pool: Option<Vec<f64>>,
    acceptance_rate: f64,
    potential_scale_reduction: f64,
    converged: bool,
}

struct ChainOutput {
    fidelities: Vec<f64>,
    accepted: usize,
}

impl MhmcInterval {
    /// Builds the estimator from a fitted tomograph view and a target.
    pub fn new(view: TomographyView, target: Qobj, config: MhmcConfig) -> Result<Self, QtomError> {
        if target.dim() != view.dim() {
            return Err(QtomError::dimension_mismatch(
                "target",
                view.dim(),
                target.dim(),
            ));
        }
        if config.chains == 0 || config.thinning == 0 || config.steps <= config.burn_in {
            return Err(QtomError::Numeric(
                ErrorInfo::new("mhmc-config", "need chains ≥ 1, thinning ≥ 1 and steps > burn_in")
                    .with_context("chains", config.chains.to_string())
                    .with_context("steps", config.steps.to_string())
                    .with_context("burn_in", config.burn_in.to_string()),
            ));
        }
        Ok(Self {
            view,
            target,
            config,
            pool: None,
            acceptance_rate: 0.0,
            potential_scale_reduction: 1.0,
            converged: false,
        })
    }

    /// Number of real parameters of the Cholesky factor for dimension `dim`.
    fn n_params(dim: usize) -> usize {
        dim * dim
    }

    fn factor_from_params(params: &[f64], dim: usize) -> CMatrix {
        let mut factor = DMatrix::zeros(dim, dim);
        for (i, value) in params.iter().take(dim).enumerate() {
            factor[(i, i)] = Complex::new(*value, 0.0);
        }
        let mut cursor = dim;
        for i in 1..dim {
            for j in 0..i {
                factor[(i, j)] = Complex::new(params[cursor], params[cursor + 1]);
                cursor += 2;
            }
        }
        factor
    }

    fn params_from_factor(factor: &CMatrix, dim: usize) -> Vec<f64> {
        let mut params = Vec::with_capacity(Self::n_params(dim));
        for i in 0..dim {
            params.push(factor[(i, i)].re);
        }
        for i in 1..dim {
            for j in 0..i {
                params.push(factor[(i, j)].re);
                params.push(factor[(i, j)].im);
            }
        }
        params
    }

    fn state_from_params(params: &[f64], dim: usize) -> Option<Qobj> {
        let factor = Self::factor_from_params(params, dim);
        let norm: f64 = factor.iter().map(|entry| entry.norm_sqr()).sum();
        if norm <= 1e-300 {
            return None;
        }
        let gram = &factor * factor.adjoint();
        Qobj::from_matrix(gram / Complex64::new(norm, 0.0)).ok()
    }

    fn initial_params(&self) -> Result<Vec<f64>, QtomError> {
        let dim = self.view.dim();
        // Start from the physical projection of the point estimate, ridged so
        // the Cholesky factor exists.
        let projected = estimator::project_to_state(self.view.estimate())?;
        let ridge = 1e-6;
        let scale = Complex::new(1.0 / (1.0 + ridge * dim as f64), 0.0);
        let ridged = (projected.matrix()
            + DMatrix::<Complex64>::identity(dim, dim) * Complex::new(ridge, 0.0))
            * scale;
        match Cholesky::new(ridged) {
            Some(decomposition) => Ok(Self::params_from_factor(&decomposition.l(), dim)),
            None => {
                // Maximally mixed fallback.
                let factor = DMatrix::<Complex64>::identity(dim, dim)
                    * Complex::new(1.0 / (dim as f64).sqrt(), 0.0);
                Ok(Self::params_from_factor(&factor, dim))
            }
        }
    }

    fn run_chain(&self, chain: usize, init: &[f64]) -> Result<ChainOutput, QtomError> {
        let dim = self.view.dim();
        let mut rng = RngHandle::substream(self.config.seed, chain as u64);
        let mut params = init.to_vec();
        let mut state = Self::state_from_params(&params, dim).ok_or_else(|| {
            QtomError::Numeric(ErrorInfo::new(
                "mhmc-init",
                "initial Cholesky factor is degenerate",
            ))
        })?;
        let mut log_likelihood = self.view.log_likelihood(&state)?;
        let mut accepted = 0usize;
        let mut fidelities = Vec::new();

        for step in 0..self.config.steps {
            let proposal: Vec<f64> = params
                .iter()
                .map(|value| {
                    let draw: f64 = StandardNormal.sample(&mut rng);
                    value + self.config.step_size * draw
                })
                .collect();
            if let Some(candidate) = Self::state_from_params(&proposal, dim) {
                let candidate_log_likelihood = self.view.log_likelihood(&candidate)?;
                let acceptance = (candidate_log_likelihood - log_likelihood).exp().min(1.0);
                if rng.unit_f64() < acceptance {
                    params = proposal;
                    state = candidate;
                    log_likelihood = candidate_log_likelihood;
                    accepted += 1;
                }
            }
            if step >= self.config.burn_in && (step - self.config.burn_in) % self.config.thinning == 0
            {
                fidelities.push(self.target.fidelity(&state)?);
            }
        }
        Ok(ChainOutput {
            fidelities,
            accepted,
        })
    }

    /// Gelman–Rubin potential scale reduction over per-chain fidelity traces.
    fn scale_reduction(chains: &[ChainOutput]) -> f64 {
        if chains.len() < 2 {
            return 1.0;
        }
        let n = chains
            .iter()
            .map(|chain| chain.fidelities.len())
            .min()
            .unwrap_or(0);
        if n < 2 {
            return 1.0;
        }
        let means: Vec<f64> = chains
            .iter()
            .map(|chain| chain.fidelities[..n].iter().sum::<f64>() / n as f64)
            .collect();
        let within: f64 = chains
            .iter()
            .zip(means.iter())
            .map(|(chain, mean)| {
                chain.fidelities[..n]
                    .iter()
                    .map(|value| (value - mean) * (value - mean))
                    .sum::<f64>()
                    / (n - 1) as f64
            })
            .sum::<f64>()
            / chains.len() as f64;
        let grand = means.iter().sum::<f64>() / means.len() as f64;
        let between = means
            .iter()
            .map(|mean| (mean - grand) * (mean - grand))
            .sum::<f64>()
            / (means.len() - 1) as f64
            * n as f64;
        if within <= 1e-300 {
            return 1.0;
        }
        let pooled = ((n - 1) as f64 * within + between) / n as f64;
        (pooled / within).sqrt()
    }
}

impl IntervalEstimator for MhmcInterval {
    fn setup(&mut self) -> Result<(), QtomError> {
        let init = self.initial_params()?;
        let outputs: Vec<ChainOutput> = (0..self.config.chains)
            .into_par_iter()
            .map(|chain| self.run_chain(chain, &init))
            .collect::<Result<Vec<_>, _>>()?;

        let total_steps = self.config.chains * self.config.steps;
        let total_accepted: usize = outputs.iter().map(|chain| chain.accepted).sum();
        self.acceptance_rate = total_accepted as f64 / total_steps as f64;
        self.potential_scale_reduction = Self::scale_reduction(&outputs);

        let mut pool: Vec<f64> = outputs
            .iter()
            .flat_map(|chain| chain.fidelities.iter().copied())
            .collect();
        pool.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        self.converged = !pool.is_empty()
            && self.potential_scale_reduction < 1.2
            && self.acceptance_rate > 0.05
            && self.acceptance_rate < 0.95;
        self.pool = Some(pool);
        Ok(())
    }

    fn estimate(&self, levels: &[f64]) -> Result<ConfidenceReport, QtomError> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| QtomError::not_ready("mhmc"))?;
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
            converged: self.converged,
            diagnostics: IntervalDiagnostics::Mhmc {
                chains: self.config.chains,
                steps_per_chain: self.config.steps,
                samples_kept: pool.len(),
                acceptance_rate: self.acceptance_rate,
                potential_scale_reduction: self.potential_scale_reduction,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_round_trips_through_params() {
        let mut factor = DMatrix::<Complex64>::zeros(3, 3);
        factor[(0, 0)] = Complex::new(0.7, 0.0);
        factor[(1, 1)] = Complex::new(0.4, 0.0);
        factor[(2, 2)] = Complex::new(0.2, 0.0);
        factor[(1, 0)] = Complex::new(0.1, -0.3);
        factor[(2, 1)] = Complex::new(-0.2, 0.05);
        let params = MhmcInterval::params_from_factor(&factor, 3);
        assert_eq!(params.len(), 9);
        let back = MhmcInterval::factor_from_params(&params, 3);
        assert_eq!(factor, back);
    }

    #[test]
    fn parameterized_states_are_physical() {
        let params = [0.9, -0.2, 0.3, 0.4];
        let state = MhmcInterval::state_from_params(&params, 2).unwrap();
        assert!(state.is_physical_state(1e-12, 1e-12));
    }
}
