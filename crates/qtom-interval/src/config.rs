//! Serde-deserializable parameters for the sampling-based interval methods.

use serde::{Deserialize, Serialize};

/// Parametric bootstrap parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of synthetic outcome records to resample and refit.
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// Master seed; replica `r` draws from substream `r`.
    #[serde(default = "default_bootstrap_seed")]
    pub seed: u64,
}

fn default_replicas() -> usize {
    1000
}

fn default_bootstrap_seed() -> u64 {
    0x05EE_DB00_7577_0001
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            seed: default_bootstrap_seed(),
        }
    }
}

/// Metropolis–Hastings Monte Carlo parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MhmcConfig {
    /// Independent chains, pooled after sampling.
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Metropolis steps per chain, including burn-in. This is the hard
    /// iteration budget; the sampler always returns when it is spent.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Initial steps discarded per chain.
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    /// Keep every `thinning`-th post-burn-in sample.
    #[serde(default = "default_thinning")]
    pub thinning: usize,
    /// Standard deviation of the Gaussian random-walk proposal in
    /// Cholesky-factor coordinates.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Master seed; chain `c` draws from substream `c`.
    #[serde(default = "default_mhmc_seed")]
    pub seed: u64,
}

fn default_chains() -> usize {
    4
}

fn default_steps() -> usize {
    2000
}

fn default_burn_in() -> usize {
    500
}

fn default_thinning() -> usize {
    5
}

fn default_step_size() -> f64 {
    0.05
}

fn default_mhmc_seed() -> u64 {
    0x05EE_DC4A_1235_0002
}

impl Default for MhmcConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            steps: default_steps(),
            burn_in: default_burn_in(),
            thinning: default_thinning(),
            step_size: default_step_size(),
            seed: default_mhmc_seed(),
        }
    }
}
