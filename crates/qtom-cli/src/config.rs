//! YAML-configurable run parameters.

use serde::{Deserialize, Serialize};

use qtom_est::EstimatorMode;
use qtom_interval::{BootstrapConfig, MhmcConfig};

/// Interval strategy selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalMethod {
    /// Parametric bootstrap resampling.
    Bootstrap,
    /// Markov chain Monte Carlo credible intervals.
    Mhmc,
    /// Analytic Hölder-type bound.
    Holder,
    /// Confidence-ball extremization.
    Sugiyama,
    /// Confidence-polytope linear programming.
    Polytope,
}

impl IntervalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalMethod::Bootstrap => "bootstrap",
            IntervalMethod::Mhmc => "mhmc",
            IntervalMethod::Holder => "holder",
            IntervalMethod::Sugiyama => "sugiyama",
            IntervalMethod::Polytope => "polytope",
        }
    }
}

/// Run configuration loaded from the optional `--config` YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Interval method; the polytope LP is the default.
    #[serde(default = "default_method")]
    pub method: IntervalMethod,
    /// Estimator mode used when fitting the view for interval estimation.
    #[serde(default = "default_estimator")]
    pub estimator: EstimatorMode,
    /// Simulated shots per setting for the placeholder experiment that binds
    /// the design before recorded counts are injected.
    #[serde(default = "default_shots")]
    pub shots: u64,
    /// Master seed for the tomograph.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Bootstrap parameters.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// MHMC parameters.
    #[serde(default)]
    pub mhmc: MhmcConfig,
}

fn default_method() -> IntervalMethod {
    IntervalMethod::Polytope
}

fn default_estimator() -> EstimatorMode {
    EstimatorMode::ProjectedLinear
}

fn default_shots() -> u64 {
    1000
}

fn default_seed() -> u64 {
    qtom_est::DEFAULT_SEED
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            estimator: default_estimator(),
            shots: default_shots(),
            seed: default_seed(),
            bootstrap: BootstrapConfig::default(),
            mhmc: MhmcConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config: RunConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.method, IntervalMethod::Polytope);
        assert_eq!(config.shots, 1000);
    }

    #[test]
    fn method_names_are_kebab_case() {
        let config: RunConfig = serde_yaml::from_str("method: mhmc\nshots: 250\n").unwrap();
        assert_eq!(config.method, IntervalMethod::Mhmc);
        assert_eq!(config.shots, 250);
    }
}
