pub mod process;
pub mod state;

use std::error::Error;
use std::fs;
use std::path::Path;

use qtom_est::TomographyView;
use qtom_interval::{
    BootstrapInterval, ConfidenceReport, HolderInterval, IntervalEstimator, MhmcInterval,
    PolytopeInterval, SugiyamaInterval,
};
use qtom_qobj::Qobj;

use crate::config::{IntervalMethod, RunConfig};

/// Loads the optional YAML run configuration, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&text)?)
        }
        None => Ok(RunConfig::default()),
    }
}

/// Runs the configured interval method over a fitted view and target.
pub fn run_interval(
    config: &RunConfig,
    view: TomographyView,
    target: Qobj,
    levels: &[f64],
) -> Result<ConfidenceReport, Box<dyn Error>> {
    let report = match config.method {
        IntervalMethod::Bootstrap => {
            let mut interval = BootstrapInterval::new(view, target, config.bootstrap.clone())?;
            interval.setup()?;
            interval.estimate(levels)?
        }
        IntervalMethod::Mhmc => {
            let mut interval = MhmcInterval::new(view, target, config.mhmc.clone())?;
            interval.setup()?;
            interval.estimate(levels)?
        }
        IntervalMethod::Holder => {
            let mut interval = HolderInterval::new(view, target)?;
            interval.setup()?;
            interval.estimate(levels)?
        }
        IntervalMethod::Sugiyama => {
            let mut interval = SugiyamaInterval::new(view, target)?;
            interval.setup()?;
            interval.estimate(levels)?
        }
        IntervalMethod::Polytope => {
            let mut interval = PolytopeInterval::new(view, target)?;
            interval.setup()?;
            interval.estimate(levels)?
        }
    };
    Ok(report)
}
