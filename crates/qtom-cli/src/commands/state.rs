use std::error::Error;
use std::fs;

use qtom_est::{EstimatorMode, StateTomograph};
use qtom_measure::{MeasurementDesign, OutcomeRecord};
use qtom_qobj::{pauli, Qobj};

use crate::commands::{load_config, run_interval};
use crate::io::{self, OutputRecord, StateInput};
use crate::RunArgs;

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let input_bytes = fs::read(&args.input)?;
    let input: StateInput = serde_json::from_slice(&input_bytes)?;
    let config = load_config(args.config.as_deref())?;

    let settings = input.povm_matrix.into_settings();
    let bloch_len = settings
        .first()
        .and_then(|setting| setting.first())
        .map(|row| row.len())
        .unwrap_or(0);
    let n_qubits = pauli::qubits_for_bloch_len(bloch_len)
        .ok_or("povm_matrix rows must have power-of-four length")?;

    let design = MeasurementDesign::from_bloch_rows(&settings)?;
    let mut tomograph =
        StateTomograph::new(Qobj::fully_mixed(n_qubits)).with_seed(config.seed);
    tomograph.experiment(config.shots, design)?;
    tomograph.set_results(OutcomeRecord::from_counts(input.outcomes)?)?;

    let mut output = OutputRecord::envelope(&input_bytes);
    output.state = Some(
        tomograph
            .point_estimate(EstimatorMode::LinearInversion)?
            .bloch(),
    );

    if !args.no_ci {
        let target_bloch = input
            .target_state
            .as_deref()
            .ok_or("target_state is required unless --no-ci is passed")?;
        if input.conf_levels.is_empty() {
            return Err("conf_levels is required unless --no-ci is passed".into());
        }
        let target = Qobj::from_bloch(target_bloch)?;
        let view = tomograph.view(config.estimator)?;
        let report = run_interval(&config, view, target, &input.conf_levels)?;
        output.method = Some(config.method.as_str().to_string());
        output.fidelity_min = Some(io::clamp_unit(&report.fidelity_min));
        output.fidelity_max = Some(io::clamp_unit(&report.fidelity_max));
        output.converged = Some(report.converged);
    }

    match &args.output {
        Some(path) => io::write_output(path, &output),
        None => io::print_output(&output),
    }
}
