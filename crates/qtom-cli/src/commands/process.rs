use std::error::Error;
use std::fs;

use qtom_est::{EstimatorMode, ProcessTomograph};
use qtom_measure::{MeasurementDesign, OutcomeRecord};
use qtom_qobj::{pauli, Channel, Qobj};

use crate::commands::{load_config, run_interval};
use crate::io::{self, OutputRecord, ProcessInput};
use crate::RunArgs;

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let input_bytes = fs::read(&args.input)?;
    let input: ProcessInput = serde_json::from_slice(&input_bytes)?;
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
    let input_states = input
        .input_states
        .iter()
        .map(|bloch| Qobj::from_bloch(bloch))
        .collect::<Result<Vec<_>, _>>()?;

    // The reference channel only seeds the placeholder experiment; the
    // recorded counts replace its statistics entirely.
    let reference = Channel::depolarizing(n_qubits, 1.0);
    let mut tomograph =
        ProcessTomograph::new(reference, input_states)?.with_seed(config.seed);
    tomograph.experiment(config.shots, design)?;
    tomograph.set_results(OutcomeRecord::from_counts(input.outcomes)?)?;

    let mut output = OutputRecord::envelope(&input_bytes);
    output.process = Some(
        tomograph
            .point_estimate(EstimatorMode::LinearInversion)?
            .choi()
            .bloch(),
    );

    if !args.no_ci {
        let target_bloch = input
            .target_process
            .as_deref()
            .ok_or("target_process is required unless --no-ci is passed")?;
        if input.conf_levels.is_empty() {
            return Err("conf_levels is required unless --no-ci is passed".into());
        }
        let target = Channel::from_choi(Qobj::from_bloch(target_bloch)?)?;
        let view = tomograph.view(config.estimator)?;
        let report = run_interval(&config, view, target.choi().clone(), &input.conf_levels)?;
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
