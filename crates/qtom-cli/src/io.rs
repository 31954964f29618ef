//! Input and output records for the JSON interface.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Input record for state tomography.
#[derive(Debug, Clone, Deserialize)]
pub struct StateInput {
    /// Outcome counts per setting.
    pub outcomes: Vec<Vec<u64>>,
    /// Effect Bloch rows, either per setting or flat (one setting).
    pub povm_matrix: PovmMatrix,
    /// Bloch vector of the fidelity target.
    #[serde(default)]
    pub target_state: Option<Vec<f64>>,
    /// Requested confidence levels.
    #[serde(default)]
    pub conf_levels: Vec<f64>,
}

/// Input record for process tomography.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessInput {
    /// Outcome counts, flattened as input states × design settings.
    pub outcomes: Vec<Vec<u64>>,
    /// Effect Bloch rows measured on the channel outputs.
    pub povm_matrix: PovmMatrix,
    /// Bloch vectors of the prepared input states.
    pub input_states: Vec<Vec<f64>>,
    /// Choi Bloch vector of the fidelity target.
    #[serde(default)]
    pub target_process: Option<Vec<f64>>,
    /// Requested confidence levels.
    #[serde(default)]
    pub conf_levels: Vec<f64>,
}

/// The `povm_matrix` field accepts both a flat list of rows (one setting)
/// and a nested per-setting layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PovmMatrix {
    /// Settings × outcomes × Bloch coordinates.
    Settings(Vec<Vec<Vec<f64>>>),
    /// Outcomes × Bloch coordinates, a single setting.
    Flat(Vec<Vec<f64>>),
}

impl PovmMatrix {
    /// Normalizes to the per-setting layout.
    pub fn into_settings(self) -> Vec<Vec<Vec<f64>>> {
        match self {
            PovmMatrix::Settings(settings) => settings,
            PovmMatrix::Flat(rows) => vec![rows],
        }
    }
}

/// Output record written for both subcommands.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    /// Output schema version.
    pub schema_version: u32,
    /// UTC timestamp of the run.
    pub created_utc: String,
    /// SHA-256 digest of the input file.
    pub input_digest: String,
    /// Interval method used, when intervals were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Bloch vector of the raw state estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<f64>>,
    /// Choi Bloch vector of the raw process estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<Vec<f64>>,
    /// Lower fidelity bounds per confidence level, clamped to [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidelity_min: Option<Vec<f64>>,
    /// Upper fidelity bounds per confidence level, clamped to [0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidelity_max: Option<Vec<f64>>,
    /// Whether the interval method converged within its budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
}

impl OutputRecord {
    /// Empty envelope stamped with the input digest and current time.
    pub fn envelope(input_bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(input_bytes);
        Self {
            schema_version: 1,
            created_utc: chrono::Utc::now().to_rfc3339(),
            input_digest: hex::encode(hasher.finalize()),
            method: None,
            state: None,
            process: None,
            fidelity_min: None,
            fidelity_max: None,
            converged: None,
        }
    }
}

/// Writes the record atomically: a temporary file in the target directory is
/// persisted over the destination only after the full payload is on disk, so
/// a failing run never leaves a truncated output file.
pub fn write_output(path: &Path, record: &OutputRecord) -> Result<(), Box<dyn Error>> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent.unwrap_or_else(|| Path::new(".")))?;
    temp.write_all(json.as_bytes())?;
    temp.write_all(b"\n")?;
    temp.persist(path)?;
    Ok(())
}

/// Prints the record to standard output.
pub fn print_output(record: &OutputRecord) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Clamps reported fidelity bounds to the physical range. This is the single
/// place where clamping happens; the estimators report raw values.
pub fn clamp_unit(values: &[f64]) -> Vec<f64> {
    values.iter().map(|value| value.clamp(0.0, 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn povm_matrix_accepts_both_layouts() {
        let flat: PovmMatrix =
            serde_json::from_str("[[0.5, 0.0, 0.0, 0.5], [0.5, 0.0, 0.0, -0.5]]").unwrap();
        assert_eq!(flat.into_settings().len(), 1);
        let nested: PovmMatrix =
            serde_json::from_str("[[[0.5, 0.0, 0.0, 0.5], [0.5, 0.0, 0.0, -0.5]]]").unwrap();
        assert_eq!(nested.into_settings().len(), 1);
    }

    #[test]
    fn clamping_is_tight() {
        assert_eq!(clamp_unit(&[-0.1, 0.5, 1.2]), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn atomic_write_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let record = OutputRecord::envelope(b"payload");
        write_output(&path, &record).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert!(value["input_digest"].as_str().unwrap().len() == 64);
    }
}
