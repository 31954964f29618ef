//! POVM measurement designs.

use itertools::Itertools;
use nalgebra::DMatrix;
use num_complex::Complex;

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, EPS_DESIGN};
use qtom_qobj::{Complex64, Qobj};

/// An ordered collection of measurement settings, each a POVM: a list of
/// Hermitian PSD effects summing to the identity.
///
/// Validation happens once, at construction. A malformed design is a
/// configuration error ([`QtomError::InvalidDesign`]), never something
/// discovered later during an experiment.
#[derive(Debug, Clone)]
pub struct MeasurementDesign {
    settings: Vec<Vec<Qobj>>,
    dim: usize,
}

impl MeasurementDesign {
    /// Builds a design from explicit effect matrices, one list per setting.
    pub fn from_settings(settings: Vec<Vec<Qobj>>) -> Result<Self, QtomError> {
        if settings.is_empty() || settings.iter().any(|effects| effects.is_empty()) {
            return Err(QtomError::InvalidDesign(ErrorInfo::new(
                "empty-design",
                "a design needs at least one setting with at least one effect",
            )));
        }
        let dim = settings[0][0].dim();
        for (setting_index, effects) in settings.iter().enumerate() {
            let mut sum = DMatrix::<Complex64>::zeros(dim, dim);
            for (effect_index, effect) in effects.iter().enumerate() {
                if effect.dim() != dim {
                    return Err(QtomError::dimension_mismatch(
                        "effect",
                        dim,
                        effect.dim(),
                    ));
                }
                if !effect.is_hermitian(EPS_DESIGN) {
                    return Err(QtomError::InvalidDesign(
                        ErrorInfo::new("effect-not-hermitian", "effect is not Hermitian")
                            .with_context("setting", setting_index.to_string())
                            .with_context("effect", effect_index.to_string()),
                    ));
                }
                let smallest = effect.eigvalsh().first().copied().unwrap_or(0.0);
                if smallest < -EPS_DESIGN {
                    return Err(QtomError::InvalidDesign(
                        ErrorInfo::new("effect-not-psd", "effect has a negative eigenvalue")
                            .with_context("setting", setting_index.to_string())
                            .with_context("effect", effect_index.to_string())
                            .with_context("eigenvalue", format!("{smallest:e}")),
                    ));
                }
                sum += effect.matrix();
            }
            let identity = DMatrix::<Complex64>::identity(dim, dim);
            let deviation = (&sum - identity)
                .iter()
                .map(|entry| entry.norm())
                .fold(0.0_f64, f64::max);
            if deviation > EPS_DESIGN {
                return Err(QtomError::InvalidDesign(
                    ErrorInfo::new("effects-incomplete", "effects do not sum to the identity")
                        .with_context("setting", setting_index.to_string())
                        .with_context("deviation", format!("{deviation:e}"))
                        .with_hint("rescale the effects so each setting forms a POVM"),
                ));
            }
        }
        Ok(Self { settings, dim })
    }

    /// Builds a design from effect Bloch rows, one matrix of rows per setting
    /// (the JSON `povm_matrix` encoding).
    pub fn from_bloch_rows(settings: &[Vec<Vec<f64>>]) -> Result<Self, QtomError> {
        let decoded = settings
            .iter()
            .map(|rows| {
                rows.iter()
                    .map(|row| Qobj::effect_from_bloch(row))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_settings(decoded)
    }

    /// Projective Pauli design: one setting per basis assignment in
    /// `{X, Y, Z}^n`, each with `2^n` rank-one projector outcomes.
    pub fn pauli_projective(n_qubits: usize) -> Self {
        let r = 1.0 / 2.0_f64.sqrt();
        // Eigenvector pairs (+, −) for X, Y and Z.
        let bases: [[[Complex64; 2]; 2]; 3] = [
            [
                [Complex::new(r, 0.0), Complex::new(r, 0.0)],
                [Complex::new(r, 0.0), Complex::new(-r, 0.0)],
            ],
            [
                [Complex::new(r, 0.0), Complex::new(0.0, r)],
                [Complex::new(r, 0.0), Complex::new(0.0, -r)],
            ],
            [
                [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
                [Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)],
            ],
        ];
        let settings = (0..n_qubits)
            .map(|_| 0..3usize)
            .multi_cartesian_product()
            .map(|basis_choice| {
                (0..n_qubits)
                    .map(|_| 0..2usize)
                    .multi_cartesian_product()
                    .map(|outcome| {
                        let mut amplitudes = vec![Complex::new(1.0, 0.0)];
                        for (qubit, &bit) in outcome.iter().enumerate() {
                            let vector = &bases[basis_choice[qubit]][bit];
                            let mut next = Vec::with_capacity(amplitudes.len() * 2);
                            for amp in &amplitudes {
                                next.push(amp * vector[0]);
                                next.push(amp * vector[1]);
                            }
                            amplitudes = next;
                        }
                        Qobj::pure(&amplitudes).expect("non-zero amplitudes")
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        Self::from_settings(settings).expect("projective settings are complete POVMs")
    }

    /// Number of settings.
    pub fn n_settings(&self) -> usize {
        self.settings.len()
    }

    /// Effects of one setting.
    pub fn effects(&self, setting: usize) -> &[Qobj] {
        &self.settings[setting]
    }

    /// All settings.
    pub fn settings(&self) -> &[Vec<Qobj>] {
        &self.settings
    }

    /// System dimension the design measures.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Outcome probability distributions per setting for the given object.
    pub fn probabilities(&self, object: &Qobj) -> Result<Vec<Vec<f64>>, QtomError> {
        if object.dim() != self.dim {
            return Err(QtomError::dimension_mismatch(
                "measured object",
                self.dim,
                object.dim(),
            ));
        }
        self.settings
            .iter()
            .map(|effects| {
                effects
                    .iter()
                    .map(|effect| object.expectation(effect))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex::new(re, im)
    }

    /// Four binary settings projecting onto |0⟩, |1⟩, |+⟩ and |+i⟩, each
    /// completed by its complement.
    pub fn projector_settings() -> MeasurementDesign {
        let r = 1.0 / 2.0_f64.sqrt();
        let settings = [
            vec![c(1.0, 0.0), c(0.0, 0.0)],
            vec![c(0.0, 0.0), c(1.0, 0.0)],
            vec![c(r, 0.0), c(r, 0.0)],
            vec![c(r, 0.0), c(0.0, r)],
        ]
        .iter()
        .map(|amps| {
            let proj = Qobj::pure(amps).unwrap();
            let complement = DMatrix::<Complex64>::identity(2, 2) - proj.matrix();
            vec![proj, Qobj::from_matrix(complement).unwrap()]
        })
        .collect();
        MeasurementDesign::from_settings(settings).unwrap()
    }

    #[test]
    fn pauli_projective_is_valid_and_complete() {
        let design = MeasurementDesign::pauli_projective(1);
        assert_eq!(design.n_settings(), 3);
        assert_eq!(design.effects(0).len(), 2);
        let mixed = Qobj::fully_mixed(1);
        for probs in design.probabilities(&mixed).unwrap() {
            let total: f64 = probs.iter().sum();
            assert!((total - 1.0).abs() < 1e-12);
            for p in probs {
                assert!((p - 0.5).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn doubled_effects_are_rejected_at_construction() {
        let up = Qobj::pure(&[c(1.0, 0.0), c(0.0, 0.0)]).unwrap();
        let down = Qobj::pure(&[c(0.0, 0.0), c(1.0, 0.0)]).unwrap();
        let doubled: Vec<Qobj> = [&up, &down]
            .iter()
            .map(|q| Qobj::from_matrix(q.matrix() * Complex::new(2.0, 0.0)).unwrap())
            .collect();
        let err = MeasurementDesign::from_settings(vec![doubled]).unwrap_err();
        assert!(matches!(err, QtomError::InvalidDesign(_)));
        assert_eq!(err.info().code, "effects-incomplete");
    }

    #[test]
    fn non_psd_effects_are_rejected() {
        let z = Qobj::effect_from_bloch(&[0.5, 0.0, 0.0, 0.75]).unwrap();
        let complement = Qobj::effect_from_bloch(&[0.5, 0.0, 0.0, -0.75]).unwrap();
        let err = MeasurementDesign::from_settings(vec![vec![z, complement]]).unwrap_err();
        assert_eq!(err.info().code, "effect-not-psd");
    }

    #[test]
    fn bloch_row_decoding_round_trips() {
        let design = MeasurementDesign::pauli_projective(1);
        let rows: Vec<Vec<Vec<f64>>> = design
            .settings()
            .iter()
            .map(|effects| effects.iter().map(|e| e.effect_bloch()).collect())
            .collect();
        let decoded = MeasurementDesign::from_bloch_rows(&rows).unwrap();
        let state = Qobj::pure(&[c(0.6, 0.0), c(0.8, 0.0)]).unwrap();
        let a = design.probabilities(&state).unwrap();
        let b = decoded.probabilities(&state).unwrap();
        for (pa, pb) in a.iter().flatten().zip(b.iter().flatten()) {
            assert!((pa - pb).abs() < 1e-10);
        }
    }

    #[test]
    fn projector_settings_validate() {
        let design = projector_settings();
        assert_eq!(design.n_settings(), 4);
        assert_eq!(design.effects(0).len(), 2);
    }
}
