//! CPTP channels in the Choi-matrix representation.
//!
//! A channel on a `d`-dimensional system is held as its *normalized* Choi
//! state `J = (I ⊗ E)(|Ω⟩⟨Ω|)` with `|Ω⟩ = Σ_i |ii⟩ / √d`, a `d² × d²`
//! object of unit trace. The left factor is the input copy, the right factor
//! the output; trace preservation reads `tr_right(J) = I / d`.

use nalgebra::DMatrix;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use qtom_core::errors::ErrorInfo;
use qtom_core::QtomError;

use crate::qobj::Qobj;
use crate::Complex64;

/// Quantum channel represented by its normalized Choi state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    choi: Qobj,
    dim: usize,
}

impl Channel {
    /// Wraps a `d² × d²` Choi object. The object may be a raw (non-CPTP)
    /// estimate; use [`Channel::is_cptp`] to check physicality.
    pub fn from_choi(choi: Qobj) -> Result<Self, QtomError> {
        let total = choi.dim();
        let dim = (total as f64).sqrt().round() as usize;
        if dim * dim != total {
            return Err(QtomError::DimensionMismatch(
                ErrorInfo::new("choi-dimension", "Choi matrix dimension must be a perfect square")
                    .with_context("dimension", total.to_string()),
            ));
        }
        Ok(Self { choi, dim })
    }

    /// Identity channel on `n_qubits` qubits.
    pub fn identity(n_qubits: usize) -> Self {
        let dim = 1usize << n_qubits;
        let mut matrix = DMatrix::zeros(dim * dim, dim * dim);
        let weight = Complex::new(1.0 / dim as f64, 0.0);
        for i in 0..dim {
            for j in 0..dim {
                matrix[(i * dim + i, j * dim + j)] = weight;
            }
        }
        Self {
            choi: Qobj::from_matrix(matrix).expect("square by construction"),
            dim,
        }
    }

    /// Depolarizing channel `E(ρ) = (1 − p) ρ + p tr(ρ) I / d`.
    pub fn depolarizing(n_qubits: usize, p: f64) -> Self {
        let identity = Self::identity(n_qubits);
        let dim = identity.dim;
        let total = dim * dim;
        let mixed = DMatrix::identity(total, total) * Complex::new(p / total as f64, 0.0);
        let matrix = identity.choi.matrix() * Complex::new(1.0 - p, 0.0) + mixed;
        Self {
            choi: Qobj::from_matrix(matrix).expect("square by construction"),
            dim,
        }
    }

    /// Borrows the normalized Choi state.
    pub fn choi(&self) -> &Qobj {
        &self.choi
    }

    /// System dimension `d` the channel acts on.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Applies the channel: `E(ρ) = d · tr_left[(ρᵀ ⊗ I) J]`.
    pub fn apply(&self, state: &Qobj) -> Result<Qobj, QtomError> {
        if state.dim() != self.dim {
            return Err(QtomError::dimension_mismatch(
                "channel input",
                self.dim,
                state.dim(),
            ));
        }
        let eye = Qobj::from_matrix(DMatrix::identity(self.dim, self.dim))?;
        let lifted = state.transpose().tensor(&eye);
        let product = Qobj::from_matrix(lifted.matrix() * self.choi.matrix())?;
        let reduced = product.partial_trace_left(self.dim, self.dim)?;
        Qobj::from_matrix(reduced.matrix() * Complex::new(self.dim as f64, 0.0))
    }

    /// Process fidelity: Uhlmann fidelity between the normalized Choi states.
    pub fn fidelity(&self, other: &Channel) -> Result<f64, QtomError> {
        self.choi.fidelity(&other.choi)
    }

    /// Whether the Choi state is PSD and trace-preserving within `eps`.
    pub fn is_cptp(&self, eps: f64) -> bool {
        if !self.choi.is_hermitian(eps.sqrt()) {
            return false;
        }
        let psd = self
            .choi
            .eigvalsh()
            .first()
            .map(|smallest| *smallest >= -eps)
            .unwrap_or(false);
        if !psd {
            return false;
        }
        match self.choi.partial_trace_right(self.dim, self.dim) {
            Ok(reduced) => {
                let expected = 1.0 / self.dim as f64;
                reduced.matrix().iter().enumerate().all(|(index, entry)| {
                    let row = index % self.dim;
                    let col = index / self.dim;
                    let target = if row == col { expected } else { 0.0 };
                    (entry - Complex64::new(target, 0.0)).norm() <= eps.sqrt()
                })
            }
            Err(_) => false,
        }
    }
}

/// Preparation basis of `4^n_qubits` pure input states, the tensor products
/// of `{|0⟩, |1⟩, |+⟩, |+i⟩}` per qubit. Their projectors span the operator
/// space, which makes linear inversion of a process well posed.
pub fn proj_set(n_qubits: usize) -> Vec<Qobj> {
    use itertools::Itertools;

    let r = 1.0 / 2.0_f64.sqrt();
    let singles: [[Complex64; 2]; 4] = [
        [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
        [Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)],
        [Complex::new(r, 0.0), Complex::new(r, 0.0)],
        [Complex::new(r, 0.0), Complex::new(0.0, r)],
    ];
    (0..n_qubits)
        .map(|_| 0..4usize)
        .multi_cartesian_product()
        .map(|digits| {
            let mut amplitudes = vec![Complex::new(1.0, 0.0)];
            for &digit in &digits {
                let mut next = Vec::with_capacity(amplitudes.len() * 2);
                for amp in &amplitudes {
                    next.push(amp * singles[digit][0]);
                    next.push(amp * singles[digit][1]);
                }
                amplitudes = next;
            }
            Qobj::pure(&amplitudes).expect("non-zero amplitudes")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_channel_preserves_states() {
        let channel = Channel::identity(1);
        let state = Qobj::pure(&[Complex::new(0.8, 0.0), Complex::new(0.0, 0.6)]).unwrap();
        let out = channel.apply(&state).unwrap();
        for (a, b) in out.matrix().iter().zip(state.matrix().iter()) {
            assert!((a - b).norm() < 1e-12);
        }
        assert!(channel.is_cptp(1e-10));
    }

    #[test]
    fn fully_depolarizing_maps_everything_to_mixed() {
        let channel = Channel::depolarizing(1, 1.0);
        let state = Qobj::pure(&[Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]).unwrap();
        let out = channel.apply(&state).unwrap();
        let mixed = Qobj::fully_mixed(1);
        for (a, b) in out.matrix().iter().zip(mixed.matrix().iter()) {
            assert!((a - b).norm() < 1e-12);
        }
        assert!(channel.is_cptp(1e-10));
    }

    #[test]
    fn channel_self_fidelity_is_one() {
        let channel = Channel::depolarizing(1, 0.25);
        let fid = channel.fidelity(&channel).unwrap();
        assert!((fid - 1.0).abs() < 1e-9);
    }

    #[test]
    fn proj_set_spans_the_right_count() {
        assert_eq!(proj_set(1).len(), 4);
        assert_eq!(proj_set(2).len(), 16);
        for state in proj_set(1) {
            assert!((state.trace().re - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn choi_dimension_is_validated() {
        let bad = Qobj::fully_mixed(1).tensor(&Qobj::fully_mixed(1));
        assert!(Channel::from_choi(bad).is_ok());
        let odd = Qobj::from_matrix(DMatrix::identity(3, 3)).unwrap();
        assert!(matches!(
            Channel::from_choi(odd),
            Err(QtomError::DimensionMismatch(_))
        ));
    }
}
