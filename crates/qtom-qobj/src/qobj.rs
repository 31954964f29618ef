use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use qtom_core::errors::ErrorInfo;
use qtom_core::QtomError;

use crate::pauli;
use crate::{CMatrix, Complex64};

/// Immutable complex matrix representing a quantum state, effect or raw
/// estimate.
///
/// Two Bloch encodings are exposed, matched so that outcome probabilities are
/// plain dot products: a *state* encodes as Pauli expectations
/// `b_i = tr(ρ P_i)` while an *effect* encodes as expansion coefficients
/// `e_i = tr(E P_i) / d`, giving `tr(E ρ) = e · b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qobj {
    matrix: CMatrix,
}

impl Qobj {
    /// Wraps a square complex matrix.
    pub fn from_matrix(matrix: CMatrix) -> Result<Self, QtomError> {
        if matrix.nrows() == 0 || matrix.nrows() != matrix.ncols() {
            return Err(QtomError::DimensionMismatch(
                ErrorInfo::new("non-square", "quantum objects must be square and non-empty")
                    .with_context("rows", matrix.nrows().to_string())
                    .with_context("cols", matrix.ncols().to_string()),
            ));
        }
        Ok(Self { matrix })
    }

    /// Builds the projector `|ψ⟩⟨ψ|` onto the given (normalized) amplitudes.
    pub fn pure(amplitudes: &[Complex64]) -> Result<Self, QtomError> {
        let norm_sq: f64 = amplitudes.iter().map(|a| a.norm_sqr()).sum();
        if norm_sq <= 0.0 {
            return Err(QtomError::Numeric(ErrorInfo::new(
                "zero-vector",
                "cannot build a projector from the zero vector",
            )));
        }
        let dim = amplitudes.len();
        let norm = norm_sq.sqrt();
        let mut matrix = DMatrix::zeros(dim, dim);
        for (i, a) in amplitudes.iter().enumerate() {
            for (j, b) in amplitudes.iter().enumerate() {
                matrix[(i, j)] = (*a / norm) * (*b / norm).conj();
            }
        }
        Self::from_matrix(matrix)
    }

    /// Maximally mixed state `I / d` on `n_qubits` qubits.
    pub fn fully_mixed(n_qubits: usize) -> Self {
        let dim = 1usize << n_qubits;
        let scale = Complex::new(1.0 / dim as f64, 0.0);
        Self {
            matrix: DMatrix::identity(dim, dim) * scale,
        }
    }

    /// Reconstructs an object from its state Bloch vector, `ρ = Σ b_i P_i / d`.
    pub fn from_bloch(bloch: &[f64]) -> Result<Self, QtomError> {
        let n_qubits = pauli::qubits_for_bloch_len(bloch.len()).ok_or_else(|| {
            QtomError::DimensionMismatch(
                ErrorInfo::new("bloch-length", "Bloch vector length must be a power of four")
                    .with_context("length", bloch.len().to_string()),
            )
        })?;
        let basis = pauli::tensor_basis(n_qubits);
        let dim = 1usize << n_qubits;
        let mut matrix = DMatrix::zeros(dim, dim);
        for (coeff, element) in bloch.iter().zip(basis.iter()) {
            matrix += element * Complex::new(coeff / dim as f64, 0.0);
        }
        Self::from_matrix(matrix)
    }

    /// Reconstructs an effect from its effect Bloch vector, `E = Σ e_i P_i`.
    pub fn effect_from_bloch(bloch: &[f64]) -> Result<Self, QtomError> {
        let n_qubits = pauli::qubits_for_bloch_len(bloch.len()).ok_or_else(|| {
            QtomError::DimensionMismatch(
                ErrorInfo::new("bloch-length", "Bloch vector length must be a power of four")
                    .with_context("length", bloch.len().to_string()),
            )
        })?;
        let dim = 1usize << n_qubits;
        let scaled: Vec<f64> = bloch.iter().map(|value| value * dim as f64).collect();
        Self::from_bloch(&scaled)
    }

    /// Borrows the underlying matrix.
    pub fn matrix(&self) -> &CMatrix {
        &self.matrix
    }

    /// Matrix dimension `d`.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// State Bloch vector `b_i = tr(ρ P_i)`.
    pub fn bloch(&self) -> Vec<f64> {
        self.pauli_overlaps(1.0)
    }

    /// Effect Bloch vector `e_i = tr(E P_i) / d`.
    pub fn effect_bloch(&self) -> Vec<f64> {
        self.pauli_overlaps(1.0 / self.dim() as f64)
    }

    fn pauli_overlaps(&self, scale: f64) -> Vec<f64> {
        let n_qubits = (self.dim() as f64).log2().round() as usize;
        pauli::tensor_basis(n_qubits)
            .iter()
            .map(|element| (element * &self.matrix).trace().re * scale)
            .collect()
    }

    /// Trace of the matrix.
    pub fn trace(&self) -> Complex64 {
        self.matrix.trace()
    }

    /// Purity `tr(ρ²)` of the Hermitian part.
    pub fn purity(&self) -> f64 {
        let h = self.hermitize();
        (&h.matrix * &h.matrix).trace().re
    }

    /// Hermitian part `(M + M†) / 2`.
    pub fn hermitize(&self) -> Qobj {
        let adjoint = self.matrix.adjoint();
        Qobj {
            matrix: (&self.matrix + adjoint) * Complex::new(0.5, 0.0),
        }
    }

    /// Whether the matrix is Hermitian within `tol` (entrywise).
    pub fn is_hermitian(&self, tol: f64) -> bool {
        let adjoint = self.matrix.adjoint();
        (&self.matrix - adjoint)
            .iter()
            .all(|entry| entry.norm() <= tol)
    }

    /// Plain (non-conjugating) transpose.
    pub fn transpose(&self) -> Qobj {
        Qobj {
            matrix: self.matrix.transpose(),
        }
    }

    /// Eigendecomposition of the Hermitian part: `(eigenvalues, eigenvectors)`
    /// in nalgebra's native order.
    pub fn eigh(&self) -> (Vec<f64>, CMatrix) {
        let eigen = SymmetricEigen::new(self.hermitize().matrix);
        (eigen.eigenvalues.iter().copied().collect(), eigen.eigenvectors)
    }

    /// Real eigenvalues of the Hermitian part, sorted ascending.
    pub fn eigvalsh(&self) -> Vec<f64> {
        let (mut values, _) = self.eigh();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values
    }

    /// Principal square root of the Hermitian part, with negative eigenvalues
    /// clamped to zero.
    pub fn sqrtm(&self) -> Qobj {
        Qobj {
            matrix: self.apply_spectral(|value| value.max(0.0).sqrt()),
        }
    }

    fn apply_spectral(&self, f: impl Fn(f64) -> f64) -> CMatrix {
        let (values, vectors) = self.eigh();
        let dim = self.dim();
        let mut out = DMatrix::zeros(dim, dim);
        for (k, value) in values.iter().enumerate() {
            let column = vectors.column(k);
            out += (column * column.adjoint()) * Complex::new(f(*value), 0.0);
        }
        out
    }

    /// Uhlmann fidelity `F(ρ, σ) = (tr √(√ρ σ √ρ))²`.
    pub fn fidelity(&self, other: &Qobj) -> Result<f64, QtomError> {
        if self.dim() != other.dim() {
            return Err(QtomError::dimension_mismatch(
                "fidelity operand",
                self.dim(),
                other.dim(),
            ));
        }
        let root = self.sqrtm();
        let inner = Qobj {
            matrix: root.matrix() * other.hermitize().matrix() * root.matrix(),
        };
        let sum: f64 = inner
            .eigvalsh()
            .into_iter()
            .map(|value| value.max(0.0).sqrt())
            .sum();
        Ok(sum * sum)
    }

    /// Outcome probability `Re tr(E ρ)` of an effect against this object.
    pub fn expectation(&self, effect: &Qobj) -> Result<f64, QtomError> {
        if self.dim() != effect.dim() {
            return Err(QtomError::dimension_mismatch(
                "effect",
                self.dim(),
                effect.dim(),
            ));
        }
        Ok((effect.matrix() * &self.matrix).trace().re)
    }

    /// Tensor (Kronecker) product with another object.
    pub fn tensor(&self, other: &Qobj) -> Qobj {
        Qobj {
            matrix: self.matrix.kronecker(&other.matrix),
        }
    }

    /// Traces out the left factor of a `da ⊗ db` bipartition, returning a
    /// `db × db` object.
    pub fn partial_trace_left(&self, da: usize, db: usize) -> Result<Qobj, QtomError> {
        self.check_bipartition(da, db)?;
        let mut out = DMatrix::zeros(db, db);
        for a in 0..da {
            for i in 0..db {
                for j in 0..db {
                    out[(i, j)] += self.matrix[(a * db + i, a * db + j)];
                }
            }
        }
        Qobj::from_matrix(out)
    }

    /// Traces out the right factor of a `da ⊗ db` bipartition, returning a
    /// `da × da` object.
    pub fn partial_trace_right(&self, da: usize, db: usize) -> Result<Qobj, QtomError> {
        self.check_bipartition(da, db)?;
        let mut out = DMatrix::zeros(da, da);
        for i in 0..da {
            for j in 0..da {
                for b in 0..db {
                    out[(i, j)] += self.matrix[(i * db + b, j * db + b)];
                }
            }
        }
        Qobj::from_matrix(out)
    }

    fn check_bipartition(&self, da: usize, db: usize) -> Result<(), QtomError> {
        if da * db != self.dim() {
            return Err(QtomError::dimension_mismatch(
                "bipartition",
                self.dim(),
                da * db,
            ));
        }
        Ok(())
    }

    /// Whether the object is a physical state: Hermitian, eigenvalues above
    /// `-eps_eig`, trace within `eps_trace` of one.
    pub fn is_physical_state(&self, eps_eig: f64, eps_trace: f64) -> bool {
        if !self.is_hermitian(eps_trace) {
            return false;
        }
        let trace = self.trace();
        if (trace.re - 1.0).abs() > eps_trace || trace.im.abs() > eps_trace {
            return false;
        }
        self.eigvalsh()
            .first()
            .map(|smallest| *smallest >= -eps_eig)
            .unwrap_or(false)
    }
}
