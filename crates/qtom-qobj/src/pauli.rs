//! Pauli tensor basis construction.
//!
//! The basis for `n` qubits is the set of all `4^n` tensor products of
//! `{I, X, Y, Z}`, ordered by the base-4 expansion of the basis index with
//! the first qubit as the most significant digit. `P_0` is always the
//! identity, and `tr(P_i P_j) = d δ_ij` with `d = 2^n`.

use itertools::Itertools;
use nalgebra::DMatrix;
use num_complex::Complex;

use crate::{CMatrix, Complex64};

fn c(re: f64, im: f64) -> Complex64 {
    Complex::new(re, im)
}

/// Returns the four single-qubit Pauli matrices `[I, X, Y, Z]`.
pub fn single_qubit() -> [CMatrix; 4] {
    let identity = DMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)]);
    let x = DMatrix::from_row_slice(2, 2, &[c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)]);
    let y = DMatrix::from_row_slice(2, 2, &[c(0.0, 0.0), c(0.0, -1.0), c(0.0, 1.0), c(0.0, 0.0)]);
    let z = DMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(-1.0, 0.0)]);
    [identity, x, y, z]
}

/// Builds the full Pauli tensor basis for `n_qubits` qubits.
///
/// The returned vector has `4^n_qubits` matrices of dimension `2^n_qubits`.
pub fn tensor_basis(n_qubits: usize) -> Vec<CMatrix> {
    let singles = single_qubit();
    (0..n_qubits)
        .map(|_| 0..4usize)
        .multi_cartesian_product()
        .map(|digits| {
            digits
                .iter()
                .fold(DMatrix::from_element(1, 1, c(1.0, 0.0)), |acc, &digit| {
                    acc.kronecker(&singles[digit])
                })
        })
        .collect()
}

/// Number of qubits encoded by a Bloch vector of the given length, if the
/// length is an exact power of four.
pub fn qubits_for_bloch_len(len: usize) -> Option<usize> {
    let mut qubits = 0usize;
    let mut size = 1usize;
    while size < len {
        size *= 4;
        qubits += 1;
    }
    (size == len && len > 0).then_some(qubits)
}
