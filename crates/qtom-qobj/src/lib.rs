#![deny(missing_docs)]
#![doc = "Quantum object algebra: density matrices over the Pauli tensor basis, Bloch-vector encodings, Choi-matrix channels and fidelity."]

pub mod channel;
pub mod pauli;
mod qobj;

pub use channel::{proj_set, Channel};
pub use qobj::Qobj;

/// Complex scalar type used throughout the algebra layer.
pub type Complex64 = num_complex::Complex<f64>;

/// Dense complex matrix type used throughout the algebra layer.
pub type CMatrix = nalgebra::DMatrix<Complex64>;
