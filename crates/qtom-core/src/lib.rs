#![deny(missing_docs)]
#![doc = "Core error types, numerical tolerances and the deterministic RNG policy shared by all QTOM crates."]

pub mod errors;
pub mod rng;

pub use errors::{ErrorInfo, QtomError};
pub use rng::{derive_substream_seed, RngHandle};

/// Eigenvalue clamp tolerance used when checking or enforcing positive
/// semidefiniteness. Estimates with eigenvalues above `-EPS_PSD` count as
/// physical.
pub const EPS_PSD: f64 = 1e-10;

/// Tolerance applied when validating measurement designs (Hermiticity of
/// effects and completeness of each setting).
pub const EPS_DESIGN: f64 = 1e-8;

/// Convergence tolerance for iterative constrained solves (maximum-likelihood
/// fixed point, CPTP alternating projections).
pub const EPS_CONVERGENCE: f64 = 1e-10;
