//! Constrained estimation primitives shared by state and process tomographs.

use nalgebra::{DMatrix, DVector, SVD};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use qtom_core::errors::ErrorInfo;
use qtom_core::{QtomError, EPS_CONVERGENCE};
use qtom_qobj::Qobj;

/// Criterion used when turning outcome frequencies into a point estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorMode {
    /// Plain least-squares linear inversion. Fast; the result may be
    /// non-physical (negative eigenvalues, trace drift).
    LinearInversion,
    /// Linear inversion followed by projection onto the closest physical
    /// object.
    ProjectedLinear,
    /// Maximum-likelihood fit of the multinomial outcome model over the
    /// physical set.
    MaxLikelihood,
}

impl EstimatorMode {
    /// Stable name used in reports and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorMode::LinearInversion => "linear-inversion",
            EstimatorMode::ProjectedLinear => "projected-linear",
            EstimatorMode::MaxLikelihood => "max-likelihood",
        }
    }
}

/// Iteration budget for the maximum-likelihood fixed point.
pub const MLE_MAX_ITERATIONS: usize = 2000;

/// Iteration budget for the alternating CPTP projection.
pub const CPTP_MAX_ITERATIONS: usize = 2000;

/// Solves the least-squares system mapping effect Bloch rows to observed
/// frequencies, returning the state Bloch vector of the raw estimate.
pub fn linear_inversion(rows: &[Vec<f64>], frequencies: &[f64]) -> Result<Vec<f64>, QtomError> {
    if rows.is_empty() || rows.len() != frequencies.len() {
        return Err(QtomError::dimension_mismatch(
            "design rows",
            rows.len(),
            frequencies.len(),
        ));
    }
    let n_params = rows[0].len();
    let matrix = DMatrix::from_fn(rows.len(), n_params, |r, c| rows[r][c]);
    let rhs = DVector::from_column_slice(frequencies);
    let svd = SVD::new(matrix, true, true);
    let solution = svd.solve(&rhs, 1e-12).map_err(|err| {
        QtomError::Numeric(ErrorInfo::new("svd-solve", err.to_string()))
    })?;
    Ok(solution.iter().copied().collect())
}

/// Projects a raw estimate onto the closest density matrix: Hermitian part,
/// then Euclidean projection of the spectrum onto the probability simplex.
pub fn project_to_state(raw: &Qobj) -> Result<Qobj, QtomError> {
    let (values, vectors) = raw.eigh();
    let mut sorted: Vec<f64> = values.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    // Water-filling offset for the simplex projection.
    let mut cumulative = 0.0;
    let mut offset = (1.0 - sorted.iter().sum::<f64>()) / sorted.len() as f64;
    for (index, value) in sorted.iter().enumerate() {
        cumulative += value;
        let candidate = (1.0 - cumulative) / (index + 1) as f64;
        if value + candidate > 0.0 {
            offset = candidate;
        }
    }

    let dim = raw.dim();
    let mut matrix = DMatrix::zeros(dim, dim);
    for (k, value) in values.iter().enumerate() {
        let clamped = (value + offset).max(0.0);
        if clamped > 0.0 {
            let column = vectors.column(k);
            matrix += (column * column.adjoint()) * Complex::new(clamped, 0.0);
        }
    }
    Qobj::from_matrix(matrix)
}

/// Maximum-likelihood estimate via the RρR fixed-point iteration.
///
/// `effects` and `counts` are flattened over settings and outcomes in the
/// same order. Starts from the maximally mixed state; stops when the iterate
/// moves less than `tol` in Hilbert–Schmidt norm. Exhausting the iteration
/// budget is an [`QtomError::Estimation`], never a silent return.
pub fn mle_fixed_point(
    effects: &[Qobj],
    counts: &[u64],
    dim: usize,
    tol: f64,
) -> Result<Qobj, QtomError> {
    if effects.len() != counts.len() || effects.is_empty() {
        return Err(QtomError::dimension_mismatch(
            "mle effects",
            effects.len(),
            counts.len(),
        ));
    }
    let total: u64 = counts.iter().sum();
    let scale = Complex::new(1.0 / total as f64, 0.0);
    let mut rho = DMatrix::from_diagonal_element(dim, dim, Complex::new(1.0 / dim as f64, 0.0));

    for _ in 0..MLE_MAX_ITERATIONS {
        let mut r = DMatrix::zeros(dim, dim);
        for (effect, count) in effects.iter().zip(counts.iter()) {
            if *count == 0 {
                continue;
            }
            let probability = (effect.matrix() * &rho).trace().re.max(1e-12);
            r += effect.matrix() * Complex::new(*count as f64 / probability, 0.0);
        }
        r *= scale;
        let mut next = &r * &rho * &r;
        let trace = next.trace().re;
        if !(trace.is_finite() && trace > 0.0) {
            return Err(QtomError::Estimation(ErrorInfo::new(
                "mle-degenerate",
                "likelihood iteration produced a degenerate iterate",
            )));
        }
        next /= Complex::new(trace, 0.0);

        let shift: f64 = (&next - &rho).iter().map(|entry| entry.norm_sqr()).sum();
        rho = next;
        if shift.sqrt() < tol {
            return Qobj::from_matrix(rho);
        }
    }
    Err(QtomError::Estimation(
        ErrorInfo::new("mle-no-convergence", "RρR iteration did not converge")
            .with_context("iterations", MLE_MAX_ITERATIONS.to_string())
            .with_context("tolerance", format!("{tol:e}")),
    ))
}

/// Projects a raw Choi estimate onto the CPTP set by alternating the PSD
/// spectral clamp with the trace-preserving affine correction.
pub fn project_to_cptp(raw: &Qobj, dim: usize, tol: f64) -> Result<Qobj, QtomError> {
    if dim * dim != raw.dim() {
        return Err(QtomError::dimension_mismatch(
            "choi estimate",
            dim * dim,
            raw.dim(),
        ));
    }
    let mut choi = raw.hermitize();
    for _ in 0..CPTP_MAX_ITERATIONS {
        // Trace-preserving correction: tr_right(J) must equal I / d. The
        // correction also restores unit trace.
        let reduced = choi.partial_trace_right(dim, dim)?;
        let mut residual = reduced.matrix().clone();
        for i in 0..dim {
            residual[(i, i)] -= Complex::new(1.0 / dim as f64, 0.0);
        }
        let tp_deviation = residual.iter().map(|entry| entry.norm()).fold(0.0_f64, f64::max);
        let eye = DMatrix::identity(dim, dim);
        let correction = residual.kronecker(&eye) / Complex::new(dim as f64, 0.0);
        let corrected = Qobj::from_matrix(choi.matrix() - correction)?;

        // PSD clamp.
        let smallest = corrected.eigvalsh().first().copied().unwrap_or(0.0);
        if smallest >= -tol && tp_deviation <= tol {
            return Ok(corrected);
        }
        let clamped = corrected.sqrtm();
        choi = Qobj::from_matrix(clamped.matrix() * clamped.matrix())?;
    }
    Err(QtomError::Estimation(
        ErrorInfo::new("cptp-no-convergence", "alternating CPTP projection did not converge")
            .with_context("iterations", CPTP_MAX_ITERATIONS.to_string())
            .with_context("tolerance", format!("{tol:e}")),
    ))
}

/// Default convergence tolerance for the iterative solves.
pub fn default_tolerance() -> f64 {
    EPS_CONVERGENCE.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtom_core::EPS_PSD;

    #[test]
    fn projection_fixes_negative_eigenvalues() {
        // Raw estimate with Bloch norm > 1 is outside the physical set.
        let raw = Qobj::from_bloch(&[1.0, 1.2, 0.0, 0.9]).unwrap();
        assert!(!raw.is_physical_state(EPS_PSD, 1e-9));
        let projected = project_to_state(&raw).unwrap();
        assert!(projected.is_physical_state(EPS_PSD, 1e-9));
    }

    #[test]
    fn projection_leaves_physical_states_alone() {
        let state = Qobj::from_bloch(&[1.0, 0.2, -0.1, 0.4]).unwrap();
        let projected = project_to_state(&state).unwrap();
        for (a, b) in projected.matrix().iter().zip(state.matrix().iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn mle_recovers_a_deterministic_outcome() {
        // Z measurement always yielding |0⟩ pins the estimate near |0⟩⟨0|.
        let up = Qobj::from_bloch(&[1.0, 0.0, 0.0, 1.0]).unwrap();
        let down = Qobj::from_bloch(&[1.0, 0.0, 0.0, -1.0]).unwrap();
        let estimate =
            mle_fixed_point(&[up, down], &[1000, 0], 2, default_tolerance()).unwrap();
        let bloch = estimate.bloch();
        assert!(bloch[3] > 0.99, "z component {}", bloch[3]);
    }

    #[test]
    fn cptp_projection_reaches_the_physical_set() {
        use qtom_qobj::Channel;
        // Perturb a depolarizing Choi state off the CPTP set.
        let channel = Channel::depolarizing(1, 0.3);
        let mut matrix = channel.choi().matrix().clone();
        matrix[(0, 0)] += Complex::new(0.05, 0.0);
        matrix[(3, 3)] -= Complex::new(0.08, 0.0);
        let raw = Qobj::from_matrix(matrix).unwrap();
        let projected = project_to_cptp(&raw, 2, 1e-7).unwrap();
        let as_channel = Channel::from_choi(projected).unwrap();
        assert!(as_channel.is_cptp(1e-5));
    }
}
