//! Shared polytope extremizer.
//!
//! Maximizes or minimizes a linear objective over a region described by slab
//! constraints `lo ≤ a·x ≤ hi` (equalities when `lo == hi`) with free
//! variables, via a dense two-phase primal simplex. Phase I detects empty
//! regions, which surface as [`QtomError::InfeasibleRegion`] rather than a
//! spurious extremum. Bland's rule keeps the pivoting deterministic and
//! cycle-free; the pivot budget is hard.

use qtom_core::errors::ErrorInfo;
use qtom_core::QtomError;

/// One slab constraint `lower ≤ coeffs · x ≤ upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Row coefficients, one per variable.
    pub coeffs: Vec<f64>,
    /// Lower bound (use `f64::NEG_INFINITY` for a one-sided slab).
    pub lower: f64,
    /// Upper bound (use `f64::INFINITY` for a one-sided slab).
    pub upper: f64,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Smallest objective value over the region.
    Minimize,
    /// Largest objective value over the region.
    Maximize,
}

const PIVOT_TOL: f64 = 1e-9;
const FEASIBILITY_TOL: f64 = 1e-7;
const MAX_PIVOTS: usize = 10_000;

/// Extremizes `objective · x` over the region cut out by `constraints`.
pub fn extremize(
    constraints: &[LinearConstraint],
    objective: &[f64],
    sense: Sense,
) -> Result<f64, QtomError> {
    let n_vars = objective.len();
    if n_vars == 0 || constraints.is_empty() {
        return Err(QtomError::Numeric(ErrorInfo::new(
            "lp-empty-problem",
            "extremizer needs at least one variable and one constraint",
        )));
    }
    for constraint in constraints {
        if constraint.coeffs.len() != n_vars {
            return Err(QtomError::dimension_mismatch(
                "constraint row",
                n_vars,
                constraint.coeffs.len(),
            ));
        }
        if constraint.lower > constraint.upper + FEASIBILITY_TOL {
            return Err(infeasible("slab bounds are crossed"));
        }
    }

    let signed_objective: Vec<f64> = match sense {
        Sense::Maximize => objective.to_vec(),
        Sense::Minimize => objective.iter().map(|c| -c).collect(),
    };
    let value = solve_maximize(constraints, &signed_objective)?;
    Ok(match sense {
        Sense::Maximize => value,
        Sense::Minimize => -value,
    })
}

fn infeasible(message: &str) -> QtomError {
    QtomError::InfeasibleRegion(
        ErrorInfo::new("empty-polytope", message)
            .with_hint("loosen the confidence level or collect more shots"),
    )
}

/// Free variables are split as `x = u − v` with `u, v ≥ 0`; every slab side
/// becomes one `≤` row with a slack.
fn solve_maximize(constraints: &[LinearConstraint], objective: &[f64]) -> Result<f64, QtomError> {
    let n_vars = objective.len();
    let mut rows: Vec<(Vec<f64>, f64)> = Vec::new();
    for constraint in constraints {
        if constraint.upper.is_finite() {
            rows.push((constraint.coeffs.clone(), constraint.upper));
        }
        if constraint.lower.is_finite() {
            let negated: Vec<f64> = constraint.coeffs.iter().map(|c| -c).collect();
            rows.push((negated, -constraint.lower));
        }
    }
    let m = rows.len();
    let n_structural = 2 * n_vars;
    let n_total = n_structural + m + m; // u, v, slacks, artificials (upper bound)

    let mut a = vec![vec![0.0; n_total]; m];
    let mut b = vec![0.0; m];
    let mut basis = vec![0usize; m];
    let mut allowed = vec![true; n_total];
    let mut n_artificial = 0usize;

    for (i, (coeffs, rhs)) in rows.iter().enumerate() {
        let flip = *rhs < 0.0;
        let sign = if flip { -1.0 } else { 1.0 };
        for (j, coeff) in coeffs.iter().enumerate() {
            a[i][j] = sign * coeff;
            a[i][n_vars + j] = -sign * coeff;
        }
        a[i][n_structural + i] = sign; // slack
        b[i] = sign * rhs;
        if flip {
            let artificial = n_structural + m + n_artificial;
            a[i][artificial] = 1.0;
            basis[i] = artificial;
            n_artificial += 1;
        } else {
            basis[i] = n_structural + i;
        }
    }
    let first_artificial = n_structural + m;
    let used_total = first_artificial + n_artificial;
    for row in &mut a {
        row.truncate(used_total);
    }
    allowed.truncate(used_total);

    // Phase I: drive the artificials to zero.
    if n_artificial > 0 {
        let mut cost = vec![0.0; used_total];
        let mut value = 0.0;
        for j in first_artificial..used_total {
            cost[j] = -1.0;
        }
        for (i, basic) in basis.iter().enumerate() {
            if *basic >= first_artificial {
                for j in 0..used_total {
                    cost[j] += a[i][j];
                }
                value -= b[i];
            }
        }
        run_simplex(&mut a, &mut b, &mut cost, &mut value, &mut basis, &allowed)?;
        if value < -FEASIBILITY_TOL {
            return Err(infeasible("constraint slabs have no common point"));
        }
        for j in first_artificial..used_total {
            allowed[j] = false;
        }
        // Degenerate artificials still in the basis sit at level zero; swap
        // them for a real column so later pivots cannot reactivate them. A row
        // with no real coefficient left is redundant and stays inert.
        for row in 0..m {
            if basis[row] >= first_artificial {
                let replacement =
                    (0..first_artificial).find(|j| allowed[*j] && a[row][*j].abs() > PIVOT_TOL);
                if let Some(col) = replacement {
                    pivot(&mut a, &mut b, &mut cost, &mut value, &mut basis, row, col);
                }
            }
        }
    }

    // Phase II: optimize the real objective from the feasible basis.
    let mut cost = vec![0.0; used_total];
    let mut value = 0.0;
    for j in 0..n_vars {
        cost[j] = objective[j];
        cost[n_vars + j] = -objective[j];
    }
    for i in 0..m {
        let basic = basis[i];
        let coefficient = cost[basic];
        if coefficient != 0.0 {
            for j in 0..used_total {
                cost[j] -= coefficient * a[i][j];
            }
            value += coefficient * b[i];
        }
    }
    run_simplex(&mut a, &mut b, &mut cost, &mut value, &mut basis, &allowed)?;
    Ok(value)
}

fn run_simplex(
    a: &mut [Vec<f64>],
    b: &mut [f64],
    cost: &mut [f64],
    value: &mut f64,
    basis: &mut [usize],
    allowed: &[bool],
) -> Result<(), QtomError> {
    let m = a.len();
    let n = cost.len();
    for _ in 0..MAX_PIVOTS {
        // Bland: smallest-index improving column.
        let entering = (0..n).find(|j| allowed[*j] && cost[*j] > PIVOT_TOL);
        let Some(col) = entering else {
            return Ok(());
        };
        let mut pivot_row: Option<usize> = None;
        let mut best_ratio = f64::INFINITY;
        for i in 0..m {
            if a[i][col] > PIVOT_TOL {
                let ratio = b[i] / a[i][col];
                let better = match pivot_row {
                    None => true,
                    Some(current) => {
                        ratio < best_ratio - PIVOT_TOL
                            || (ratio < best_ratio + PIVOT_TOL && basis[i] < basis[current])
                    }
                };
                if better {
                    pivot_row = Some(i);
                    best_ratio = ratio;
                }
            }
        }
        let Some(row) = pivot_row else {
            return Err(QtomError::Numeric(ErrorInfo::new(
                "lp-unbounded",
                "objective is unbounded over the region",
            )));
        };

        pivot(a, b, cost, value, basis, row, col);
    }
    Err(QtomError::Numeric(ErrorInfo::new(
        "lp-stall",
        "simplex exceeded its pivot budget",
    )))
}

fn pivot(
    a: &mut [Vec<f64>],
    b: &mut [f64],
    cost: &mut [f64],
    value: &mut f64,
    basis: &mut [usize],
    row: usize,
    col: usize,
) {
    let n = cost.len();
    let element = a[row][col];
    for j in 0..n {
        a[row][j] /= element;
    }
    b[row] /= element;
    let pivot_coeffs = a[row].clone();
    let pivot_rhs = b[row];
    for i in 0..a.len() {
        if i != row && a[i][col].abs() > 0.0 {
            let factor = a[i][col];
            for j in 0..n {
                a[i][j] -= factor * pivot_coeffs[j];
            }
            b[i] -= factor * pivot_rhs;
            if b[i].abs() < 1e-12 {
                b[i] = 0.0;
            }
        }
    }
    let factor = cost[col];
    for j in 0..n {
        cost[j] -= factor * pivot_coeffs[j];
    }
    *value += factor * pivot_rhs;
    basis[row] = col;
}
