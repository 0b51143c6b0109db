//! Turning accumulated normal equations into response coefficients.
//!
//! Three methods, chosen by degree and by whether constraints are requested:
//!
//! * degree 0: the weighted mean `b₀ / M₀₀`,
//! * unconstrained: Cholesky solution of `M x = b`,
//! * constrained: the least-squares fit subject to the profile being
//!   non-negative, and non-decreasing from the fibre axis towards the
//!   orthogonal plane, at a dense set of elevations (ICLS).

use log::debug;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use sphere::zsh::{self, Normalisation};

use crate::accumulate::NormalEquations;

/// Tuning of the constrained solver
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IclsSettings {
    /// Number of evenly spaced elevations in `[0, π/2]` at which the
    /// constraints are imposed
    pub constraint_samples: usize,
    pub max_iterations: usize,
    /// Relative size below which steps, and multipliers, count as zero
    pub tolerance: f64,
}

impl Default for IclsSettings {
    fn default() -> Self {
        Self { constraint_samples: 91, max_iterations: 1000, tolerance: 1e-10 }
    }
}

/// How a response was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Average,
    LeastSquares,
    Constrained { iterations: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveError {
    /// The normal matrix is not positive definite
    Singular,
    /// The constrained solver did not reach an optimum
    Infeasible { iterations: usize },
}

pub type Solution = Result<(DVector<f64>, Method), SolveError>;

/// Solve `eq` for the coefficients of a profile of degree `lmax`.
pub fn solve(eq: &NormalEquations, lmax: usize, constrain: bool, norm: Normalisation, settings: &IclsSettings) -> Solution {
    if lmax == 0 {
        return Ok((isotropic(&eq.m, &eq.b)?, Method::Average))
    }
    if !constrain {
        return Ok((least_squares(&eq.m, &eq.b)?, Method::LeastSquares))
    }
    let a = constraint_matrix(lmax, norm, settings.constraint_samples);
    let (x, iterations) = constrained(&eq.m, &eq.b, &a, settings)?;
    Ok((x, Method::Constrained { iterations }))
}

pub fn isotropic(m: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolveError> {
    let m00 = m[(0, 0)];
    if !(m00 > 0.0) { return Err(SolveError::Singular) }
    Ok(DVector::from_element(1, b[0] / m00))
}

pub fn least_squares(m: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolveError> {
    Ok(factorize(m)?.solve(b))
}

/// Smallest squared Cholesky pivot, relative to the largest diagonal element
/// of the matrix, for the matrix to count as positive definite
const MIN_RELATIVE_PIVOT: f64 = 1e-12;

fn factorize(m: &DMatrix<f64>) -> Result<Cholesky<f64, Dyn>, SolveError> {
    let scale = m.diagonal().amax();
    let cholesky = m.clone().cholesky().ok_or(SolveError::Singular)?;
    let threshold = (MIN_RELATIVE_PIVOT * scale).sqrt();
    let definite = scale > 0.0 && cholesky.l_dirty().diagonal().iter().all(|&d| d.is_finite() && d > threshold);
    if definite { Ok(cholesky) } else { Err(SolveError::Singular) }
}

/// Rows `a` such that `a · x ≥ 0` expresses non-negativity, and
/// non-decreasing amplitude in elevation, of the profile with coefficients
/// `x`, at `samples` elevations covering `[0, π/2]`.
///
/// The derivative of every even-degree basis function vanishes at both ends
/// of the range, so derivative rows are only generated at interior
/// elevations. Each row is scaled to unit length.
pub fn constraint_matrix(lmax: usize, norm: Normalisation, samples: usize) -> DMatrix<f64> {
    let els = zsh::hemisphere_elevations(samples);
    let interior = if els.len() > 2 { &els[1..els.len() - 1] } else { &[][..] };
    let amp   = zsh::amp_transform  (&els,     lmax, norm);
    let deriv = zsh::deriv_transform(interior, lmax, norm);

    let mut a = DMatrix::zeros(amp.nrows() + deriv.nrows(), zsh::n_for_l(lmax));
    a.rows_mut(0, amp.nrows()).copy_from(&amp);
    a.rows_mut(amp.nrows(), deriv.nrows()).copy_from(&deriv);
    for mut row in a.row_iter_mut() {
        let length = row.norm();
        if length > 0.0 { row /= length }
    }
    a
}

/// Minimize `½ xᵀ M x − bᵀ x` subject to `a x ≥ 0`, by a primal active-set
/// method. Returns the minimizer, and the number of iterations taken.
pub fn constrained(m: &DMatrix<f64>, b: &DVector<f64>, a: &DMatrix<f64>, settings: &IclsSettings) -> Result<(DVector<f64>, usize), SolveError> {
    factorize(m)?;

    // Isotropic profile: satisfies every constraint, as long as it is
    // non-negative
    let mut x = DVector::zeros(b.len());
    x[0] = (b[0] / m[(0, 0)]).max(0.0);

    let mut working: Vec<usize> = vec![];
    for iteration in 1..=settings.max_iterations {
        let gradient = m * &x - b;
        let (p, multipliers) = equality_step(m, a, &working, &gradient).ok_or(SolveError::Singular)?;

        if p.norm() <= settings.tolerance * (1.0 + x.norm()) {
            let threshold = -settings.tolerance * (1.0 + gradient.norm());
            let release = multipliers.iter()
                .enumerate()
                .filter(|(_, &lambda)| lambda < threshold)
                .min_by(|(_, l), (_, r)| l.total_cmp(r))
                .map(|(k, _)| k);
            match release {
                Some(k) => {
                    let released = working.remove(k);
                    debug!("ICLS iteration {iteration}: releasing constraint {released}");
                }
                None => {
                    debug!("ICLS converged after {iteration} iterations with {} active constraints", working.len());
                    return Ok((x, iteration))
                }
            }
            continue;
        }

        // Longest step along `p`, up to 1, which keeps every constraint satisfied
        let ap = a * &p;
        let ax = a * &x;
        let descent = -settings.tolerance * p.norm();
        let mut step = 1.0;
        let mut blocking = None;
        for i in 0..a.nrows() {
            if ap[i] >= descent || working.contains(&i) { continue }
            let alpha = ax[i].max(0.0) / -ap[i];
            if alpha < step {
                step = alpha;
                blocking = Some(i);
            }
        }
        x.axpy(step, &p, 1.0);
        if let Some(i) = blocking {
            debug!("ICLS iteration {iteration}: step {step:.3e}, activating constraint {i}");
            working.push(i);
        }
    }
    Err(SolveError::Infeasible { iterations: settings.max_iterations })
}

/// Step `p` minimizing the objective from the point with gradient `gradient`,
/// while keeping the constraints in `working` unchanged, together with their
/// Lagrange multipliers.
fn equality_step(m: &DMatrix<f64>, a: &DMatrix<f64>, working: &[usize], gradient: &DVector<f64>) -> Option<(DVector<f64>, DVector<f64>)> {
    let n = m.nrows();
    let k = working.len();
    // [ M   Awᵀ ] [p]   [-g]
    // [ Aw  0   ] [μ] = [ 0]
    let mut kkt = DMatrix::zeros(n + k, n + k);
    kkt.view_mut((0, 0), (n, n)).copy_from(m);
    for (j, &i) in working.iter().enumerate() {
        let row = a.row(i);
        kkt.view_mut((n + j, 0), (1, n)).copy_from(&row);
        kkt.view_mut((0, n + j), (n, 1)).copy_from(&row.transpose());
    }
    let mut rhs = DVector::zeros(n + k);
    rhs.rows_mut(0, n).copy_from(&(-gradient));

    let solution = kkt.lu().solve(&rhs)?;
    if solution.iter().any(|v| !v.is_finite()) { return None }
    let p = solution.rows(0, n).into_owned();
    // Multipliers of `a x ≥ 0` have the opposite sign to μ
    let multipliers = -solution.rows(n, k).into_owned();
    Some((p, multipliers))
}
