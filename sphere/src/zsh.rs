//! Zonal (m = 0) spherical harmonics of even degree
//!
//! A zonal profile is a function of elevation alone. With only even degrees
//! it is also antipodally symmetric, so coefficient `j` belongs to degree
//! `l = 2j`.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{DMatrix, DVector};

/// Number of coefficients of an even-degree zonal expansion up to `lmax`.
pub fn n_for_l(lmax: usize) -> usize { lmax / 2 + 1 }

/// Highest degree representable with `n` coefficients.
pub fn l_for_n(n: usize) -> usize { if n == 0 { 0 } else { 2 * (n - 1) } }

/// Position of degree `l` in a coefficient vector.
pub fn index(l: usize) -> usize { l / 2 }

/// Scaling of the Legendre polynomials which make up the basis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Normalisation {
    /// `P_l(cos el)`: every basis function is 1 on the axis, so the
    /// degree-zero coefficient is the mean amplitude.
    #[default]
    Legendre,
    /// `sqrt((2l+1)/4π) P_l(cos el)`: the real orthonormal spherical
    /// harmonics with `m = 0`.
    Orthonormal,
}

impl Normalisation {
    pub fn factor(self, l: usize) -> f64 {
        match self {
            Self::Legendre    => 1.0,
            Self::Orthonormal => ((2 * l + 1) as f64 / (4.0 * PI)).sqrt(),
        }
    }
}

impl std::str::FromStr for Normalisation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legendre"    => Ok(Self::Legendre),
            "orthonormal" => Ok(Self::Orthonormal),
            _ => Err(format!("unknown normalisation `{s}`: expected `legendre` or `orthonormal`")),
        }
    }
}

/// Legendre polynomials `P_l(x)` and their derivatives `P'_l(x)` for
/// `l = 0 ..= lmax`.
pub fn legendre(lmax: usize, x: f64) -> (Vec<f64>, Vec<f64>) {
    let mut p = vec![0.0; lmax + 1];
    let mut d = vec![0.0; lmax + 1];
    p[0] = 1.0;
    if lmax > 0 {
        p[1] = x;
        d[1] = 1.0;
    }
    for n in 1..lmax {
        let nf = n as f64;
        p[n+1] = ((2.0 * nf + 1.0) * x * p[n] - nf * p[n-1]) / (nf + 1.0);
        d[n+1] = d[n-1] + (2.0 * nf + 1.0) * p[n];
    }
    (p, d)
}

/// Fill row `i` of `amp` (and of `deriv`, if given) with the basis evaluated
/// at elevation `els[i]`.
fn fill(mut amp: Option<&mut DMatrix<f64>>, mut deriv: Option<&mut DMatrix<f64>>, els: &[f64], lmax: usize, norm: Normalisation) {
    for (i, &el) in els.iter().enumerate() {
        let (sin, cos) = el.sin_cos();
        let (p, d) = legendre(lmax, cos);
        for l in (0..=lmax).step_by(2) {
            let k = norm.factor(l);
            let j = index(l);
            if let Some(amp) = amp.as_deref_mut() { amp[(i, j)] = k * p[l] }
            // d/d(el) P_l(cos el) = -sin(el) P'_l(cos el)
            if let Some(deriv) = deriv.as_deref_mut() { deriv[(i, j)] = -k * sin * d[l] }
        }
    }
}

/// Map from coefficients to amplitudes at elevations `els`: an
/// `els.len() × n_for_l(lmax)` matrix.
pub fn amp_transform(els: &[f64], lmax: usize, norm: Normalisation) -> DMatrix<f64> {
    let mut amp = DMatrix::zeros(els.len(), n_for_l(lmax));
    fill(Some(&mut amp), None, els, lmax, norm);
    amp
}

/// As `amp_transform`, writing into an existing matrix of the right shape.
pub fn amp_transform_into(amp: &mut DMatrix<f64>, els: &[f64], lmax: usize, norm: Normalisation) {
    debug_assert_eq!(amp.shape(), (els.len(), n_for_l(lmax)));
    fill(Some(amp), None, els, lmax, norm);
}

/// Map from coefficients to the derivative of the amplitude with respect to
/// elevation, at elevations `els`.
pub fn deriv_transform(els: &[f64], lmax: usize, norm: Normalisation) -> DMatrix<f64> {
    let mut deriv = DMatrix::zeros(els.len(), n_for_l(lmax));
    fill(None, Some(&mut deriv), els, lmax, norm);
    deriv
}

/// Amplitude of the profile `coefficients` at elevation `el`.
pub fn amplitude(coefficients: &DVector<f64>, el: f64, norm: Normalisation) -> f64 {
    let lmax = l_for_n(coefficients.len());
    (amp_transform(&[el], lmax, norm) * coefficients)[0]
}

/// Derivative with respect to elevation of the profile `coefficients` at
/// elevation `el`.
pub fn derivative(coefficients: &DVector<f64>, el: f64, norm: Normalisation) -> f64 {
    let lmax = l_for_n(coefficients.len());
    (deriv_transform(&[el], lmax, norm) * coefficients)[0]
}

/// `n` evenly spaced elevations covering `[0, π/2]`, both ends included.
pub fn hemisphere_elevations(n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![0.0],
        _ => {
            let step = FRAC_PI_2 / (n - 1) as f64;
            (0..n).map(|i| i as f64 * step).collect()
        }
    }
}
