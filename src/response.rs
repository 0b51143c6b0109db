//! Per-shell estimation of response functions, and their assembly into one
//! matrix.

use itertools::Itertools;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};

use sphere::{zsh::{self, Normalisation}, FrameCompletion};

use crate::accumulate::Accumulator;
use crate::error::{Error, Result};
use crate::image::Images;
use crate::index::n_voxels;
use crate::shells::{resolve_lmax, Shell, ShellId};
use crate::solve::{solve, IclsSettings, Method, SolveError};
use crate::utils::{group_digits, progress_bar};

/// Choices which affect how responses are estimated
#[derive(Clone, Debug)]
pub struct Options {
    /// Estimate only the degree-zero term of every shell
    pub isotropic: bool,
    /// One maximum degree per shell; chosen automatically when `None`
    pub lmax: Option<Vec<i32>>,
    /// Require non-negative profiles which do not decrease away from the
    /// fibre axis
    pub constrained: bool,
    pub completion: FrameCompletion,
    pub normalisation: Normalisation,
    pub icls: IclsSettings,
    /// Show a progress bar during accumulation
    pub progress: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            isotropic: false,
            lmax: None,
            constrained: true,
            completion: FrameCompletion::default(),
            normalisation: Normalisation::default(),
            icls: IclsSettings::default(),
            progress: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShellResponse {
    pub shell: ShellId,
    pub lmax: usize,
    /// Voxels which contributed
    pub voxels: usize,
    /// Masked voxels left out because of an unusable fibre direction
    pub skipped: usize,
    pub method: Method,
    /// `n_for_l(lmax)` coefficients, without padding
    pub coefficients: DVector<f64>,
}

/// The responses of all shells. Row `i` of `matrix` holds the coefficients of
/// `shells[i]`, padded with zeros up to the largest degree of any shell.
#[derive(Clone, Debug, PartialEq)]
pub struct Responses {
    pub shells: Vec<ShellResponse>,
    pub matrix: DMatrix<f64>,
}

/// Fail early if the amplitude transform of `shell` cannot be evaluated at
/// degree `lmax`.
pub fn validate_basis(shell: &Shell, id: ShellId, lmax: usize, norm: Normalisation) -> Result<()> {
    let transform = zsh::amp_transform(&shell.elevations(), lmax, norm);
    if transform.iter().all(|x| x.is_finite()) { Ok(()) }
    else {
        Err(Error::IllConditionedBasis { shell: id, lmax, bzero: shell.bzero })
    }
}

/// Estimate the response function of every shell from the single-fibre
/// voxels selected by `images.mask`.
pub fn estimate(images: &Images, shells: &[Shell], options: &Options) -> Result<Responses> {
    let lmaxes = resolve_lmax(shells, options.isotropic, options.lmax.as_deref())?;
    for shell in shells {
        images.check_volumes(shell)?;
    }
    let masked = images.count_masked();
    if masked == 0 {
        return Err(Error::EmptyMask)
    }
    info!("Estimating responses of {} shell(s) from {} masked voxels", shells.len(), group_digits(masked));

    let max_lmax = lmaxes.iter().copied().max().unwrap_or(0);
    let mut matrix = DMatrix::zeros(shells.len(), zsh::n_for_l(max_lmax));
    let mut responses = Vec::with_capacity(shells.len());
    let label_shells = shells.len() > 1 && shells.iter().all(|s| s.b_value.is_some());

    for (index, (shell, &lmax)) in shells.iter().zip(&lmaxes).enumerate() {
        let id = shell.id(index);
        validate_basis(shell, id, lmax, options.normalisation)?;

        let progress = progress_bar(options.progress, n_voxels(images.dims()) as u64);
        let accumulator = Accumulator::new(images, shell, lmax, options.normalisation, options.completion);
        let equations = accumulator.run(&progress);
        progress.finish_and_clear();

        if equations.skipped > 0 {
            warn!("{}: skipped {} masked voxels with zero-length or non-finite fibre direction",
                  id, group_digits(equations.skipped));
        }

        let (coefficients, method) = solve(&equations, lmax, options.constrained, options.normalisation, &options.icls)
            .map_err(|e| match e {
                SolveError::Singular => Error::SingularSystem { shell: id, lmax, voxels: equations.count },
                SolveError::Infeasible { iterations } => Error::ConstraintInfeasible { shell: id, lmax, iterations },
            })?;

        let prefix = match shell.b_value {
            Some(b) if label_shells => format!("Shell b={}: ", b.round()),
            _ => String::new(),
        };
        info!("{prefix}Response function [{}] solved {}",
              coefficients.iter().join(" "),
              describe(method, equations.count));

        matrix.view_mut((index, 0), (1, coefficients.len())).copy_from(&coefficients.transpose());
        responses.push(ShellResponse {
            shell: id,
            lmax,
            voxels: equations.count,
            skipped: equations.skipped,
            method,
            coefficients,
        });
    }
    Ok(Responses { shells: responses, matrix })
}

fn describe(method: Method, voxels: usize) -> String {
    let voxels = group_digits(voxels);
    match method {
        Method::Average                   => format!("from average of {voxels} voxels"),
        Method::LeastSquares              => format!("via ordinary least-squares from {voxels} voxels"),
        Method::Constrained { iterations} => format!("after {iterations} constraint iterations from {voxels} voxels"),
    }
}
