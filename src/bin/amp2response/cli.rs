#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "amp2response", about = "Estimate response function coefficients for single-fibre voxels")]
pub struct Cli {

    /// Diffusion-weighted amplitudes: `file.h5[:dataset]`, 4D
    pub amps: Source,

    /// Single-fibre voxels: `file.h5[:dataset]`, 3D, non-zero where selected
    pub mask: Source,

    /// Fibre direction in each voxel: `file.h5[:dataset]`, first 3 volumes
    pub fibres: Source,

    /// Where to write the response coefficients, one row per shell
    pub response: PathBuf,

    /// Estimate an isotropic response function (lmax = 0 for all shells)
    #[clap(long)]
    pub isotropic: bool,

    /// Disable the non-negativity and monotonicity constraints
    #[clap(long)]
    pub noconstraint: bool,

    /// Sampling directions, one `az el` or `x y z` row per volume, overriding
    /// any held in the amplitude image metadata
    #[clap(long)]
    pub directions: Option<PathBuf>,

    /// TOML shell table, used when no other source of directions is available
    #[clap(long)]
    pub shells: Option<PathBuf>,

    /// Maximum harmonic degree of each shell, comma-separated (e.g. 0,8,8)
    #[clap(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub lmax: Option<Vec<i32>>,

    /// Complete the fibre-aligned frame deterministically, rather than with a
    /// random auxiliary vector
    #[clap(long)]
    pub deterministic: bool,

    /// Basis normalisation: `legendre` or `orthonormal`
    #[clap(long, default_value = "legendre")]
    pub normalisation: Normalisation,

    /// Number of elevations at which the constraints are imposed
    #[clap(long, default_value = "91")]
    pub constraint_samples: usize,

    /// Iteration limit of the constrained solver
    #[clap(long, default_value = "1000")]
    pub max_iterations: usize,

    /// Maximum number of rayon threads
    #[clap(short = 'j', long)]
    pub n_threads: Option<usize>,

    /// Show a progress bar while accumulating voxels
    #[clap(long)]
    pub progress: bool,
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::path::PathBuf;

use amp2response::{
    io::hdf5::Source,
    Normalisation,
};
