use thiserror::Error;

use crate::shells::ShellId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {

    #[error("Number of lmax's specified ({given}) does not match number of b-value shells ({shells})")]
    ShellCountMismatch { given: usize, shells: usize },

    #[error("lmax {lmax} requested for {shell} is invalid: values must be non-negative and even")]
    InvalidDegree { shell: ShellId, lmax: i32 },

    #[error("Unable to construct amplitude transform for {shell}: lmax ({lmax}) may be too large for this shell{hint}",
            hint = bzero_hint(.bzero))]
    IllConditionedBasis { shell: ShellId, lmax: usize, bzero: bool },

    #[error("Input mask does not contain any voxels")]
    EmptyMask,

    #[error("Dimensions of {what} {found:?} do not match {expected:?}")]
    DimensionMismatch { what: String, expected: Vec<usize>, found: Vec<usize> },

    #[error("Normal equations for {shell} (lmax {lmax}, {voxels} voxels) are not positive definite")]
    SingularSystem { shell: ShellId, lmax: usize, voxels: usize },

    #[error("Constrained fit for {shell} (lmax {lmax}) did not converge within {iterations} iterations")]
    ConstraintInfeasible { shell: ShellId, lmax: usize, iterations: usize },

    #[error("No sampling directions: supply --directions, --shells, or a `directions` attribute on the amplitude dataset")]
    NoDirections,

    #[error("Malformed matrix in {path}: {reason}")]
    MatrixParse { path: String, reason: String },

    #[error("Shell table: {0}")]
    Config(#[from] toml::de::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn bzero_hint(bzero: &bool) -> &'static str {
    if *bzero { " (this appears to be a b=0 shell, and therefore lmax should be set to 0 for this shell)" }
    else      { "" }
}
