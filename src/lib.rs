//! Estimation of single-fibre response functions, as zonal spherical harmonic
//! coefficients, from diffusion-weighted amplitudes in single-fibre voxels.

mod exports;
pub use exports::*;

pub mod accumulate;
pub mod config;
pub mod error;
pub mod image;
pub mod index;
pub mod io;
pub mod response;
pub mod shells;
pub mod solve;
pub mod utils;
