//! Geometry on the unit sphere, as needed for estimating axially symmetric
//! response functions: rotations into a fibre-aligned frame, spherical
//! coordinates with hemisphere folding, and the zonal spherical harmonic
//! basis.

mod direction;
mod rotation;
pub mod zsh;

pub use direction::{AzEl, folded_elevations};
pub use rotation::{FrameCompletion, has_frame, rotation_to_z, rotation_to_z_random, least_aligned_axis};

pub type Vector   = nalgebra::Vector3<f64>;
pub type Rotation = nalgebra::Matrix3<f64>;
