//! Conversion between flat voxel numbers and 3d voxel indices.
//!
//! Voxels are numbered with `x` varying fastest, so contiguous ranges of flat
//! numbers are runs along `x` rows of the spatial grid.

use std::ops::{Div, Mul, Rem};

pub type Index1 = usize;
pub type Index3 = [usize; 3];
pub type Dims   = [usize; 3];

#[allow(clippy::many_single_char_names)]
pub fn index1_to_3<T>(i: T, [nx, ny, _nz]: [T; 3]) -> [T; 3]
where
    T: Mul<Output = T> +
    Div<Output = T> +
    Rem<Output = T> +
    Copy
{
    let z = i / (nx * ny);
    let r = i % (nx * ny);
    let y = r / nx;
    let x = r % nx;
    [x,y,z]
}

/// Total number of voxels in a grid
pub fn n_voxels([nx, ny, nz]: Dims) -> usize { nx * ny * nz }
