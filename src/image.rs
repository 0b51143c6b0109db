//! The three images an estimation reads from: amplitudes, single-fibre mask,
//! and fibre directions.

use ndarray::{Array3, Array4, ArrayD, Axis, Ix3};
use sphere::Vector;

use crate::error::{Error, Result};
use crate::index::{Dims, Index3};
use crate::shells::Shell;

pub type Amplitudef32 = f32;

/// Input images with consistent spatial dimensions.
///
/// * `amps`: `[x, y, z, volume]` diffusion-weighted amplitudes
/// * `mask`: `[x, y, z]` voxels to be used
/// * `fibres`: `[x, y, z, 3+]` fibre direction in the first three volumes
#[derive(Clone, Debug)]
pub struct Images {
    pub amps:   Array4<Amplitudef32>,
    pub mask:   Array3<bool>,
    pub fibres: Array4<f32>,
}

impl Images {

    pub fn new(amps: Array4<Amplitudef32>, mask: Array3<bool>, fibres: Array4<f32>) -> Result<Self> {
        let dims = spatial(amps.shape());
        check_dims("mask", &dims, mask.shape())?;
        check_dims("fibre direction image", &dims, &fibres.shape()[..3])?;
        if fibres.shape()[3] < 3 {
            return Err(Error::DimensionMismatch {
                what: "fibre direction image volumes (need at least 3)".into(),
                expected: vec![3],
                found: vec![fibres.shape()[3]],
            })
        }
        Ok(Self { amps, mask, fibres })
    }

    pub fn dims(&self) -> Dims { spatial(self.amps.shape()) }

    pub fn n_volumes(&self) -> usize { self.amps.shape()[3] }

    pub fn count_masked(&self) -> usize { self.mask.iter().filter(|&&m| m).count() }

    /// Unit fibre direction in voxel `[x, y, z]`, or `None` if the stored
    /// vector has zero length or non-finite components.
    pub fn fibre(&self, [x, y, z]: Index3) -> Option<Vector> {
        let f = |i| self.fibres[[x, y, z, i]] as f64;
        let v = Vector::new(f(0), f(1), f(2));
        let norm = v.norm();
        (norm > 0.0 && norm.is_finite()).then(|| v / norm)
    }

    /// Ensure that every volume index of `shell` exists in the amplitude
    /// image.
    pub fn check_volumes(&self, shell: &Shell) -> Result<()> {
        let n = self.n_volumes();
        match shell.volumes.iter().copied().find(|&v| v >= n) {
            Some(v) => Err(Error::DimensionMismatch {
                what: "volume index referenced by shell".into(),
                expected: vec![n],
                found: vec![v],
            }),
            None => Ok(()),
        }
    }
}

/// Accept a 3d mask, or a 4d one with a single volume.
pub fn squeeze_mask(mask: ArrayD<bool>) -> Result<Array3<bool>> {
    let shape = mask.shape().to_vec();
    let mask = if shape.len() == 4 && shape[3] == 1 { mask.index_axis_move(Axis(3), 0) }
               else                                 { mask };
    mask.into_dimensionality::<Ix3>().map_err(|_| Error::DimensionMismatch {
        what: "number of mask axes (must be 3D, or 4D with one volume)".into(),
        expected: vec![3],
        found: vec![shape.len()],
    })
}

fn spatial(shape: &[usize]) -> Dims { [shape[0], shape[1], shape[2]] }

fn check_dims(what: &str, expected: &Dims, found: &[usize]) -> Result<()> {
    if found != expected {
        return Err(Error::DimensionMismatch {
            what: what.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};
    use rstest::rstest;

    fn images(amps: [usize; 4], mask: [usize; 3], fibres: [usize; 4]) -> Result<Images> {
        Images::new(Array4::zeros(amps), Array3::from_elem(mask, true), Array4::zeros(fibres))
    }

    #[test]
    fn consistent_dimensions() {
        let images = images([2, 3, 4, 5], [2, 3, 4], [2, 3, 4, 3]).unwrap();
        assert_eq!(images.dims(), [2, 3, 4]);
        assert_eq!(images.n_volumes(), 5);
        assert_eq!(images.count_masked(), 24);
    }

    #[rstest(/**/ amps       , mask     , fibres,
             case([2, 3, 4, 5], [2, 3, 5], [2, 3, 4, 3]),
             case([2, 3, 4, 5], [2, 3, 4], [3, 3, 4, 3]),
             case([2, 3, 4, 5], [2, 3, 4], [2, 3, 4, 2]),
    )]
    fn inconsistent_dimensions(amps: [usize; 4], mask: [usize; 3], fibres: [usize; 4]) {
        assert!(matches!(images(amps, mask, fibres), Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn fibre_is_normalized() {
        let mut images = images([1, 1, 2, 1], [1, 1, 2], [1, 1, 2, 4]).unwrap();
        images.fibres[[0, 0, 0, 0]] = 3.0;
        images.fibres[[0, 0, 0, 1]] = 4.0;
        images.fibres[[0, 0, 0, 3]] = 99.0; // Ignored: only the first 3 volumes are used
        let f = images.fibre([0, 0, 0]).unwrap();
        assert!((f - Vector::new(0.6, 0.8, 0.0)).norm() < 1e-12);
        // Zero vector is unusable
        assert_eq!(images.fibre([0, 0, 1]), None);
    }

    #[test]
    fn volume_indices_are_checked() {
        let images = images([1, 1, 1, 3], [1, 1, 1], [1, 1, 1, 3]).unwrap();
        let ok  = Shell::from_directions(vec![Vector::x(), Vector::y(), Vector::z()]);
        let bad = Shell::new(None, false, vec![Vector::x()], vec![3]).unwrap();
        assert!(images.check_volumes(&ok).is_ok());
        assert!(matches!(images.check_volumes(&bad), Err(Error::DimensionMismatch { .. })));
    }

    #[rstest(/**/ shape             , ok,
             case(vec![2, 3, 4]   , true ),
             case(vec![2, 3, 4, 1], true ),
             case(vec![2, 3, 4, 2], false),
             case(vec![2, 3]      , false),
    )]
    fn mask_dimensionality(shape: Vec<usize>, ok: bool) {
        let mask = Array::from_elem(IxDyn(&shape), true);
        let squeezed = squeeze_mask(mask);
        assert_eq!(squeezed.is_ok(), ok);
        if let Ok(mask) = squeezed { assert_eq!(mask.shape(), &[2, 3, 4]) }
    }
}
