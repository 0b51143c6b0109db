use std::f64::consts::{FRAC_PI_2, PI};

use crate::{Rotation, Vector};

/// A direction expressed as azimuth (in the xy-plane, from +x) and elevation
/// (polar angle, from +z).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AzEl {
    pub az: f64,
    pub el: f64,
}

impl AzEl {

    pub fn new(az: f64, el: f64) -> Self { Self { az, el } }

    pub fn to_cartesian(self) -> Vector {
        let Self { az, el } = self;
        let s = el.sin();
        Vector::new(s * az.cos(), s * az.sin(), el.cos())
    }

    /// Need not be normalized; a zero vector gives NaN angles.
    pub fn from_cartesian(v: &Vector) -> Self {
        let r = v.norm();
        // Rounding may push |z/r| just past 1 after a rotation
        let el = (v.z / r).clamp(-1.0, 1.0).acos();
        Self { az: v.y.atan2(v.x), el }
    }

    /// Map a direction in the lower hemisphere onto its antipode, so that
    /// `el` lies in `[0, π/2]`.
    pub fn folded(self) -> Self {
        let Self { mut az, mut el } = self;
        if el > FRAC_PI_2 {
            if az > PI { az -= PI }
            else       { az += PI }
            el = PI - el;
        }
        Self { az, el }
    }
}

/// Elevations of `dirs` after rotation by `rotation`, folded onto the upper
/// hemisphere. Written into `out`, which is cleared first.
pub fn folded_elevations(rotation: &Rotation, dirs: &[Vector], out: &mut Vec<f64>) {
    out.clear();
    out.extend(dirs.iter()
               .map(|d| rotation * d)
               .map(|r| AzEl::from_cartesian(&r).folded().el));
}
