use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Rotation, Vector};

/// How the two axes orthogonal to the fibre are chosen when building a
/// fibre-aligned frame.
///
/// Only the elevation of a rotated direction matters to an axially symmetric
/// profile, so the choice affects results at the level of rounding error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameCompletion {
    /// Auxiliary vector drawn from a standard normal distribution, using the
    /// thread-local generator. Not reproducible across runs.
    #[default]
    Random,
    /// Auxiliary vector is the coordinate axis least aligned with the fibre.
    Deterministic,
}

impl FrameCompletion {
    /// Rotation which maps the unit vector `dir` onto +z, or `None` when
    /// `dir` is zero-length or has non-finite components.
    pub fn rotation_to_z(self, dir: &Vector) -> Option<Rotation> {
        match self {
            Self::Random        => rotation_to_z_random(dir, &mut rand::thread_rng()),
            Self::Deterministic => has_frame(dir).then(|| rotation_to_z(dir, &least_aligned_axis(dir))),
        }
    }
}

/// Whether `dir` defines a frame: finite, with non-zero length.
pub fn has_frame(dir: &Vector) -> bool {
    dir.iter().all(|c| c.is_finite()) && dir.norm_squared() > 0.0
}

/// Rotation which maps the unit vector `dir` onto +z.
///
/// Rows are `normalize(dir × aux)`, `normalize(dir × row0)` and `dir`. The
/// result is orthonormal as long as `dir` has unit length and `aux` is not
/// parallel to it.
pub fn rotation_to_z(dir: &Vector, aux: &Vector) -> Rotation {
    let row0 = dir.cross(aux).normalize();
    let row1 = dir.cross(&row0).normalize();
    Rotation::from_rows(&[row0.transpose(), row1.transpose(), dir.transpose()])
}

// Draws of the auxiliary vector before settling for the least aligned axis
const MAX_DRAWS: usize = 32;

/// As `rotation_to_z`, completing the frame with a normally distributed
/// auxiliary vector drawn from `rng`. `None` when `dir` has no frame (see
/// `has_frame`).
pub fn rotation_to_z_random<R: Rng + ?Sized>(dir: &Vector, rng: &mut R) -> Option<Rotation> {
    let draws = std::iter::repeat_with(|| Vector::new(rng.sample(StandardNormal),
                                                      rng.sample(StandardNormal),
                                                      rng.sample(StandardNormal)));
    rotation_to_z_first_usable(dir, draws)
}

// The first of `candidates` not parallel to `dir` completes the frame. After
// `MAX_DRAWS` unusable candidates, the least aligned axis is used instead.
fn rotation_to_z_first_usable(dir: &Vector, candidates: impl IntoIterator<Item = Vector>) -> Option<Rotation> {
    if !has_frame(dir) { return None }
    let aux = candidates.into_iter()
        .take(MAX_DRAWS)
        .find(|aux| dir.cross(aux).norm_squared() > 1e-12 * aux.norm_squared())
        .unwrap_or_else(|| least_aligned_axis(dir));
    Some(rotation_to_z(dir, &aux))
}

/// The coordinate axis corresponding to the smallest component of `dir`.
pub fn least_aligned_axis(dir: &Vector) -> Vector {
    let index = dir.iamin();
    let mut axis = Vector::zeros();
    axis[index] = 1.0;
    axis
}
