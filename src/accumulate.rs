//! Streaming accumulation of the least-squares normal equations for one shell.
//!
//! Concatenating the transforms of all voxels into a single design matrix
//! would need memory proportional to voxels × directions. Only `TᵀT` and
//! `Tᵀs` are needed for the fit, and both are sums of per-voxel terms, so
//! they are accumulated voxel by voxel instead.

use std::ops::{Add, AddAssign};

use indicatif::ProgressBar;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use sphere::{folded_elevations, zsh::{self, Normalisation}, FrameCompletion};

use crate::image::Images;
use crate::index::{index1_to_3, n_voxels, Index1};
use crate::shells::Shell;

/// The system `M x = b` of a least-squares fit, built up one voxel at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalEquations {
    /// Sum of `TᵀT` over contributing voxels
    pub m: DMatrix<f64>,
    /// Sum of `Tᵀs` over contributing voxels
    pub b: DVector<f64>,
    /// Number of contributing voxels
    pub count: usize,
    /// Masked voxels which could not contribute, because their fibre
    /// direction was unusable
    pub skipped: usize,
}

impl NormalEquations {

    pub fn zeros(n_coefficients: usize) -> Self {
        Self {
            m: DMatrix::zeros(n_coefficients, n_coefficients),
            b: DVector::zeros(n_coefficients),
            count: 0,
            skipped: 0,
        }
    }

    /// Add one voxel's samples `signal`, whose relation to the coefficients
    /// is given by `transform`.
    pub fn add_voxel(&mut self, transform: &DMatrix<f64>, signal: &DVector<f64>) {
        self.b.gemv_tr(1.0, transform, signal, 1.0);
        self.m.gemm_tr(1.0, transform, transform, 1.0);
        self.count += 1;
    }
}

impl AddAssign<&NormalEquations> for NormalEquations {
    fn add_assign(&mut self, rhs: &NormalEquations) {
        self.m += &rhs.m;
        self.b += &rhs.b;
        self.count   += rhs.count;
        self.skipped += rhs.skipped;
    }
}

impl Add for NormalEquations {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self { self += &rhs; self }
}

/// Everything needed to turn one shell's samples in any voxel into a
/// contribution to that shell's normal equations.
pub struct Accumulator<'a> {
    images: &'a Images,
    shell: &'a Shell,
    lmax: usize,
    normalisation: Normalisation,
    completion: FrameCompletion,
}

// Per-thread state of the parallel fold: the partial sums, plus scratch space
// reused across voxels
struct Worker {
    equations: NormalEquations,
    elevations: Vec<f64>,
    transform: DMatrix<f64>,
    signal: DVector<f64>,
    visited: u64,
}

impl<'a> Accumulator<'a> {

    pub fn new(images: &'a Images, shell: &'a Shell, lmax: usize, normalisation: Normalisation, completion: FrameCompletion) -> Self {
        Self { images, shell, lmax, normalisation, completion }
    }

    fn worker(&self) -> Worker {
        let n_dirs = self.shell.directions.len();
        let n_coefficients = zsh::n_for_l(self.lmax);
        Worker {
            equations: NormalEquations::zeros(n_coefficients),
            elevations: Vec::with_capacity(n_dirs),
            transform: DMatrix::zeros(n_dirs, n_coefficients),
            signal: DVector::zeros(n_dirs),
            visited: 0,
        }
    }

    fn visit(&self, mut worker: Worker, voxel: Index1) -> Worker {
        worker.visited += 1;
        let [x, y, z] = index1_to_3(voxel, self.images.dims());
        if !self.images.mask[[x, y, z]] { return worker }

        // Express the sampling directions in a frame where the fibre lies along z
        let frame = self.images.fibre([x, y, z]).and_then(|fibre| self.completion.rotation_to_z(&fibre));
        let Some(rotation) = frame else {
            worker.equations.skipped += 1;
            return worker
        };
        folded_elevations(&rotation, &self.shell.directions, &mut worker.elevations);
        zsh::amp_transform_into(&mut worker.transform, &worker.elevations, self.lmax, self.normalisation);

        for (s, &volume) in worker.signal.iter_mut().zip(&self.shell.volumes) {
            *s = self.images.amps[[x, y, z, volume]] as f64;
        }

        worker.equations.add_voxel(&worker.transform, &worker.signal);
        worker
    }

    /// Accumulate over the whole image, in parallel over contiguous runs of
    /// voxels.
    pub fn run(&self, progress: &ProgressBar) -> NormalEquations {
        let n = n_voxels(self.images.dims());
        let job_size = job_size(n, rayon::current_num_threads());
        let empty = || NormalEquations::zeros(zsh::n_for_l(self.lmax));

        (0..n).into_par_iter()
            .fold_chunks(job_size, || self.worker(), |worker, voxel| self.visit(worker, voxel))
            .map(|worker| {
                progress.inc(worker.visited);
                worker.equations
            })
            .reduce(empty, Add::add)
    }

    /// Accumulate, on the current thread, over the given voxels.
    pub fn run_serial(&self, voxels: impl IntoIterator<Item = Index1>) -> NormalEquations {
        voxels.into_iter()
            .fold(self.worker(), |worker, voxel| self.visit(worker, voxel))
            .equations
    }
}

// Enough jobs per thread to balance uneven masks
fn job_size(n_voxels: usize, n_threads: usize) -> usize {
    (n_voxels / (4 * n_threads.max(1))).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::{Array3, Array4};
    use rand::{Rng, SeedableRng};
    use rand_isaac::IsaacRng;
    use sphere::Vector;

    // Images of `dims` voxels with random fibres and amplitudes, and a
    // random mask
    fn random_images(dims: [usize; 3], n_volumes: usize, seed: u64) -> Images {
        let [nx, ny, nz] = dims;
        let mut rng = IsaacRng::seed_from_u64(seed);
        let amps   = Array4::from_shape_fn((nx, ny, nz, n_volumes), |_| rng.gen_range(0.0..100.0));
        let fibres = Array4::from_shape_fn((nx, ny, nz, 3)        , |_| rng.gen_range(-1.0..1.0));
        let mask   = Array3::from_shape_fn((nx, ny, nz)           , |_| rng.gen_bool(0.6));
        Images::new(amps, mask, fibres).unwrap()
    }

    fn shell(n: usize) -> Shell {
        // Spiral of points over the sphere
        let dirs = (0..n).map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let phi = i as f64 * 2.399963;
            let r = (1.0 - z * z).sqrt();
            Vector::new(r * phi.cos(), r * phi.sin(), z)
        }).collect();
        Shell::from_directions(dirs)
    }

    fn assert_equations_eq(a: &NormalEquations, b: &NormalEquations) {
        assert_eq!(a.count, b.count);
        assert_eq!(a.skipped, b.skipped);
        let scale = a.m.amax().max(1.0);
        for (&x, &y) in a.m.iter().zip(b.m.iter()) { assert_float_eq!(x, y, abs <= 1e-10 * scale) }
        let scale = a.b.amax().max(1.0);
        for (&x, &y) in a.b.iter().zip(b.b.iter()) { assert_float_eq!(x, y, abs <= 1e-10 * scale) }
    }

    #[test]
    fn partitioning_does_not_matter() {
        let images = random_images([5, 4, 3], 12, 42);
        let shell = shell(12);
        let acc = Accumulator::new(&images, &shell, 6, Normalisation::Legendre, FrameCompletion::Deterministic);
        let n = 60;

        let serial   = acc.run_serial(0..n);
        let reversed = acc.run_serial((0..n).rev());
        let split    = acc.run_serial(0..17) + acc.run_serial(17..41) + acc.run_serial(41..n);
        let regroup  = acc.run_serial(41..n) + (acc.run_serial(17..41) + acc.run_serial(0..17));
        let parallel = acc.run(&ProgressBar::hidden());

        assert_eq!(serial.count, images.count_masked());
        for other in [&reversed, &split, &regroup, &parallel] {
            assert_equations_eq(&serial, other);
        }
    }

    #[test]
    fn frame_completion_does_not_matter() {
        let images = random_images([3, 3, 3], 20, 7);
        let shell = shell(20);
        let fixed  = Accumulator::new(&images, &shell, 8, Normalisation::Legendre, FrameCompletion::Deterministic).run_serial(0..27);
        let random = Accumulator::new(&images, &shell, 8, Normalisation::Legendre, FrameCompletion::Random       ).run_serial(0..27);
        assert_equations_eq(&fixed, &random);
    }

    #[test]
    fn normal_matrix_is_symmetric() {
        let images = random_images([4, 4, 2], 15, 3);
        let shell = shell(15);
        let eq = Accumulator::new(&images, &shell, 4, Normalisation::Orthonormal, FrameCompletion::Deterministic)
            .run(&ProgressBar::hidden());
        let tolerance = 1e-12 * eq.m.amax();
        for i in 0..eq.m.nrows() {
            for j in 0..i {
                assert_float_eq!(eq.m[(i, j)], eq.m[(j, i)], abs <= tolerance);
            }
        }
    }

    #[test]
    fn degree_zero_is_a_sum() {
        // Two masked voxels, one sample each: 3.0 and 5.0
        let mut amps = Array4::zeros((2, 1, 1, 1));
        amps[[0, 0, 0, 0]] = 3.0;
        amps[[1, 0, 0, 0]] = 5.0;
        let fibres = Array4::from_shape_fn((2, 1, 1, 3), |(_, _, _, i)| if i == 2 { 1.0 } else { 0.0 });
        let images = Images::new(amps, Array3::from_elem((2, 1, 1), true), fibres).unwrap();
        let shell = Shell::from_directions(vec![Vector::new(1.0, 0.0, 0.0)]);
        let eq = Accumulator::new(&images, &shell, 0, Normalisation::Legendre, FrameCompletion::Random)
            .run(&ProgressBar::hidden());
        assert_eq!(eq.count, 2);
        assert_eq!(eq.b[0], 8.0);
        assert_eq!(eq.m[(0, 0)], 2.0);
    }

    #[test]
    fn unusable_fibres_are_skipped() {
        let mut images = random_images([3, 2, 2], 6, 11);
        images.mask.fill(true);
        images.fibres.slice_mut(ndarray::s![0, 0, 0, ..]).fill(0.0);
        images.fibres[[1, 0, 0, 2]] = f32::NAN;
        let shell = shell(6);
        for completion in [FrameCompletion::Deterministic, FrameCompletion::Random] {
            let eq = Accumulator::new(&images, &shell, 2, Normalisation::Legendre, completion)
                .run(&ProgressBar::hidden());
            assert_eq!(eq.skipped, 2);
            assert_eq!(eq.count, 10);
            assert!(eq.m.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn unmasked_voxels_contribute_nothing() {
        let mut images = random_images([2, 2, 2], 5, 5);
        images.mask.fill(false);
        let shell = shell(5);
        let eq = Accumulator::new(&images, &shell, 4, Normalisation::Legendre, FrameCompletion::Deterministic)
            .run(&ProgressBar::hidden());
        assert_eq!(eq, NormalEquations::zeros(3));
    }
}
