//! Sampling schemes of b-value shells, and the choice of harmonic degree for
//! each of them

use log::warn;
use sphere::{AzEl, Vector};

use crate::error::{Error, Result};

/// Degree used for every non-b=0 shell when none is requested
pub const DEFAULT_LMAX: usize = 10;

/// Shells with a b-value at or below this are taken to be b=0 when the
/// classification is not given explicitly
pub const DEFAULT_BZERO_THRESHOLD: f64 = 10.0;

/// The directions sampled on one shell, and where in the 4th dimension of the
/// amplitude image the corresponding samples live.
#[derive(Clone, Debug)]
pub struct Shell {
    /// Mean b-value, if known
    pub b_value: Option<f64>,
    /// Whether the upstream classification put this shell at b=0
    pub bzero: bool,
    /// Unit vectors, one per sample
    pub directions: Vec<Vector>,
    /// Volume index of each sample, in the same order as `directions`
    pub volumes: Vec<usize>,
}

impl Shell {

    pub fn new(b_value: Option<f64>, bzero: bool, directions: Vec<Vector>, volumes: Vec<usize>) -> Result<Self> {
        if directions.len() != volumes.len() {
            return Err(Error::DimensionMismatch {
                what: "shell volume list".into(),
                expected: vec![directions.len()],
                found: vec![volumes.len()],
            })
        }
        Ok(Self { b_value, bzero, directions, volumes })
    }

    /// A shell of unknown b-value whose samples occupy volumes `0..n`, in
    /// order.
    pub fn from_directions(directions: Vec<Vector>) -> Self {
        let volumes = (0..directions.len()).collect();
        Self { b_value: None, bzero: false, directions, volumes }
    }

    pub fn id(&self, index: usize) -> ShellId { ShellId { index, b_value: self.b_value } }

    /// Elevations of the directions in the acquisition frame
    pub fn elevations(&self) -> Vec<f64> {
        self.directions.iter().map(|d| AzEl::from_cartesian(d).el).collect()
    }
}

/// Identifies a shell in diagnostics
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShellId {
    pub index: usize,
    pub b_value: Option<f64>,
}

impl std::fmt::Display for ShellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.b_value {
            Some(b) => write!(f, "shell {} (b={})", self.index, b.round()),
            None    => write!(f, "shell {}", self.index),
        }
    }
}

/// Interpret rows of a direction table: either `[azimuth, elevation]` or
/// Cartesian `[x, y, z]`, which is normalized.
///
/// A zero Cartesian row is kept as the zero vector. Gradient tables commonly
/// give b=0 volumes no direction; such a sample has no elevation, so it is
/// usable only by a degree-zero fit (see `response::validate_basis`).
pub fn directions_from_rows<R: AsRef<[f64]>>(rows: &[R], source: &str) -> Result<Vec<Vector>> {
    rows.iter()
        .enumerate()
        .map(|(n, row)| match *row.as_ref() {
            [az, el]   => Ok(AzEl::new(az, el).to_cartesian()),
            [x, y, z]  => {
                let v = Vector::new(x, y, z);
                if v == Vector::zeros() { Ok(v) } else { Ok(v.normalize()) }
            },
            ref other  => Err(Error::MatrixParse {
                path: source.into(),
                reason: format!("direction {n} has {} columns, expected 2 (az, el) or 3 (x, y, z)", other.len()),
            }),
        })
        .collect()
}

/// Choose the maximum harmonic degree of each shell's response.
///
/// * `isotropic`: every shell gets 0.
/// * `requested`: one even, non-negative degree per shell.
/// * otherwise: `DEFAULT_LMAX`, except that a b=0 first shell gets 0.
pub fn resolve_lmax(shells: &[Shell], isotropic: bool, requested: Option<&[i32]>) -> Result<Vec<usize>> {
    if isotropic {
        return Ok(vec![0; shells.len()])
    }
    if let Some(requested) = requested {
        if requested.len() != shells.len() {
            return Err(Error::ShellCountMismatch { given: requested.len(), shells: shells.len() })
        }
        let mut lmax = Vec::with_capacity(shells.len());
        for (index, (shell, &l)) in shells.iter().zip(requested).enumerate() {
            if l < 0 || l % 2 != 0 {
                return Err(Error::InvalidDegree { shell: shell.id(index), lmax: l })
            }
            if shell.bzero && l > 0 {
                warn!("Non-zero lmax ({l}) requested for {}, which has been classified as b=0;", shell.id(index));
                warn!("  unless intended, this is likely to fail, as b=0 contains no orientation contrast");
            }
            lmax.push(l as usize);
        }
        return Ok(lmax)
    }
    // The amplitude transform is not inverted per voxel, so the degree is not
    // limited by the number of directions on a shell
    Ok(shells.iter()
       .enumerate()
       .map(|(i, shell)| if i == 0 && shell.bzero { 0 } else { DEFAULT_LMAX })
       .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn shell(b: f64) -> Shell {
        let dirs = vec![Vector::x(), Vector::y(), Vector::z()];
        Shell::new(Some(b), b <= DEFAULT_BZERO_THRESHOLD, dirs, vec![0, 1, 2]).unwrap()
    }

    fn shells(bs: &[f64]) -> Vec<Shell> { bs.iter().copied().map(shell).collect() }

    #[rstest(/**/ bs                       , isotropic, requested            , expected,
             // Isotropic overrides everything
             case(&[0.0, 1000.0, 3000.0], true , None                 , vec![0, 0, 0]),
             case(&[0.0, 1000.0, 3000.0], true , Some(&[2, 4, 6][..]) , vec![0, 0, 0]),
             // Explicit degrees are used as given
             case(&[0.0, 1000.0, 3000.0], false, Some(&[0, 8, 6][..]) , vec![0, 8, 6]),
             case(&[         1000.0    ], false, Some(&[4][..])       , vec![4]),
             // Requesting non-zero degree at b=0 is allowed
             case(&[0.0, 1000.0        ], false, Some(&[2, 8][..])    , vec![2, 8]),
             // Auto: 10 everywhere, except a leading b=0 shell
             case(&[0.0, 1000.0, 3000.0], false, None                 , vec![0, 10, 10]),
             case(&[0.0                ], false, None                 , vec![0]),
             case(&[1000.0, 3000.0     ], false, None                 , vec![10, 10]),
             case(&[1000.0, 0.0        ], false, None                 , vec![10, 10]),
    )]
    fn degree_resolution(bs: &[f64], isotropic: bool, requested: Option<&[i32]>, expected: Vec<usize>) {
        assert_eq!(resolve_lmax(&shells(bs), isotropic, requested).unwrap(), expected);
    }

    // Records every log message emitted by the test binary
    struct Capture;
    static CAPTURED: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool { true }
        fn log(&self, record: &log::Record) {
            CAPTURED.lock().unwrap().push(record.args().to_string());
        }
        fn flush(&self) {}
    }

    fn captured(pattern: &str) -> Vec<String> {
        CAPTURED.lock().unwrap().iter().filter(|m| m.contains(pattern)).cloned().collect()
    }

    #[test]
    fn bzero_with_non_zero_degree_is_warned_about() {
        static LOGGER: Capture = Capture;
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Warn);

        let lmax = resolve_lmax(&shells(&[3.0, 7.0, 1000.0]), false, Some(&[0, 6, 8])).unwrap();
        assert_eq!(lmax, vec![0, 6, 8]);

        let warned = captured("shell 1 (b=7)");
        assert_eq!(warned, vec!["Non-zero lmax (6) requested for shell 1 (b=7), which has been classified as b=0;"]);
        assert!(captured("(b=3)").is_empty());
    }

    #[test]
    fn too_few_degrees() {
        let result = resolve_lmax(&shells(&[0.0, 1000.0, 3000.0]), false, Some(&[0, 8]));
        assert!(matches!(result, Err(Error::ShellCountMismatch { given: 2, shells: 3 })));
    }

    #[rstest(/**/ requested, bad,
             case(&[0, 3, 8],  3),
             case(&[0, 8, -2], -2),
    )]
    fn invalid_degree(requested: &[i32], bad: i32) {
        let result = resolve_lmax(&shells(&[0.0, 1000.0, 3000.0]), false, Some(requested));
        match result {
            Err(Error::InvalidDegree { lmax, .. }) => assert_eq!(lmax, bad),
            other => panic!("expected InvalidDegree, got {other:?}"),
        }
    }

    #[test]
    fn volume_count_must_match_directions() {
        let result = Shell::new(None, false, vec![Vector::x(), Vector::y()], vec![0]);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn direction_rows() {
        let rows = vec![vec![0.0, 0.0], vec![0.0, 0.0, 2.0], vec![std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2]];
        let dirs = directions_from_rows(&rows, "test").unwrap();
        assert_eq!(dirs[0], Vector::z());
        assert_eq!(dirs[1], Vector::z());
        assert!((dirs[2] - Vector::y()).norm() < 1e-12);

        let bad = directions_from_rows(&[vec![1.0, 2.0, 3.0, 4.0]], "test");
        assert!(matches!(bad, Err(Error::MatrixParse { .. })));
    }

    #[test]
    fn zero_direction_rows_are_kept() {
        let dirs = directions_from_rows(&[[0.0, 0.0, 0.0], [0.0, 3.0, 0.0]], "test").unwrap();
        assert_eq!(dirs, vec![Vector::zeros(), Vector::y()]);
    }

    #[test]
    fn shell_id_display() {
        assert_eq!(shell(1000.0).id(2).to_string(), "shell 2 (b=1000)");
        assert_eq!(Shell::from_directions(vec![Vector::z()]).id(0).to_string(), "shell 0");
    }
}
