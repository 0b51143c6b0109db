/// Read image volumes, and their direction metadata, from HDF5 datasets

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ndarray::{Array2, Array3, Array4, ArrayD, Ix4};
use sphere::Vector;

use crate::error::{Error, Result};
use crate::image::squeeze_mask;
use crate::shells::directions_from_rows;

/// Dataset used when a source names only a file
pub const DEFAULT_DATASET: &str = "data";

/// Name of the optional attribute holding the sampling directions of a
/// volume series
pub const DIRECTIONS_ATTRIBUTE: &str = "directions";

/// An HDF5 dataset, written `file.h5` or `file.h5:path/to/dataset`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub file: PathBuf,
    pub dataset: String,
}

impl FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (file, dataset) = match s.split_once(':') {
            Some((file, dataset)) => (file, dataset),
            None                  => (s, DEFAULT_DATASET),
        };
        if file.is_empty() { return Err(format!("no file name in `{s}`")) }
        if dataset.trim_matches('/').is_empty() { return Err(format!("no dataset name in `{s}`")) }
        Ok(Self { file: file.into(), dataset: dataset.into() })
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.dataset)
    }
}

fn open(source: &Source) -> Result<::hdf5::Dataset> {
    let file = ::hdf5::File::open(&source.file)?;
    Ok(file.dataset(&source.dataset)?)
}

/// Read a 4-dimensional `[x, y, z, volume]` dataset.
pub fn read_f32_4d(source: &Source) -> Result<Array4<f32>> {
    let data: ArrayD<f32> = open(source)?.read_dyn::<f32>()?;
    let found = data.shape().to_vec();
    data.into_dimensionality::<Ix4>().map_err(|_| Error::DimensionMismatch {
        what: format!("number of axes of {source}"),
        expected: vec![4],
        found: vec![found.len()],
    })
}

/// Read a mask, in which non-zero voxels are selected.
pub fn read_mask(source: &Source) -> Result<Array3<bool>> {
    let data = open(source)?.read_dyn::<u8>()?;
    squeeze_mask(data.mapv(|v| v != 0))
}

/// Directions stored in the `directions` attribute of the dataset, if there
/// is one.
pub fn read_directions_attribute(source: &Source) -> Result<Option<Vec<Vector>>> {
    let dataset = open(source)?;
    if !dataset.attr_names()?.iter().any(|name| name == DIRECTIONS_ATTRIBUTE) {
        return Ok(None)
    }
    let table: Array2<f64> = dataset.attr(DIRECTIONS_ATTRIBUTE)?.read_2d::<f64>()?;
    let rows: Vec<Vec<f64>> = table.outer_iter().map(|row| row.to_vec()).collect();
    directions_from_rows(&rows, &format!("{source}")).map(Some)
}

/// Write `data` to a new file at `path`, as dataset `dataset`.
pub fn write_f32_4d(path: &Path, dataset: &str, data: &Array4<f32>) -> Result<()> {
    ::hdf5::File::create(path)?
        .new_dataset_builder()
        .with_data(data)
        .create(dataset)?;
    Ok(())
}
