pub mod hdf5;
pub mod text;

use std::path::Path;

use crate::config::shells::read_shell_table;
use crate::error::{Error, Result};
use crate::shells::{directions_from_rows, Shell};

/// Find the sampling scheme of the amplitudes in `amps`. In order of
/// preference:
///
/// 1. a text file of directions, describing a single shell whose samples are
///    volumes `0..N`,
/// 2. the `directions` attribute of the amplitude dataset, likewise,
/// 3. a TOML shell table.
pub fn resolve_shells(directions: Option<&Path>, amps: &hdf5::Source, table: Option<&Path>) -> Result<Vec<Shell>> {
    if let Some(path) = directions {
        let rows = text::load_matrix(path)?;
        let dirs = directions_from_rows(&rows, &path.display().to_string())?;
        return Ok(vec![Shell::from_directions(dirs)])
    }
    if let Some(dirs) = hdf5::read_directions_attribute(amps)? {
        return Ok(vec![Shell::from_directions(dirs)])
    }
    if let Some(path) = table {
        return read_shell_table(path)?.shells()
    }
    Err(Error::NoDirections)
}
