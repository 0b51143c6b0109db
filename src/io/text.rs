/// Read / write numeric matrices as whitespace-separated text

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Rows of numbers, one row per non-empty line. Anything following `#` on a
/// line is ignored. All rows must have the same length.
pub fn load_matrix(path: &Path) -> Result<Vec<Vec<f64>>> {
    let source = path.display().to_string();
    let reader = BufReader::new(File::open(path)?);
    let mut rows: Vec<Vec<f64>> = vec![];
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("");
        if content.trim().is_empty() { continue }
        let row = content.split_whitespace()
            .map(|word| word.parse::<f64>().map_err(|e| Error::MatrixParse {
                path: source.clone(),
                reason: format!("line {}: `{word}`: {e}", n + 1),
            }))
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(Error::MatrixParse {
                    path: source,
                    reason: format!("line {} has {} columns, previous rows have {}", n + 1, row.len(), first.len()),
                })
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn save_matrix(matrix: &DMatrix<f64>, path: &Path) -> Result<()> {
    let mut buf = BufWriter::new(File::create(path)?);
    for row in matrix.row_iter() {
        writeln!(buf, "{}", row.iter().join(" "))?;
    }
    buf.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn text_io_roundtrip() -> Result<()> {
        // Harmless temporary location for output file
        let dir = tempdir()?;
        let file_path = dir.path().join("response.txt");

        let original = DMatrix::from_row_slice(2, 3, &[
            1.5, 0.0, 0.0,
            2.25, -0.125, 1e-7,
        ]);
        save_matrix(&original, &file_path)?;
        let reloaded = load_matrix(&file_path)?;

        assert_eq!(reloaded, vec![vec![1.5, 0.0, 0.0], vec![2.25, -0.125, 1e-7]]);
        Ok(())
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("dirs.txt");
        std::fs::write(&file_path, "# az el\n0 0\n\n  1.5 0.5   # second\n")?;
        assert_eq!(load_matrix(&file_path)?, vec![vec![0.0, 0.0], vec![1.5, 0.5]]);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("bad.txt");
        std::fs::write(&file_path, "0 0\n1 2 3\n")?;
        assert!(matches!(load_matrix(&file_path), Err(Error::MatrixParse { .. })));
        std::fs::write(&file_path, "0 zero\n")?;
        assert!(matches!(load_matrix(&file_path), Err(Error::MatrixParse { .. })));
        Ok(())
    }
}
