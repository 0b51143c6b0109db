//! Shell table parser
//!
//! The table groups the volumes of an acquisition into b-value shells, giving
//! the sampling direction of every volume. It is normally written by whatever
//! classifies the gradient table into shells.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::shells::{directions_from_rows, Shell, DEFAULT_BZERO_THRESHOLD};

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ShellTable {

    /// Shells whose `b` does not exceed this are classified as b=0, unless
    /// they say otherwise
    #[serde(default = "default_bzero_threshold")]
    pub bzero_threshold: f64,

    #[serde(rename = "shell", default)]
    pub shells: Vec<ShellEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ShellEntry {

    /// Mean b-value of the shell
    pub b: f64,

    /// Index, in the 4th dimension of the amplitude image, of each sample
    pub volumes: Vec<usize>,

    /// One `[azimuth, elevation]` or `[x, y, z]` per sample
    pub directions: Vec<Vec<f64>>,

    /// Overrides classification by `bzero_threshold`
    pub bzero: Option<bool>,
}

fn default_bzero_threshold() -> f64 { DEFAULT_BZERO_THRESHOLD }

impl ShellTable {

    /// Shells in the order they appear in the table
    pub fn shells(&self) -> Result<Vec<Shell>> {
        self.shells.iter()
            .enumerate()
            .map(|(n, entry)| {
                let directions = directions_from_rows(&entry.directions, &format!("shell table entry {n}"))?;
                let bzero = entry.bzero.unwrap_or(entry.b <= self.bzero_threshold);
                Shell::new(Some(entry.b), bzero, directions, entry.volumes.clone())
            })
            .collect()
    }
}

pub fn parse_shell_table(text: &str) -> Result<ShellTable> {
    Ok(toml::from_str(text)?)
}

pub fn read_shell_table(path: &Path) -> Result<ShellTable> {
    let text = fs::read_to_string(path)?;
    parse_shell_table(&text)
}
