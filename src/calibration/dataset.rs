// Reference dataset loading
//
// The reference dataset is a tab-separated text file with a header row that
// names at least the columns `C` (capacitance, pF) and `P` (pressure, MPa).
// Extra columns are ignored. Column names are a fixed external contract.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::CalibrationError;

/// Dataset bundled with the crate.
pub const DEFAULT_DATASET_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/data/mct_reference.tsv");

pub const CAPACITANCE_COLUMN: &str = "C";
pub const PRESSURE_COLUMN: &str = "P";

/// Measured (C, P) calibration pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDataset {
    capacitance_pf: Vec<f64>,
    pressure_mpa: Vec<f64>,
}

impl ReferenceDataset {
    /// Build from parallel arrays.
    pub fn new(capacitance_pf: Vec<f64>, pressure_mpa: Vec<f64>) -> Result<Self, CalibrationError> {
        if capacitance_pf.len() != pressure_mpa.len() {
            return Err(CalibrationError::malformed(format!(
                "column length mismatch: {} capacitances, {} pressures",
                capacitance_pf.len(),
                pressure_mpa.len()
            )));
        }
        if capacitance_pf.is_empty() {
            return Err(CalibrationError::malformed("dataset has no rows"));
        }
        Ok(Self {
            capacitance_pf,
            pressure_mpa,
        })
    }

    /// Read and parse a dataset file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => CalibrationError::DatasetNotFound {
                path: PathBuf::from(path),
            },
            _ => CalibrationError::malformed(format!(
                "failed to read {}: {}",
                path.display(),
                err
            )),
        })?;
        let dataset = Self::parse(&contents)?;
        log::info!(
            "[Dataset] Loaded {} calibration points from {:?}",
            dataset.len(),
            path
        );
        Ok(dataset)
    }

    /// Parse tab-separated text with a header row.
    pub fn parse(contents: &str) -> Result<Self, CalibrationError> {
        let mut lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| CalibrationError::malformed("empty file"))?;
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
        let c_idx = column_index(&columns, CAPACITANCE_COLUMN)?;
        let p_idx = column_index(&columns, PRESSURE_COLUMN)?;

        let mut capacitance_pf = Vec::new();
        let mut pressure_mpa = Vec::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            capacitance_pf.push(parse_field(&fields, c_idx, line_no + 1, CAPACITANCE_COLUMN)?);
            pressure_mpa.push(parse_field(&fields, p_idx, line_no + 1, PRESSURE_COLUMN)?);
        }

        Self::new(capacitance_pf, pressure_mpa)
    }

    pub fn len(&self) -> usize {
        self.capacitance_pf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacitance_pf.is_empty()
    }

    pub fn capacitance_pf(&self) -> &[f64] {
        &self.capacitance_pf
    }

    pub fn pressure_mpa(&self) -> &[f64] {
        &self.pressure_mpa
    }
}

fn column_index(columns: &[&str], name: &str) -> Result<usize, CalibrationError> {
    columns
        .iter()
        .position(|c| *c == name)
        .ok_or_else(|| CalibrationError::malformed(format!("missing column '{}'", name)))
}

fn parse_field(
    fields: &[&str],
    idx: usize,
    line_no: usize,
    column: &str,
) -> Result<f64, CalibrationError> {
    let raw = fields.get(idx).ok_or_else(|| {
        CalibrationError::malformed(format!("line {}: missing '{}' value", line_no, column))
    })?;
    raw.parse::<f64>().map_err(|err| {
        CalibrationError::malformed(format!(
            "line {}: invalid '{}' value {:?}: {}",
            line_no, column, raw, err
        ))
    })
}
