//! Configuration management for the calibration engine
//!
//! This module provides runtime configuration loading from JSON files, so the
//! reference dataset, fit degree and lookup guards can be changed per cryostat
//! without recompiling. The melting-curve grid itself is fixed and not part of
//! the configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::{DEFAULT_DATASET_PATH, DEFAULT_FIT_DEGREE, PRESSURE_LOOKUP_CEILING_PF};
use crate::error::CalibrationError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub reading: ReadingConfig,
}

/// Calibration engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Tab-separated reference dataset with `C` and `P` columns
    pub dataset_path: PathBuf,
    /// Degree of the 1/C = g(P) polynomial
    pub fit_degree: usize,
    /// Capacitances at or above this are excluded from the low-branch pressure lookup
    pub pressure_lookup_ceiling_pf: f64,
    /// Capacitance the operator usually reads at the pressure minimum
    pub default_pmin_capacitance_pf: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            fit_degree: DEFAULT_FIT_DEGREE,
            pressure_lookup_ceiling_pf: PRESSURE_LOOKUP_CEILING_PF,
            default_pmin_capacitance_pf: 65.061,
        }
    }
}

/// Capacitance polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    /// Delay between bridge readings
    pub poll_interval_ms: u64,
    /// Readings kept in memory for plotting
    pub history_capacity: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            history_capacity: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file doesn't exist or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.calibration.fit_degree == 0 {
            return Err(CalibrationError::invalid_argument(
                "calibration.fit_degree must be at least 1",
            ));
        }
        if !self.calibration.pressure_lookup_ceiling_pf.is_finite() {
            return Err(CalibrationError::invalid_argument(
                "calibration.pressure_lookup_ceiling_pf must be finite",
            ));
        }
        if self.reading.history_capacity == 0 {
            return Err(CalibrationError::invalid_argument(
                "reading.history_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}
