// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Calibration error code constants
///
/// Single source of truth for the numeric codes reported alongside
/// calibration failures.
///
/// Error code range: 2001-2005
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Argument outside the accepted domain (e.g. wrong anchor count)
    pub const INVALID_ARGUMENT: i32 = 2001;

    /// Division by zero or non-finite arithmetic result
    pub const NUMERIC_ERROR: i32 = 2002;

    /// Reference dataset file does not exist or cannot be opened
    pub const DATASET_NOT_FOUND: i32 = 2003;

    /// Reference dataset is present but cannot be parsed
    pub const DATASET_MALFORMED: i32 = 2004;

    /// Calibration state RwLock was poisoned
    pub const STATE_POISONED: i32 = 2005;
}

/// Log a calibration error with structured context
///
/// Logs the numeric code, the component and the message together with the
/// operation in which the failure occurred.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=MctCalibration, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// None of these are recovered locally; every failure happens before any
/// state is swapped, so the engine keeps its last good calibration.
///
/// Error code ranges: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Argument rejected before any computation
    InvalidArgument { reason: String },

    /// Division by zero or a non-finite intermediate
    NumericError { reason: String },

    /// Reference dataset missing
    DatasetNotFound { path: PathBuf },

    /// Reference dataset unreadable or missing required columns
    DatasetMalformed { reason: String },

    /// Calibration state RwLock was poisoned
    StatePoisoned,
}

impl CalibrationError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        CalibrationError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn numeric(reason: impl Into<String>) -> Self {
        CalibrationError::NumericError {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CalibrationError::DatasetMalformed {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InvalidArgument { .. } => CalibrationErrorCodes::INVALID_ARGUMENT,
            CalibrationError::NumericError { .. } => CalibrationErrorCodes::NUMERIC_ERROR,
            CalibrationError::DatasetNotFound { .. } => CalibrationErrorCodes::DATASET_NOT_FOUND,
            CalibrationError::DatasetMalformed { .. } => CalibrationErrorCodes::DATASET_MALFORMED,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InvalidArgument { reason } => {
                format!("Invalid argument: {}", reason)
            }
            CalibrationError::NumericError { reason } => {
                format!("Numeric error: {}", reason)
            }
            CalibrationError::DatasetNotFound { path } => {
                format!("Reference dataset not found: {}", path.display())
            }
            CalibrationError::DatasetMalformed { reason } => {
                format!("Reference dataset malformed: {}", reason)
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
