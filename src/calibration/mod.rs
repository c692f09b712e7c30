// Calibration module - capacitance to temperature conversion
//
// This module provides the numerical core of the melting-curve thermometer:
// 1. ReferenceDataset: measured (C, P) pairs loaded from disk
// 2. fit_base_calibration: least-squares fit of 1/C against P
// 3. recalibrate_coefficients: one- or two-anchor correction of that fit
// 4. LookupTable: C(T) tables split into low and high branches
// 5. CalibrationSnapshot: an immutable bundle of the above

pub mod dataset;
pub mod lookup;
pub mod recalibration;
pub mod state;

pub use dataset::{ReferenceDataset, DEFAULT_DATASET_PATH};
pub use lookup::{interp, BranchTable, LookupTable, PRESSURE_LOOKUP_CEILING_PF};
pub use recalibration::{recalibrate_coefficients, AnchorPoint};
pub use state::{
    fit_base_calibration, CalibrationKind, CalibrationSnapshot, CalibrationSummary,
    DEFAULT_FIT_DEGREE,
};
