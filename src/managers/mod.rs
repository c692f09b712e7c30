// Managers Module
//
// Long-lived, thread-safe owners of engine state shared between GUI panels,
// polling threads and automation scripts.
//
// - CalibrationManager: current MCT calibration, recalibration and restore

pub mod calibration_manager;

pub use calibration_manager::{
    CalibrationEvent, CalibrationEventKind, CalibrationManager, DatasetSource,
};
