// MCT Thermometry Core - melting-curve thermometer calibration
// Converts capacitance bridge readings into helium-3 melting pressure and
// temperature for a nuclear demagnetization cooldown

// Module declarations
pub mod calibration;
pub mod config;
pub mod error;
pub mod instrument;
pub mod managers;
pub mod melting_curve;
pub mod polynomial;

// Re-exports for convenience
pub use calibration::{AnchorPoint, CalibrationSnapshot, ReferenceDataset};
pub use config::AppConfig;
pub use error::{CalibrationError, ErrorCode};
pub use managers::CalibrationManager;
pub use melting_curve::ReferenceCurve;
pub use polynomial::{CoefficientOrder, Polynomial};

/// Install the global log subscriber.
///
/// Safe to call more than once; later calls are no-ops. `log` records from
/// the library are forwarded through `tracing`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
