// CalibrationManager: thread-safe owner of the MCT calibration
//
// Single Responsibility: hold the current calibration snapshot and replace it
// atomically on recalibration or restore.
//
// Readers clone an Arc of the current snapshot under a short read lock and do
// their interpolation outside the lock. Writers compute the replacement
// snapshot first and only take the write lock to swap the Arc, so a lookup
// from a polling thread never waits on a recalibration in progress.

use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::calibration::{AnchorPoint, CalibrationSnapshot, CalibrationSummary, ReferenceDataset};
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};
use crate::melting_curve::{shared_curve, ReferenceCurve, P_MIN};

/// Buffer for calibration change notifications.
const EVENT_BUFFER: usize = 16;

/// Where the base fit's measured data comes from.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// Re-read from disk on every restore
    File(PathBuf),
    /// Fixed in memory
    InMemory(ReferenceDataset),
}

impl DatasetSource {
    fn load(&self) -> Result<ReferenceDataset, CalibrationError> {
        match self {
            DatasetSource::File(path) => ReferenceDataset::load(path),
            DatasetSource::InMemory(dataset) => Ok(dataset.clone()),
        }
    }
}

/// What changed the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationEventKind {
    Recalibrated,
    Restored,
}

/// Published after every successful swap.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationEvent {
    pub kind: CalibrationEventKind,
    pub summary: CalibrationSummary,
}

/// Manages the calibration used to convert bridge capacitance to temperature
///
/// # Example
/// ```ignore
/// let manager = CalibrationManager::new(&config.calibration)?;
/// let t_low = manager.capacitance_to_temperature_low(74.0)?;
/// manager.recalibrate(&[AnchorPoint::new(65.06, 2.93113)])?;
/// manager.restore_original()?;
/// ```
pub struct CalibrationManager {
    curve: Arc<ReferenceCurve>,
    source: DatasetSource,
    degree: usize,
    pressure_ceiling_pf: f64,
    pmin_capacitance_pf: f64,
    state: RwLock<Arc<CalibrationSnapshot>>,
    events: broadcast::Sender<CalibrationEvent>,
}

impl CalibrationManager {
    /// Load the configured dataset and fit the base calibration.
    ///
    /// # Errors
    /// - Dataset missing or malformed
    /// - Zero capacitance in the dataset or an unusable fit degree
    pub fn new(config: &CalibrationConfig) -> Result<Self, CalibrationError> {
        Self::with_source(DatasetSource::File(config.dataset_path.clone()), config)
    }

    /// Fit the base calibration from an in-memory dataset.
    pub fn with_dataset(
        dataset: ReferenceDataset,
        config: &CalibrationConfig,
    ) -> Result<Self, CalibrationError> {
        Self::with_source(DatasetSource::InMemory(dataset), config)
    }

    pub fn with_source(
        source: DatasetSource,
        config: &CalibrationConfig,
    ) -> Result<Self, CalibrationError> {
        let curve = shared_curve();
        let snapshot = Self::fit_snapshot(
            &curve,
            &source,
            config.fit_degree,
            config.pressure_lookup_ceiling_pf,
        )
        .inspect_err(|err| log_calibration_error(err, "init_calibration"))?;

        log::info!(
            "[CalibrationManager] Base fit ready: degree {}, coefficients {:?}",
            config.fit_degree,
            snapshot.current().coefficients()
        );

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            curve,
            source,
            degree: config.fit_degree,
            pressure_ceiling_pf: config.pressure_lookup_ceiling_pf,
            pmin_capacitance_pf: config.default_pmin_capacitance_pf,
            state: RwLock::new(Arc::new(snapshot)),
            events,
        })
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    /// Temperature (mK) on the low-temperature branch.
    pub fn capacitance_to_temperature_low(&self, capacitance_pf: f64) -> Result<f64, CalibrationError> {
        Ok(self.snapshot()?.capacitance_to_temperature_low(capacitance_pf))
    }

    /// Temperature (mK) on the high-temperature branch.
    pub fn capacitance_to_temperature_high(
        &self,
        capacitance_pf: f64,
    ) -> Result<f64, CalibrationError> {
        Ok(self.snapshot()?.capacitance_to_temperature_high(capacitance_pf))
    }

    /// Melting pressure (MPa) on the low-temperature branch.
    pub fn capacitance_to_pressure_low(&self, capacitance_pf: f64) -> Result<f64, CalibrationError> {
        self.snapshot()?.capacitance_to_pressure_low(capacitance_pf)
    }

    /// Melting pressure (MPa) on the high-temperature branch.
    pub fn capacitance_to_pressure_high(&self, capacitance_pf: f64) -> Result<f64, CalibrationError> {
        Ok(self.snapshot()?.capacitance_to_pressure_high(capacitance_pf))
    }

    /// Melting pressure (MPa) at a temperature in mK. Independent of the
    /// calibration.
    pub fn temperature_to_pressure(&self, temperature_mk: f64) -> f64 {
        self.curve.temperature_to_pressure(temperature_mk)
    }

    /// Low- and high-branch temperatures (mK) for a melting pressure.
    pub fn pressure_to_temperatures(&self, pressure_mpa: f64) -> Option<(f64, f64)> {
        self.curve.pressure_to_temperatures(pressure_mpa)
    }

    // ========================================================================
    // CALIBRATION CHANGES
    // ========================================================================

    /// Correct the base fit with one or two anchor points.
    ///
    /// # Returns
    /// The new coefficients, highest power first.
    ///
    /// # Errors
    /// - `InvalidArgument` unless 1 or 2 anchors are given
    /// - `NumericError` for zero capacitance or equal anchor pressures
    ///
    /// On error the previous calibration stays in place.
    pub fn recalibrate(&self, anchors: &[AnchorPoint]) -> Result<Vec<f64>, CalibrationError> {
        let current = self.snapshot()?;
        let next = current
            .recalibrated(anchors)
            .inspect_err(|err| log_calibration_error(err, "recalibrate"))?;

        log::info!(
            "[CalibrationManager] Recalibrated with {} anchor(s): {:?}",
            anchors.len(),
            anchors
        );
        self.swap(next, CalibrationEventKind::Recalibrated)
    }

    /// One-point recalibration at the melting-curve pressure minimum.
    pub fn recalibrate_from_pmin(&self, capacitance_pf: f64) -> Result<Vec<f64>, CalibrationError> {
        self.recalibrate(&[AnchorPoint::new(capacitance_pf, P_MIN.pressure_mpa)])
    }

    /// Refit the reference dataset, discarding any recalibration.
    ///
    /// File-backed datasets are re-read, so a missing file surfaces here.
    pub fn restore_original(&self) -> Result<Vec<f64>, CalibrationError> {
        let next = Self::fit_snapshot(&self.curve, &self.source, self.degree, self.pressure_ceiling_pf)
            .inspect_err(|err| log_calibration_error(err, "restore_original"))?;

        log::info!("[CalibrationManager] Restored base calibration");
        self.swap(next, CalibrationEventKind::Restored)
    }

    // ========================================================================
    // STATE ACCESS
    // ========================================================================

    /// Current snapshot. Cheap: clones an Arc under a read lock.
    pub fn snapshot(&self) -> Result<Arc<CalibrationSnapshot>, CalibrationError> {
        let guard = self
            .read_state()
            .inspect_err(|err| log_calibration_error(err, "snapshot"))?;
        Ok(Arc::clone(&*guard))
    }

    /// Current coefficients, highest power first.
    pub fn coefficients(&self) -> Result<Vec<f64>, CalibrationError> {
        Ok(self.snapshot()?.current().coefficients().to_vec())
    }

    pub fn summary(&self) -> Result<CalibrationSummary, CalibrationError> {
        Ok(self.snapshot()?.summary())
    }

    /// Receive a [`CalibrationEvent`] after every successful change.
    pub fn subscribe(&self) -> broadcast::Receiver<CalibrationEvent> {
        self.events.subscribe()
    }

    pub fn curve(&self) -> &ReferenceCurve {
        &self.curve
    }

    pub fn fit_degree(&self) -> usize {
        self.degree
    }

    pub fn default_pmin_capacitance(&self) -> f64 {
        self.pmin_capacitance_pf
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    fn fit_snapshot(
        curve: &Arc<ReferenceCurve>,
        source: &DatasetSource,
        degree: usize,
        pressure_ceiling_pf: f64,
    ) -> Result<CalibrationSnapshot, CalibrationError> {
        let dataset = source.load()?;
        CalibrationSnapshot::from_dataset(Arc::clone(curve), &dataset, degree, pressure_ceiling_pf)
    }

    /// Install `next` and notify subscribers. Returns its coefficients.
    fn swap(
        &self,
        next: CalibrationSnapshot,
        kind: CalibrationEventKind,
    ) -> Result<Vec<f64>, CalibrationError> {
        let next = Arc::new(next);
        let coefficients = next.current().coefficients().to_vec();
        let summary = next.summary();
        {
            let mut guard = self
                .write_state()
                .inspect_err(|err| log_calibration_error(err, "swap_calibration"))?;
            *guard = next;
        }
        // No subscribers is fine
        let _ = self.events.send(CalibrationEvent { kind, summary });
        Ok(coefficients)
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, Arc<CalibrationSnapshot>>, CalibrationError> {
        self.state.read().map_err(|_| CalibrationError::StatePoisoned)
    }

    fn write_state(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Arc<CalibrationSnapshot>>, CalibrationError> {
        self.state.write().map_err(|_| CalibrationError::StatePoisoned)
    }
}
