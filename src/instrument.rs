//! Capacitance bridge collaborator and reading sampling.
//!
//! The engine never talks to hardware. Anything that can report a
//! capacitance in pF implements [`CapacitanceSource`]; a polling loop turns
//! each sample into an [`MctReading`] through the current calibration.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::CalibrationError;
use crate::managers::CalibrationManager;

/// Scalar getters of a capacitance bridge.
pub trait CapacitanceSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Measured capacitance in pF.
    fn capacitance(&mut self) -> Result<f64, Self::Error>;

    /// Measured loss, in whatever unit the bridge reports.
    fn loss(&mut self) -> Result<f64, Self::Error>;
}

/// Scripted bridge for offline runs and tests.
///
/// Replays its capacitance sequence, holding the last value once exhausted.
#[derive(Debug, Clone)]
pub struct VirtualBridge {
    capacitances: Vec<f64>,
    cursor: usize,
    loss: f64,
}

impl VirtualBridge {
    pub fn new(capacitances: Vec<f64>, loss: f64) -> Self {
        Self {
            capacitances,
            cursor: 0,
            loss,
        }
    }

    /// Bridge that always reports `capacitance_pf`.
    pub fn constant(capacitance_pf: f64) -> Self {
        Self::new(vec![capacitance_pf], 0.0)
    }
}

impl CapacitanceSource for VirtualBridge {
    type Error = CalibrationError;

    fn capacitance(&mut self) -> Result<f64, Self::Error> {
        let value = self
            .capacitances
            .get(self.cursor)
            .or_else(|| self.capacitances.last())
            .copied()
            .ok_or_else(|| CalibrationError::invalid_argument("virtual bridge has no readings"))?;
        if self.cursor < self.capacitances.len() {
            self.cursor += 1;
        }
        Ok(value)
    }

    fn loss(&mut self) -> Result<f64, Self::Error> {
        Ok(self.loss)
    }
}

/// One converted bridge sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MctReading {
    pub capacitance_pf: f64,
    pub loss: f64,
    pub temperature_low_mk: f64,
    /// Seconds since the Unix epoch
    pub timestamp_s: f64,
}

/// Failure while producing a reading.
#[derive(Debug)]
pub enum ReadingError<E> {
    Instrument(E),
    Calibration(CalibrationError),
}

impl<E: std::fmt::Display> std::fmt::Display for ReadingError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingError::Instrument(err) => write!(f, "instrument read failed: {}", err),
            ReadingError::Calibration(err) => write!(f, "conversion failed: {}", err),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ReadingError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadingError::Instrument(err) => Some(err),
            ReadingError::Calibration(err) => Some(err),
        }
    }
}

/// Read the bridge once and convert with the low-temperature branch.
pub fn sample_reading<S: CapacitanceSource>(
    source: &mut S,
    manager: &CalibrationManager,
) -> Result<MctReading, ReadingError<S::Error>> {
    let capacitance_pf = source.capacitance().map_err(ReadingError::Instrument)?;
    let loss = source.loss().map_err(ReadingError::Instrument)?;
    let temperature_low_mk = manager
        .capacitance_to_temperature_low(capacitance_pf)
        .map_err(ReadingError::Calibration)?;
    let timestamp_s = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    Ok(MctReading {
        capacitance_pf,
        loss,
        temperature_low_mk,
        timestamp_s,
    })
}

/// Bounded history of readings, oldest dropped first.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    readings: VecDeque<MctReading>,
    capacity: usize,
}

impl ReadingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, reading: MctReading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<&MctReading> {
        self.readings.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MctReading> {
        self.readings.iter()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}
