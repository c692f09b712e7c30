// CalibrationSnapshot - one consistent calibration state
//
// A snapshot bundles the base fit, the coefficients currently in use and the
// lookup table derived from them. Snapshots are immutable: recalibration
// builds a new one, and the manager swaps it in whole, so readers never see
// coefficients paired with a table derived from different ones.

use std::sync::Arc;

use serde::Serialize;

use crate::calibration::dataset::ReferenceDataset;
use crate::calibration::lookup::LookupTable;
use crate::calibration::recalibration::{recalibrate_coefficients, AnchorPoint};
use crate::error::CalibrationError;
use crate::melting_curve::ReferenceCurve;
use crate::polynomial::Polynomial;

/// Default degree of the 1/C = g(P) fit.
pub const DEFAULT_FIT_DEGREE: usize = 4;

/// Least-squares fit of `1/C` against `P`.
///
/// Coefficients are returned highest power first.
///
/// # Errors
/// - `NumericError` if any capacitance is zero
/// - `InvalidArgument` for a zero degree, mismatched lengths or too few points
pub fn fit_base_calibration(
    measured_c: &[f64],
    measured_p: &[f64],
    degree: usize,
) -> Result<Polynomial, CalibrationError> {
    if let Some(idx) = measured_c.iter().position(|c| *c == 0.0) {
        return Err(CalibrationError::numeric(format!(
            "division by zero: measured capacitance at row {} is 0 pF",
            idx
        )));
    }
    let c_inv: Vec<f64> = measured_c.iter().map(|c| 1.0 / c).collect();
    Polynomial::fit(measured_p, &c_inv, degree)
}

/// How the current coefficients came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    /// Straight least-squares fit of the reference dataset
    Base,
    /// Constant term corrected from one anchor
    OnePoint,
    /// Constant and linear terms corrected from two anchors
    TwoPoint,
}

/// Immutable calibration state.
#[derive(Debug, Clone)]
pub struct CalibrationSnapshot {
    curve: Arc<ReferenceCurve>,
    base: Arc<Polynomial>,
    current: Polynomial,
    table: LookupTable,
    kind: CalibrationKind,
    anchors: Vec<AnchorPoint>,
}

impl CalibrationSnapshot {
    /// Fit `dataset` and derive the lookup table.
    pub fn from_dataset(
        curve: Arc<ReferenceCurve>,
        dataset: &ReferenceDataset,
        degree: usize,
        pressure_ceiling_pf: f64,
    ) -> Result<Self, CalibrationError> {
        let base = fit_base_calibration(dataset.capacitance_pf(), dataset.pressure_mpa(), degree)?;
        Ok(Self::from_base(curve, base, pressure_ceiling_pf))
    }

    /// Use `base` as both the base fit and the current calibration.
    pub fn from_base(
        curve: Arc<ReferenceCurve>,
        base: Polynomial,
        pressure_ceiling_pf: f64,
    ) -> Self {
        let base = base.to_descending();
        let table = LookupTable::derive(&curve, &base, pressure_ceiling_pf);
        Self {
            curve,
            current: base.clone(),
            base: Arc::new(base),
            table,
            kind: CalibrationKind::Base,
            anchors: Vec::new(),
        }
    }

    /// New snapshot recalibrated from this snapshot's base fit.
    ///
    /// Any earlier recalibration is replaced, not compounded.
    pub fn recalibrated(&self, anchors: &[AnchorPoint]) -> Result<Self, CalibrationError> {
        let current = recalibrate_coefficients(&self.base, anchors)?;
        let table = LookupTable::derive(&self.curve, &current, self.table.pressure_ceiling_pf());
        let kind = if anchors.len() == 1 {
            CalibrationKind::OnePoint
        } else {
            CalibrationKind::TwoPoint
        };
        Ok(Self {
            curve: Arc::clone(&self.curve),
            base: Arc::clone(&self.base),
            current,
            table,
            kind,
            anchors: anchors.to_vec(),
        })
    }

    pub fn curve(&self) -> &ReferenceCurve {
        &self.curve
    }

    /// Base fit, highest power first.
    pub fn base(&self) -> &Polynomial {
        &self.base
    }

    /// Coefficients in use, highest power first.
    pub fn current(&self) -> &Polynomial {
        &self.current
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    pub fn anchors(&self) -> &[AnchorPoint] {
        &self.anchors
    }

    pub fn capacitance_to_temperature_low(&self, capacitance_pf: f64) -> f64 {
        self.table.capacitance_to_temperature_low(capacitance_pf)
    }

    pub fn capacitance_to_temperature_high(&self, capacitance_pf: f64) -> f64 {
        self.table.capacitance_to_temperature_high(capacitance_pf)
    }

    pub fn capacitance_to_pressure_low(&self, capacitance_pf: f64) -> Result<f64, CalibrationError> {
        self.table.capacitance_to_pressure_low(capacitance_pf)
    }

    pub fn capacitance_to_pressure_high(&self, capacitance_pf: f64) -> f64 {
        self.table.capacitance_to_pressure_high(capacitance_pf)
    }

    /// Plain-float view for display and persistence.
    pub fn summary(&self) -> CalibrationSummary {
        CalibrationSummary {
            kind: self.kind,
            degree: self.current.degree(),
            coefficients: self.current.coefficients().to_vec(),
            base_coefficients: self.base.coefficients().to_vec(),
            anchors: self.anchors.clone(),
            p_min_index: self.curve.p_min_index(),
            p_min_mpa: self.curve.min_pressure(),
            table_len: self.table.c_interp().len(),
        }
    }
}

/// Serializable description of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationSummary {
    pub kind: CalibrationKind,
    pub degree: usize,
    /// Current coefficients, highest power first
    pub coefficients: Vec<f64>,
    /// Base-fit coefficients, highest power first
    pub base_coefficients: Vec<f64>,
    pub anchors: Vec<AnchorPoint>,
    pub p_min_index: usize,
    pub p_min_mpa: f64,
    pub table_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::lookup::PRESSURE_LOOKUP_CEILING_PF;
    use crate::melting_curve::shared_curve;
    use approx::assert_abs_diff_eq;

    fn snapshot() -> CalibrationSnapshot {
        let dataset =
            ReferenceDataset::load(crate::calibration::dataset::DEFAULT_DATASET_PATH).unwrap();
        CalibrationSnapshot::from_dataset(
            shared_curve(),
            &dataset,
            DEFAULT_FIT_DEGREE,
            PRESSURE_LOOKUP_CEILING_PF,
        )
        .unwrap()
    }

    #[test]
    fn test_fit_rejects_zero_capacitance() {
        let err = fit_base_calibration(&[65.0, 0.0, 70.0], &[2.9, 3.0, 3.1], 1).unwrap_err();
        assert!(matches!(err, CalibrationError::NumericError { .. }));
    }

    #[test]
    fn test_base_fit_reproduces_dataset() {
        let dataset =
            ReferenceDataset::load(crate::calibration::dataset::DEFAULT_DATASET_PATH).unwrap();
        let fit = fit_base_calibration(dataset.capacitance_pf(), dataset.pressure_mpa(), 4).unwrap();
        assert_eq!(fit.degree(), 4);
        for (c, p) in dataset.capacitance_pf().iter().zip(dataset.pressure_mpa()) {
            assert_abs_diff_eq!(1.0 / fit.evaluate(*p), *c, epsilon = 0.02);
        }
    }

    #[test]
    fn test_base_snapshot() {
        let snap = snapshot();
        assert_eq!(snap.kind(), CalibrationKind::Base);
        assert_eq!(snap.current(), snap.base());
        assert!(snap.anchors().is_empty());
        for (c, cinv) in snap.table().c_interp().iter().zip(snap.table().cinv_interp()) {
            assert_abs_diff_eq!(c * cinv, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_recalibrated_snapshot_is_consistent() {
        let snap = snapshot();
        let recal = snap
            .recalibrated(&[AnchorPoint::new(70.0, 3.0), AnchorPoint::new(80.0, 3.3)])
            .unwrap();
        assert_eq!(recal.kind(), CalibrationKind::TwoPoint);
        assert_eq!(recal.base(), snap.base());

        let expected = LookupTable::derive(recal.curve(), recal.current(), PRESSURE_LOOKUP_CEILING_PF);
        assert_eq!(recal.table(), &expected);
        // Original is untouched
        assert_eq!(snap.kind(), CalibrationKind::Base);
    }

    #[test]
    fn test_recalibration_does_not_compound() {
        let snap = snapshot();
        let once = snap.recalibrated(&[AnchorPoint::new(65.1, 2.93113)]).unwrap();
        let via_two = snap
            .recalibrated(&[AnchorPoint::new(70.0, 3.0), AnchorPoint::new(80.0, 3.3)])
            .unwrap()
            .recalibrated(&[AnchorPoint::new(65.1, 2.93113)])
            .unwrap();
        assert_eq!(once.current(), via_two.current());
    }

    #[test]
    fn test_summary_reports_plain_values() {
        let summary = snapshot().summary();
        assert_eq!(summary.degree, 4);
        assert_eq!(summary.coefficients.len(), 5);
        assert_eq!(summary.table_len, crate::melting_curve::GRID_POINTS);
        assert!(serde_json::to_string(&summary).unwrap().contains("\"kind\":\"base\""));
    }
}
