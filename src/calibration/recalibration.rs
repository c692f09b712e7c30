// Anchor-point recalibration
//
// Corrects the constant (one anchor) or the constant and linear terms (two
// anchors) of the 1/C = g(P) fit so that it passes exactly through the
// anchors. Terms of power two and above always come from the fit that is
// passed in and are never touched.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::polynomial::Polynomial;

/// Operator-supplied (capacitance, pressure) reference pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub capacitance_pf: f64,
    pub pressure_mpa: f64,
}

impl AnchorPoint {
    pub fn new(capacitance_pf: f64, pressure_mpa: f64) -> Self {
        Self {
            capacitance_pf,
            pressure_mpa,
        }
    }

    fn inverse_capacitance(&self) -> Result<f64, CalibrationError> {
        if self.capacitance_pf == 0.0 {
            return Err(CalibrationError::numeric(
                "division by zero: anchor capacitance is 0 pF",
            ));
        }
        Ok(1.0 / self.capacitance_pf)
    }
}

impl From<(f64, f64)> for AnchorPoint {
    fn from((capacitance_pf, pressure_mpa): (f64, f64)) -> Self {
        Self::new(capacitance_pf, pressure_mpa)
    }
}

impl From<[f64; 2]> for AnchorPoint {
    fn from([capacitance_pf, pressure_mpa]: [f64; 2]) -> Self {
        Self::new(capacitance_pf, pressure_mpa)
    }
}

/// Solve for new low-order coefficients of `base` so it passes through the
/// anchors.
///
/// Returns the corrected polynomial in descending order. `base` is not
/// modified.
///
/// # Errors
/// - `InvalidArgument` unless there are exactly 1 or 2 anchors, or when
///   `base` has no linear term
/// - `NumericError` for a zero anchor capacitance, two anchors at the same
///   pressure, or a non-finite result
pub fn recalibrate_coefficients(
    base: &Polynomial,
    anchors: &[AnchorPoint],
) -> Result<Polynomial, CalibrationError> {
    if base.degree() < 1 {
        return Err(CalibrationError::invalid_argument(
            "recalibration needs a fit with a linear term",
        ));
    }

    let mut coeffs = base.to_ascending().coefficients().to_vec();
    let higher_order = |p: f64| base.tail(p, 2);

    match anchors {
        [first] => {
            let cinv1 = first.inverse_capacitance()?;
            let p1 = first.pressure_mpa;
            coeffs[0] = cinv1 - coeffs[1] * p1 - higher_order(p1);
        }
        [first, second] => {
            let cinv1 = first.inverse_capacitance()?;
            let cinv2 = second.inverse_capacitance()?;
            let (p1, p2) = (first.pressure_mpa, second.pressure_mpa);
            if p1 == p2 {
                return Err(CalibrationError::numeric(format!(
                    "division by zero: both anchors at {} MPa",
                    p1
                )));
            }
            let a1 = ((cinv1 - cinv2) - (higher_order(p1) - higher_order(p2))) / (p1 - p2);
            coeffs[1] = a1;
            coeffs[0] = cinv1 - a1 * p1 - higher_order(p1);
        }
        _ => {
            return Err(CalibrationError::invalid_argument(format!(
                "anchor points must contain 1 or 2 points (got {})",
                anchors.len()
            )));
        }
    }

    let corrected = Polynomial::from_ascending(coeffs).to_descending();
    if !corrected.is_finite() {
        return Err(CalibrationError::numeric(
            "recalibration produced non-finite coefficients",
        ));
    }
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn base_fit() -> Polynomial {
        Polynomial::from_ascending(vec![0.0492, -0.0129, -0.00029, 0.00032, -0.00002])
    }

    #[test]
    fn test_one_point_hits_anchor() {
        let base = base_fit();
        let anchor = AnchorPoint::new(65.06, 2.93113);
        let fitted = recalibrate_coefficients(&base, &[anchor]).unwrap();

        assert_abs_diff_eq!(fitted.evaluate(2.93113), 1.0 / 65.06, epsilon = 1e-12);
        // Only the constant term changes
        let before = base.to_descending();
        let n = before.coefficients().len();
        assert_eq!(&fitted.coefficients()[..n - 1], &before.coefficients()[..n - 1]);
    }

    #[test]
    fn test_two_points_hit_both_anchors() {
        let base = base_fit();
        let anchors = [AnchorPoint::new(70.0, 3.0), AnchorPoint::new(80.0, 3.3)];
        let fitted = recalibrate_coefficients(&base, &anchors).unwrap();

        assert_abs_diff_eq!(fitted.evaluate(3.0), 1.0 / 70.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fitted.evaluate(3.3), 1.0 / 80.0, epsilon = 1e-12);
        let before = base.to_descending();
        let n = before.coefficients().len();
        assert_eq!(&fitted.coefficients()[..n - 2], &before.coefficients()[..n - 2]);
    }

    #[test]
    fn test_result_is_descending() {
        let fitted = recalibrate_coefficients(&base_fit(), &[AnchorPoint::from((65.0, 2.95))]).unwrap();
        assert_eq!(fitted.order(), crate::polynomial::CoefficientOrder::Descending);
        assert_eq!(fitted.degree(), 4);
    }

    #[test]
    fn test_wrong_anchor_count() {
        let base = base_fit();
        for anchors in [vec![], vec![AnchorPoint::new(70.0, 3.0); 3]] {
            match recalibrate_coefficients(&base, &anchors) {
                Err(CalibrationError::InvalidArgument { reason }) => {
                    assert!(reason.contains("1 or 2 points"))
                }
                other => panic!("Expected InvalidArgument, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_equal_pressures_is_numeric_error() {
        let anchors: [AnchorPoint; 2] = [[70.0, 3.0].into(), [71.0, 3.0].into()];
        assert!(matches!(
            recalibrate_coefficients(&base_fit(), &anchors),
            Err(CalibrationError::NumericError { .. })
        ));
    }

    #[test]
    fn test_zero_capacitance_is_numeric_error() {
        assert!(matches!(
            recalibrate_coefficients(&base_fit(), &[AnchorPoint::new(0.0, 3.0)]),
            Err(CalibrationError::NumericError { .. })
        ));
    }

    #[test]
    fn test_degree_one_fit() {
        let base = Polynomial::from_descending(vec![-0.005, 0.03]);
        let anchors = [AnchorPoint::new(70.0, 3.0), AnchorPoint::new(80.0, 3.3)];
        let fitted = recalibrate_coefficients(&base, &anchors).unwrap();
        assert_abs_diff_eq!(fitted.evaluate(3.0), 1.0 / 70.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fitted.evaluate(3.3), 1.0 / 80.0, epsilon = 1e-12);
    }
}
