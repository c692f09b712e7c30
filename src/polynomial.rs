//! Polynomial value type with an explicit coefficient order.
//!
//! Least-squares fits produce coefficients from the highest power down to the
//! constant term, while the recalibration arithmetic addresses the constant
//! and linear terms by index in ascending order. Carrying the order alongside
//! the coefficients keeps both views explicit.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Which end of the coefficient vector holds the constant term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoefficientOrder {
    /// `[a0, a1, ..., aN]`
    Ascending,
    /// `[aN, ..., a1, a0]`, the order produced by [`Polynomial::fit`]
    Descending,
}

/// Real polynomial in one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coeffs: Vec<f64>,
    order: CoefficientOrder,
}

impl Polynomial {
    /// Build a polynomial from coefficients in the given order.
    ///
    /// An empty coefficient list is the zero polynomial of degree 0.
    pub fn new(coeffs: Vec<f64>, order: CoefficientOrder) -> Self {
        let coeffs = if coeffs.is_empty() { vec![0.0] } else { coeffs };
        Self { coeffs, order }
    }

    pub fn from_ascending(coeffs: Vec<f64>) -> Self {
        Self::new(coeffs, CoefficientOrder::Ascending)
    }

    pub fn from_descending(coeffs: Vec<f64>) -> Self {
        Self::new(coeffs, CoefficientOrder::Descending)
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn order(&self) -> CoefficientOrder {
        self.order
    }

    /// Raw coefficients in [`Self::order`].
    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Same polynomial with coefficients rearranged into `order`.
    pub fn with_order(&self, order: CoefficientOrder) -> Polynomial {
        if order == self.order {
            return self.clone();
        }
        let mut coeffs = self.coeffs.clone();
        coeffs.reverse();
        Polynomial { coeffs, order }
    }

    pub fn to_ascending(&self) -> Polynomial {
        self.with_order(CoefficientOrder::Ascending)
    }

    pub fn to_descending(&self) -> Polynomial {
        self.with_order(CoefficientOrder::Descending)
    }

    /// Evaluate with Horner's scheme.
    pub fn evaluate(&self, x: f64) -> f64 {
        match self.order {
            CoefficientOrder::Descending => self.coeffs.iter().fold(0.0, |acc, c| acc * x + c),
            CoefficientOrder::Ascending => {
                self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
            }
        }
    }

    /// Sum of the terms of power `from_power` and above.
    pub fn tail(&self, x: f64, from_power: usize) -> f64 {
        self.to_ascending()
            .coeffs
            .iter()
            .enumerate()
            .skip(from_power)
            .map(|(power, c)| c * x.powi(power as i32))
            .sum()
    }

    pub fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    /// Least-squares fit of `y ≈ p(x)` with a polynomial of `degree`.
    ///
    /// Columns of the Vandermonde matrix are scaled to unit norm before the
    /// SVD solve, then the scaling is undone on the solution. The result is in
    /// [`CoefficientOrder::Descending`].
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial, CalibrationError> {
        if degree == 0 {
            return Err(CalibrationError::invalid_argument(
                "fit degree must be at least 1",
            ));
        }
        if x.len() != y.len() {
            return Err(CalibrationError::invalid_argument(format!(
                "x and y must have the same length ({} != {})",
                x.len(),
                y.len()
            )));
        }
        let ncoeffs = degree + 1;
        if x.len() < ncoeffs {
            return Err(CalibrationError::invalid_argument(format!(
                "degree {} fit needs at least {} points, got {}",
                degree,
                ncoeffs,
                x.len()
            )));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(CalibrationError::numeric("fit input contains non-finite values"));
        }

        let mut lhs = DMatrix::from_fn(x.len(), ncoeffs, |row, col| {
            x[row].powi((degree - col) as i32)
        });
        let mut scale = Vec::with_capacity(ncoeffs);
        for col in 0..ncoeffs {
            let norm = lhs.column(col).norm();
            let norm = if norm > 0.0 { norm } else { 1.0 };
            lhs.column_mut(col).scale_mut(1.0 / norm);
            scale.push(norm);
        }
        let rhs = DVector::from_column_slice(y);

        let svd = lhs.svd(true, true);
        let tolerance = svd.singular_values.max() * x.len() as f64 * f64::EPSILON;
        let rank = svd.rank(tolerance);
        if rank < ncoeffs {
            return Err(CalibrationError::numeric(format!(
                "least-squares system is rank deficient ({} < {})",
                rank, ncoeffs
            )));
        }
        let solution = svd
            .solve(&rhs, tolerance)
            .map_err(|reason| CalibrationError::numeric(reason.to_string()))?;

        let coeffs: Vec<f64> = solution
            .iter()
            .zip(&scale)
            .map(|(c, s)| c / s)
            .collect();
        let poly = Polynomial::from_descending(coeffs);
        if !poly.is_finite() {
            return Err(CalibrationError::numeric("fit produced non-finite coefficients"));
        }
        Ok(poly)
    }
}
