// Capacitance lookup tables
//
// A calibration polynomial g(P) ≈ 1/C is evaluated over the melting-curve
// pressure grid to give C_interp(T). The table is split at the pressure
// minimum into a low and a high branch, each normalised so that capacitance
// increases along it, and queried with clamped piecewise-linear
// interpolation.

use crate::error::CalibrationError;
use crate::melting_curve::ReferenceCurve;
use crate::polynomial::Polynomial;

/// Upper capacitance bound (pF) for the low-branch pressure lookup.
///
/// Tied to the shape of the bundled reference dataset; review if the
/// dataset changes.
pub const PRESSURE_LOOKUP_CEILING_PF: f64 = 75.0;

/// Clamped linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be non-decreasing. Queries left of `xp[0]` return `fp[0]`,
/// right of the last abscissa return the last ordinate. Returns NaN for an
/// empty table or a NaN query.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // xp[j - 1] <= x < xp[j]
    let j = xp[..n].partition_point(|v| *v <= x);
    let (x0, x1) = (xp[j - 1], xp[j]);
    let (y0, y1) = (fp[j - 1], fp[j]);
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// One monotone segment of the capacitance table.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchTable {
    capacitance_pf: Vec<f64>,
    values: Vec<f64>,
}

impl BranchTable {
    /// Pair capacitances with values, reversing both when the capacitance
    /// runs downhill.
    pub fn new(mut capacitance_pf: Vec<f64>, mut values: Vec<f64>) -> Self {
        if let (Some(first), Some(last)) = (capacitance_pf.first(), capacitance_pf.last()) {
            if last < first {
                capacitance_pf.reverse();
                values.reverse();
            }
        }
        Self {
            capacitance_pf,
            values,
        }
    }

    pub fn capacitance_pf(&self) -> &[f64] {
        &self.capacitance_pf
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.capacitance_pf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacitance_pf.is_empty()
    }

    pub fn is_monotonic(&self) -> bool {
        self.capacitance_pf.windows(2).all(|w| w[1] >= w[0])
    }

    pub fn lookup(&self, capacitance_pf: f64) -> f64 {
        interp(capacitance_pf, &self.capacitance_pf, &self.values)
    }
}

/// Derived tables for one calibration polynomial.
///
/// Built in one piece by [`LookupTable::derive`] and never mutated, so a
/// table always matches the coefficients it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    cinv_interp: Vec<f64>,
    c_interp: Vec<f64>,
    low_temperature: BranchTable,
    high_temperature: BranchTable,
    low_pressure: BranchTable,
    high_pressure: BranchTable,
    pressure_ceiling_pf: f64,
}

impl LookupTable {
    /// Evaluate `coeffs` over the curve's pressure grid and split the result
    /// into branches at the pressure minimum.
    pub fn derive(curve: &ReferenceCurve, coeffs: &Polynomial, pressure_ceiling_pf: f64) -> Self {
        let cinv_interp: Vec<f64> = curve
            .pressures_mpa()
            .iter()
            .map(|&p| coeffs.evaluate(p))
            .collect();
        let c_interp: Vec<f64> = cinv_interp.iter().map(|v| 1.0 / v).collect();

        let split = curve.p_min_index();
        let t_mk: Vec<f64> = curve.temperatures_k().iter().map(|t| t * 1e3).collect();
        let p = curve.pressures_mpa();

        let low_temperature = BranchTable::new(c_interp[..split].to_vec(), t_mk[..split].to_vec());
        let high_temperature = BranchTable::new(c_interp[split..].to_vec(), t_mk[split..].to_vec());

        let (low_c, low_p): (Vec<f64>, Vec<f64>) = c_interp[..split]
            .iter()
            .zip(&p[..split])
            .filter(|(c, _)| **c < pressure_ceiling_pf)
            .map(|(c, p)| (*c, *p))
            .unzip();
        let low_pressure = BranchTable::new(low_c, low_p);
        let high_pressure = BranchTable::new(c_interp[split..].to_vec(), p[split..].to_vec());

        Self {
            cinv_interp,
            c_interp,
            low_temperature,
            high_temperature,
            low_pressure,
            high_pressure,
            pressure_ceiling_pf,
        }
    }

    /// `1/C` over the full grid.
    pub fn cinv_interp(&self) -> &[f64] {
        &self.cinv_interp
    }

    /// `C` over the full grid.
    pub fn c_interp(&self) -> &[f64] {
        &self.c_interp
    }

    pub fn low_temperature_branch(&self) -> &BranchTable {
        &self.low_temperature
    }

    pub fn high_temperature_branch(&self) -> &BranchTable {
        &self.high_temperature
    }

    pub fn low_pressure_branch(&self) -> &BranchTable {
        &self.low_pressure
    }

    pub fn high_pressure_branch(&self) -> &BranchTable {
        &self.high_pressure
    }

    pub fn pressure_ceiling_pf(&self) -> f64 {
        self.pressure_ceiling_pf
    }

    /// Low-branch (below ~315 mK) temperature in mK.
    pub fn capacitance_to_temperature_low(&self, capacitance_pf: f64) -> f64 {
        self.low_temperature.lookup(capacitance_pf)
    }

    /// High-branch temperature in mK.
    pub fn capacitance_to_temperature_high(&self, capacitance_pf: f64) -> f64 {
        self.high_temperature.lookup(capacitance_pf)
    }

    /// Low-branch pressure in MPa, restricted to capacitances below the
    /// pressure ceiling.
    pub fn capacitance_to_pressure_low(&self, capacitance_pf: f64) -> Result<f64, CalibrationError> {
        if self.low_pressure.is_empty() {
            return Err(CalibrationError::numeric(format!(
                "no tabulated low-branch capacitance below {} pF",
                self.pressure_ceiling_pf
            )));
        }
        Ok(self.low_pressure.lookup(capacitance_pf))
    }

    /// High-branch pressure in MPa.
    pub fn capacitance_to_pressure_high(&self, capacitance_pf: f64) -> f64 {
        self.high_pressure.lookup(capacitance_pf)
    }
}
