//! Helium-3 melting curve reference table.
//!
//! The curve is tabulated once from the fixed 13-term polynomial
//! `P(T) = Σ c_i T^i`, `i = -3..=9` (T in kelvin, P in MPa), over a
//! logarithmic temperature grid. It has a single pressure minimum near
//! 315 mK which splits it into a low-temperature branch (pressure falling
//! as T rises) and a high-temperature branch (pressure rising with T).

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::calibration::lookup::interp;

/// Melting-curve coefficients for powers -3 through 9, in that order.
pub const MELTING_CURVE_COEFFICIENTS: [f64; 13] = [
    -1.385_544_2e-12,
    4.555_702_6e-9,
    -6.443_086_9e-6,
    3.446_743_4,
    -4.417_643_8,
    1.541_743_7e1,
    -3.578_985_3e1,
    7.149_912_5e1,
    -1.041_437_9e2,
    1.051_853_8e2,
    -6.944_376_7e1,
    2.683_308_7e1,
    -4.587_570_9,
];

/// Power of the first entry of [`MELTING_CURVE_COEFFICIENTS`].
pub const LOWEST_POWER: i32 = -3;

/// `log10` of the first grid temperature in kelvin.
pub const GRID_LOG10_START: f64 = -3.1;
/// `log10` of the last grid temperature in kelvin.
pub const GRID_LOG10_STOP: f64 = 0.1;
/// Number of grid points.
pub const GRID_POINTS: usize = 2000;

/// Named thermometric fixed point on the melting curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedPoint {
    pub name: &'static str,
    pub temperature_mk: f64,
    pub pressure_mpa: f64,
}

/// Pressure minimum of the melting curve.
pub const P_MIN: FixedPoint = FixedPoint {
    name: "pmin",
    temperature_mk: 315.24,
    pressure_mpa: 2.93113,
};

/// Superfluid A transition.
pub const SUPERFLUID_A: FixedPoint = FixedPoint {
    name: "a",
    temperature_mk: 2.444,
    pressure_mpa: 3.43407,
};

/// A-B transition.
pub const A_B_TRANSITION: FixedPoint = FixedPoint {
    name: "ab",
    temperature_mk: 1.896,
    pressure_mpa: 3.43609,
};

/// Nuclear spin ordering in solid helium-3.
pub const NEEL: FixedPoint = FixedPoint {
    name: "neel",
    temperature_mk: 0.902,
    pressure_mpa: 3.43934,
};

pub const FIXED_POINTS: [FixedPoint; 4] = [P_MIN, SUPERFLUID_A, A_B_TRANSITION, NEEL];

/// Look up a fixed point by its short name (case-insensitive).
pub fn fixed_point(name: &str) -> Option<FixedPoint> {
    FIXED_POINTS
        .iter()
        .copied()
        .find(|fp| fp.name.eq_ignore_ascii_case(name))
}

static SHARED_CURVE: Lazy<Arc<ReferenceCurve>> =
    Lazy::new(|| Arc::new(ReferenceCurve::build()));

/// Process-wide read-only curve; building it is deterministic.
pub fn shared_curve() -> Arc<ReferenceCurve> {
    Arc::clone(&SHARED_CURVE)
}

/// Evaluate the melting-curve polynomial at `t_kelvin`.
pub fn melting_pressure(t_kelvin: f64) -> f64 {
    MELTING_CURVE_COEFFICIENTS
        .iter()
        .enumerate()
        .map(|(i, c)| c * t_kelvin.powi(LOWEST_POWER + i as i32))
        .sum()
}

/// `count` points evenly spaced in `log10` between `10^start` and `10^stop`.
pub fn logspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![10f64.powf(start)],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| 10f64.powf(start + step * i as f64))
                .collect()
        }
    }
}

/// Tabulated melting curve.
#[derive(Debug, Clone)]
pub struct ReferenceCurve {
    temperature_k: Vec<f64>,
    pressure_mpa: Vec<f64>,
    p_min_index: usize,
}

impl ReferenceCurve {
    /// Tabulate the curve over the fixed grid.
    pub fn build() -> Self {
        let temperature_k = logspace(GRID_LOG10_START, GRID_LOG10_STOP, GRID_POINTS);
        let pressure_mpa: Vec<f64> = temperature_k.iter().map(|&t| melting_pressure(t)).collect();
        let p_min_index = argmin(&pressure_mpa);

        let curve = Self {
            temperature_k,
            pressure_mpa,
            p_min_index,
        };

        let turning_points = curve.turning_points();
        if turning_points == 1 {
            log::debug!(
                "[MeltingCurve] Built {} points, minimum {:.6} MPa at {:.2} mK (index {})",
                curve.len(),
                curve.min_pressure(),
                curve.temperature_k[p_min_index] * 1e3,
                p_min_index
            );
        } else {
            log::warn!(
                "[MeltingCurve] Expected a single pressure minimum, found {} turning points; branch split at index {} may be ill-defined",
                turning_points,
                p_min_index
            );
        }
        curve
    }

    pub fn len(&self) -> usize {
        self.temperature_k.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperature_k.is_empty()
    }

    /// Grid temperatures in kelvin, strictly increasing.
    pub fn temperatures_k(&self) -> &[f64] {
        &self.temperature_k
    }

    /// Melting pressures in MPa, aligned with [`Self::temperatures_k`].
    pub fn pressures_mpa(&self) -> &[f64] {
        &self.pressure_mpa
    }

    /// Index of the tabulated pressure minimum.
    pub fn p_min_index(&self) -> usize {
        self.p_min_index
    }

    pub fn min_pressure(&self) -> f64 {
        self.pressure_mpa[self.p_min_index]
    }

    /// Number of sign changes of the discrete pressure derivative.
    pub fn turning_points(&self) -> usize {
        let slopes: Vec<f64> = self
            .pressure_mpa
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| *d != 0.0)
            .collect();
        slopes
            .windows(2)
            .filter(|w| w[0].signum() != w[1].signum())
            .count()
    }

    pub fn has_single_minimum(&self) -> bool {
        self.turning_points() == 1
            && self.p_min_index > 0
            && self.p_min_index + 1 < self.len()
    }

    /// Melting pressure at `temperature_mk`, interpolated on the grid and
    /// clamped to its ends.
    pub fn temperature_to_pressure(&self, temperature_mk: f64) -> f64 {
        interp(temperature_mk / 1e3, &self.temperature_k, &self.pressure_mpa)
    }

    /// Both melting-curve temperatures (mK) for `pressure_mpa`, low branch
    /// first. `None` when the pressure lies below the curve minimum.
    ///
    /// Pressures above a branch's highest tabulated value clamp to that
    /// branch's end.
    pub fn pressure_to_temperatures(&self, pressure_mpa: f64) -> Option<(f64, f64)> {
        if !(pressure_mpa >= self.min_pressure()) {
            return None;
        }
        let split = self.p_min_index;

        // Low branch: pressure falls with temperature, so reverse to ascending.
        let mut low_p: Vec<f64> = self.pressure_mpa[..=split].to_vec();
        let mut low_t: Vec<f64> = self.temperature_k[..=split].to_vec();
        low_p.reverse();
        low_t.reverse();

        let high_p = &self.pressure_mpa[split..];
        let high_t = &self.temperature_k[split..];

        let t_low = interp(pressure_mpa, &low_p, &low_t);
        let t_high = interp(pressure_mpa, high_p, high_t);
        Some((t_low * 1e3, t_high * 1e3))
    }
}

impl Default for ReferenceCurve {
    fn default() -> Self {
        Self::build()
    }
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best_i, best), (i, &v)| {
            if v < best {
                (i, v)
            } else {
                (best_i, best)
            }
        })
        .0
}
