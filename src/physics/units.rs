//! Unit conversions and water properties
//!
//! Every public model entry point takes inputs in the units practitioners
//! use (µm, mm, m/h, °C, days) and converts them here before any SI-based
//! correlation is evaluated.

use std::f64::consts::LN_10;

/// Boltzmann constant kB \[J/K\]
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Standard gravity g \[m/s²\]
pub const GRAVITY: f64 = 9.80665;

/// 0 °C in Kelvin
pub const ZERO_CELSIUS: f64 = 273.15;

/// Calendar month used for Schmutzdecke ages \[d\]
pub const DAYS_PER_MONTH: f64 = 365.0 / 12.0;

// =================================================================================================
// Length, velocity, temperature, time
// =================================================================================================

/// Micrometres to metres
#[inline]
pub fn um_to_m(value_um: f64) -> f64 {
    value_um * 1e-6
}

/// Millimetres to metres
#[inline]
pub fn mm_to_m(value_mm: f64) -> f64 {
    value_mm * 1e-3
}

/// Metres per hour to metres per second
#[inline]
pub fn m_per_h_to_m_per_s(value: f64) -> f64 {
    value / 3600.0
}

/// Metres per hour to metres per day
#[inline]
pub fn m_per_h_to_m_per_day(value: f64) -> f64 {
    value * 24.0
}

/// Degrees Celsius to Kelvin
#[inline]
pub fn celsius_to_kelvin(value_c: f64) -> f64 {
    value_c + ZERO_CELSIUS
}

/// Days to months
#[inline]
pub fn days_to_months(days: f64) -> f64 {
    days / DAYS_PER_MONTH
}

/// Months to days
#[inline]
pub fn months_to_days(months: f64) -> f64 {
    months * DAYS_PER_MONTH
}

// =================================================================================================
// Log conventions
// =================================================================================================

/// Natural-log removal −ln(C/C0) to log10 removal −log10(C/C0)
#[inline]
pub fn ln_to_log10(value: f64) -> f64 {
    value / LN_10
}

/// log10 removal to natural-log removal
#[inline]
pub fn log10_to_ln(value: f64) -> f64 {
    value * LN_10
}

// =================================================================================================
// Water properties
// =================================================================================================

/// Dynamic viscosity of water μ(T) \[Pa·s\], T in Kelvin
///
/// ```text
/// μ(T) = 2.414e-5 · 10^(247.8 / (T − 140))
/// ```
pub fn water_viscosity(temperature_k: f64) -> f64 {
    2.414e-5 * 10f64.powf(247.8 / (temperature_k - 140.0))
}

/// Density of water ρ(T) \[kg/m³\], T in °C
///
/// Quadratic approximation around the 4 °C density maximum.
pub fn water_density(temperature_c: f64) -> f64 {
    let dt = temperature_c - 4.0;
    1000.0 * (1.0 - 6.8e-6 * dt * dt)
}
