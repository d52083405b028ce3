//! Two-site kinetic attachment model (steady state)
//!
//! # Mathematical Background
//!
//! ## Removal coefficient
//!
//! Microorganisms in the liquid phase are inactivated at rate μL and attach
//! to two populations of sites. Site *i* has attachment rate katt,i,
//! detachment rate kdet,i and inactivation rate of attached organisms μs,i.
//! At steady state the attached phase of each site is in balance and the
//! overall first-order removal coefficient becomes
//!
//! ```text
//! λ = μL + katt1 / (1 + kdet1/μs1) + katt2 / (1 + kdet2/μs2)
//! ```
//!
//! All rates are in d⁻¹, so λ is in d⁻¹.
//!
//! ## Concentration profile
//!
//! With longitudinal dispersivity αL and pore velocity v, the steady
//! advection–dispersion–removal balance `αL·v·C'' − v·C' − λ·C = 0` has the
//! decaying solution C(x)/C0 = exp(k·x) with
//!
//! ```text
//! k = (1 − √(1 + 4·αL·λ/v)) / (2·αL)
//! ```
//!
//! The implementation evaluates the algebraically identical form
//! `k = −(2λ/v) / (1 + √(1 + 4·αL·λ/v))`, which has no cancellation for small
//! αL and reduces to the advective limit `k = −λ/v` at αL = 0.
//!
//! # Edge cases
//!
//! - μs,i = 0 is a singularity of the site term: evaluation fails with a
//!   domain violation rather than returning the asymptote katt,i.
//! - A negative discriminant (only reachable with negative λ) fails with a
//!   domain violation.
//!
//! # Scientific Foundation
//!
//! > **Schijven, J. F., Hassanizadeh, S. M.** (2000). Removal of viruses by soil
//! > passage: overview of modeling, processes, and parameters.
//! > *Critical Reviews in Environmental Science and Technology* 30(1), 49–127.
//!
//! # Example Usage
//!
//! ```rust
//! use ssf_rs::models::two_site::{DispersiveTransport, TwoSiteModel, TwoSiteRates};
//! use ssf_rs::sweep::SweepRange;
//!
//! let rates = TwoSiteRates::new(0.1, 50.0, 0.1, 0.5, 30.0, 10.0, 0.5);
//! let transport = DispersiveTransport::from_m_per_hour(0.1, 0.01).unwrap();
//! let model = TwoSiteModel::new(rates, transport);
//!
//! let lambda = model.removal_coefficient().unwrap();
//! assert!((lambda - 43.195).abs() < 1e-3);
//!
//! let profile = model.profile(&SweepRange::linear(0.0, 1.0, 11)).unwrap();
//! assert_eq!(profile.len(), 11);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{clamp_non_negative, ensure_finite, ensure_positive, ModelError, ModelResult};
use crate::physics::units::m_per_h_to_m_per_day;
use crate::sweep::{run_sweep, SweepConfiguration, SweepRange, SweepSeries};

const MODEL: &str = "TwoSiteKinetic";

// =================================================================================================
// Rates
// =================================================================================================

/// Rate constants of the two-site model, all in d⁻¹
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoSiteRates {
    /// Inactivation rate in the liquid phase μL
    pub mu_l: f64,
    /// Attachment rate to site 1
    pub k_att1: f64,
    /// Detachment rate from site 1
    pub k_det1: f64,
    /// Inactivation rate of organisms attached to site 1
    pub mu_s1: f64,
    /// Attachment rate to site 2
    pub k_att2: f64,
    /// Detachment rate from site 2
    pub k_det2: f64,
    /// Inactivation rate of organisms attached to site 2
    pub mu_s2: f64,
}

impl TwoSiteRates {
    /// Create a rate set
    pub fn new(
        mu_l: f64,
        k_att1: f64,
        k_det1: f64,
        mu_s1: f64,
        k_att2: f64,
        k_det2: f64,
        mu_s2: f64,
    ) -> Self {
        Self { mu_l, k_att1, k_det1, mu_s1, k_att2, k_det2, mu_s2 }
    }

    /// Steady-state removal coefficient λ \[d⁻¹\]
    pub fn removal_coefficient(&self) -> ModelResult<f64> {
        effective_removal_coefficient(
            self.mu_l,
            self.k_att1,
            self.k_det1,
            self.mu_s1,
            self.k_att2,
            self.k_det2,
            self.mu_s2,
        )
    }
}

/// Contribution of one site population: katt / (1 + kdet/μs)
fn site_term(
    k_att: f64,
    k_det: f64,
    mu_s: f64,
    names: (&'static str, &'static str, &'static str),
) -> ModelResult<f64> {
    let k_att = clamp_non_negative(MODEL, names.0, k_att)?;
    let k_det = clamp_non_negative(MODEL, names.1, k_det)?;
    let mu_s = ensure_finite(MODEL, names.2, mu_s)?;

    if mu_s <= 0.0 {
        return Err(ModelError::domain(MODEL, names.2, mu_s, "> 0 (site term is singular)"));
    }

    Ok(k_att / (1.0 + k_det / mu_s))
}

/// Steady-state removal coefficient λ \[d⁻¹\]
///
/// ```text
/// λ = μL + katt1/(1 + kdet1/μs1) + katt2/(1 + kdet2/μs2)
/// ```
///
/// Negative rates are clamped at zero.
///
/// # Errors
/// [`ModelError::DomainViolation`] when μs1 or μs2 is not strictly positive.
pub fn effective_removal_coefficient(
    mu_l: f64,
    k_att1: f64,
    k_det1: f64,
    mu_s1: f64,
    k_att2: f64,
    k_det2: f64,
    mu_s2: f64,
) -> ModelResult<f64> {
    let mu_l = clamp_non_negative(MODEL, "mu_l", mu_l)?;
    let site1 = site_term(k_att1, k_det1, mu_s1, ("k_att1", "k_det1", "mu_s1"))?;
    let site2 = site_term(k_att2, k_det2, mu_s2, ("k_att2", "k_det2", "mu_s2"))?;

    let lambda = mu_l + site1 + site2;
    log::debug!("{}: lambda = {} 1/d (site1 {}, site2 {})", MODEL, lambda, site1, site2);
    Ok(lambda)
}

// =================================================================================================
// Transport
// =================================================================================================

/// Advective–dispersive transport through the bed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispersiveTransport {
    /// Pore velocity v \[m/d\]
    velocity: f64,
    /// Longitudinal dispersivity αL \[m\]
    dispersivity: f64,
}

impl DispersiveTransport {
    /// Create from velocity in m/d and dispersivity in m
    ///
    /// # Errors
    /// Velocity must be > 0 and dispersivity ≥ 0.
    pub fn new(velocity_m_per_day: f64, dispersivity_m: f64) -> ModelResult<Self> {
        let velocity = ensure_positive(MODEL, "velocity", velocity_m_per_day)?;
        let dispersivity = ensure_finite(MODEL, "dispersivity", dispersivity_m)?;
        if dispersivity < 0.0 {
            return Err(ModelError::domain(MODEL, "dispersivity", dispersivity, ">= 0"));
        }
        Ok(Self { velocity, dispersivity })
    }

    /// Create from velocity in m/h (filtration rates are usually quoted that way)
    pub fn from_m_per_hour(velocity_m_per_h: f64, dispersivity_m: f64) -> ModelResult<Self> {
        Self::new(m_per_h_to_m_per_day(velocity_m_per_h), dispersivity_m)
    }

    /// Pore velocity \[m/d\]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Longitudinal dispersivity \[m\]
    pub fn dispersivity(&self) -> f64 {
        self.dispersivity
    }

    /// Profile exponent k \[m⁻¹\] for removal coefficient λ \[d⁻¹\]
    pub fn exponent(&self, lambda: f64) -> ModelResult<f64> {
        profile_exponent(self.velocity, self.dispersivity, lambda)
    }
}

/// Exponent k \[m⁻¹\] of C(x)/C0 = exp(k·x)
///
/// # Errors
/// - v ≤ 0 or αL < 0
/// - 1 + 4·αL·λ/v < 0
pub fn profile_exponent(velocity: f64, dispersivity: f64, lambda: f64) -> ModelResult<f64> {
    let velocity = ensure_positive(MODEL, "velocity", velocity)?;
    let dispersivity = ensure_finite(MODEL, "dispersivity", dispersivity)?;
    let lambda = ensure_finite(MODEL, "lambda", lambda)?;
    if dispersivity < 0.0 {
        return Err(ModelError::domain(MODEL, "dispersivity", dispersivity, ">= 0"));
    }

    let discriminant = 1.0 + 4.0 * dispersivity * lambda / velocity;
    if discriminant < 0.0 {
        return Err(ModelError::domain(
            MODEL,
            "1 + 4*alphaL*lambda/v",
            discriminant,
            ">= 0",
        ));
    }

    Ok(-(2.0 * lambda / velocity) / (1.0 + discriminant.sqrt()))
}

/// log10 removal reached at `depth` for profile exponent k: −k·x / ln 10
#[inline]
pub fn log_removal_at_depth(exponent: f64, depth: f64) -> f64 {
    -exponent * depth / std::f64::consts::LN_10
}

/// Concentration profile over a depth range
///
/// Returns a series over depth \[m\] with columns `c_over_c0` and
/// `log10_removal`.
pub fn concentration_profile(
    velocity: f64,
    dispersivity: f64,
    lambda: f64,
    depth: &SweepRange,
) -> ModelResult<SweepSeries> {
    let exponent = profile_exponent(velocity, dispersivity, lambda)?;
    run_sweep(
        &SweepConfiguration::new(*depth),
        "depth",
        "m",
        &["c_over_c0", "log10_removal"],
        |x| Ok(vec![(exponent * x).exp(), log_removal_at_depth(exponent, x)]),
    )
}

/// Depth \[m\] at which C/C0 falls to `target_ratio`
///
/// Returns `None` when no finite depth exists (non-negative exponent,
/// ratio outside `]0,1[`) or when the depth falls outside `plausible`.
pub fn depth_for_target_removal(
    target_ratio: f64,
    exponent: f64,
    plausible: (f64, f64),
) -> Option<f64> {
    if !target_ratio.is_finite() || target_ratio <= 0.0 || target_ratio >= 1.0 {
        return None;
    }
    if !exponent.is_finite() || exponent >= 0.0 {
        return None;
    }

    let depth = target_ratio.ln() / exponent;
    (depth >= plausible.0 && depth <= plausible.1).then_some(depth)
}

/// Depth \[m\] needed for a log10 removal target
pub fn depth_for_log_removal(log10_target: f64, exponent: f64, plausible: (f64, f64)) -> Option<f64> {
    depth_for_target_removal(10f64.powf(-log10_target), exponent, plausible)
}

// =================================================================================================
// Model
// =================================================================================================

/// Two-site kinetics coupled with dispersive transport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoSiteModel {
    rates: TwoSiteRates,
    transport: DispersiveTransport,
}

impl TwoSiteModel {
    /// Create a model
    pub fn new(rates: TwoSiteRates, transport: DispersiveTransport) -> Self {
        Self { rates, transport }
    }

    /// Rate constants
    pub fn rates(&self) -> &TwoSiteRates {
        &self.rates
    }

    /// Transport parameters
    pub fn transport(&self) -> &DispersiveTransport {
        &self.transport
    }

    /// Removal coefficient λ \[d⁻¹\]
    pub fn removal_coefficient(&self) -> ModelResult<f64> {
        self.rates.removal_coefficient()
    }

    /// Profile exponent k \[m⁻¹\]
    pub fn exponent(&self) -> ModelResult<f64> {
        self.transport.exponent(self.removal_coefficient()?)
    }

    /// log10 removal at `depth` \[m\]
    pub fn log_removal(&self, depth: f64) -> ModelResult<f64> {
        Ok(log_removal_at_depth(self.exponent()?, depth))
    }

    /// Concentration profile over a depth range \[m\]
    pub fn profile(&self, depth: &SweepRange) -> ModelResult<SweepSeries> {
        concentration_profile(
            self.transport.velocity,
            self.transport.dispersivity,
            self.removal_coefficient()?,
            depth,
        )
    }

    /// Depth \[m\] needed for a log10 removal target, within `plausible`
    pub fn depth_for_log_removal(&self, log10_target: f64, plausible: (f64, f64)) -> ModelResult<Option<f64>> {
        Ok(depth_for_log_removal(log10_target, self.exponent()?, plausible))
    }
}

// =================================================================================================
// Tests
// =================================================================================================
