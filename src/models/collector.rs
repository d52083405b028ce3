//! Single-collector contact efficiency (clean-bed colloid filtration theory)
//!
//! # Mathematical Background
//!
//! A sand grain is treated as a spherical collector inside a Happel sphere-in-cell.
//! Particles reach it by Brownian diffusion, interception and gravitational
//! sedimentation. The Tufenkji–Elimelech correlation gives each transport
//! contribution from dimensionless groups:
//!
//! ```text
//! ηD = 2.4 · As^(1/3) · NR^(−0.081) · NPe^(−0.715) · NvdW^(0.052)
//! ηI = 0.55 · As · NR^(1.675) · NA^(0.125)
//! ηG = 0.22 · NR^(−0.24) · NG^(1.11) · NvdW^(0.053)
//! η0 = ηD + ηI + ηG
//! ```
//!
//! with
//!
//! | Group | Expression | Meaning |
//! |-------|------------|---------|
//! | NR    | dp / dc | aspect ratio |
//! | NPe   | U·dc / D | Péclet number |
//! | NvdW  | A / (kB·T) | van der Waals number |
//! | NA    | A / (12π·μ·ap²·U) | attraction number |
//! | NG    | (2/9)·ap²·(ρp − ρf)·g / (μ·U) | gravity number |
//!
//! where ap = dp/2 and D = kB·T / (3π·μ·dp) (Stokes–Einstein).
//!
//! The Happel parameter is As = 2(1 − γ⁵) / (2 − 3γ + 3γ⁵ − 2γ⁶) with
//! γ = (1 − f)^(1/3). Numerator and denominator share the factor (1 − γ),
//! which vanishes as f → 0, so the factored form
//! `As = 2(1+γ+γ²+γ³+γ⁴) / ((1−γ)²(1+γ)(2γ²+γ+2))` is evaluated, with
//! `1 − γ = f / (1 + γ + γ²)`.
//!
//! # Filter scale
//!
//! Over a bed of depth L with sticking efficiency α:
//!
//! ```text
//! log10(C0/C) = (3/2) · (1 − f)/dc · α · η0 · L / ln 10
//! ```
//!
//! # Units
//!
//! [`CollectorInputs`] takes practitioner units (µm, mm, m/h, °C, kg/m³, J) and
//! converts to SI once, in [`derived_quantities`].
//!
//! # Validity
//!
//! The correlation was fitted for 0.01 ≤ NR ≤ 0.1 and 10² ≤ NPe ≤ 10⁷. Outside
//! that window the result is still returned, with an advisory.
//!
//! # Scientific Foundation
//!
//! > **Tufenkji, N., Elimelech, M.** (2004). Correlation equation for predicting
//! > single-collector efficiency in physicochemical filtration in saturated porous media.
//! > *Environmental Science & Technology* 38(2), 529–536.
//!
//! # Example Usage
//!
//! ```rust
//! use ssf_rs::models::collector::{collector_efficiency, derived_quantities, CollectorInputs};
//!
//! let inputs = CollectorInputs::default().with_particle_diameter(1.0);
//! let derived = derived_quantities(&inputs).unwrap();
//! let eta = collector_efficiency(&derived);
//!
//! assert!(eta.eta0 > 0.0 && eta.eta0 < 1.0);
//! assert!((eta.eta0 - (eta.eta_d + eta.eta_i + eta.eta_g)).abs() < 1e-15);
//! ```

use std::f64::consts::{LN_10, PI};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{
    clamp_non_negative, ensure_finite, ensure_open_fraction, ensure_positive, ModelError, ModelResult,
};
use crate::physics::units::{
    celsius_to_kelvin, m_per_h_to_m_per_s, mm_to_m, um_to_m, water_density, water_viscosity, BOLTZMANN,
    GRAVITY,
};
use crate::physics::{
    Advisory, AdvisoryKind, Contribution, Parameter, ParameterRecord, PredictionResult, RemovalConvention,
    RemovalModel,
};
use crate::sweep::{run_sweep, SweepConfiguration, SweepSeries};

const MODEL: &str = "SingleCollectorEfficiency";

/// Applicability window of the correlation for NR
pub const NR_VALIDITY: (f64, f64) = (0.01, 0.1);

/// Applicability window of the correlation for NPe
pub const NPE_VALIDITY: (f64, f64) = (1e2, 1e7);

// =================================================================================================
// Inputs
// =================================================================================================

/// Operating point of the collector correlation, in practitioner units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectorInputs {
    /// Particle (microbe) diameter dp \[µm\]
    pub particle_diameter: f64,
    /// Collector (grain) diameter dc \[mm\]
    pub collector_diameter: f64,
    /// Approach velocity U \[m/h\]
    pub velocity: f64,
    /// Bed porosity f \[-\]
    pub porosity: f64,
    /// Particle density ρp \[kg/m³\]
    pub particle_density: f64,
    /// Water temperature \[°C\]
    pub temperature: f64,
    /// Hamaker constant A \[J\]
    pub hamaker: f64,
}

impl Default for CollectorInputs {
    /// Bacterium-sized particle in a typical slow sand filter
    fn default() -> Self {
        Self {
            particle_diameter: 1.0,
            collector_diameter: 0.3,
            velocity: 0.2,
            porosity: 0.38,
            particle_density: 1050.0,
            temperature: 15.0,
            hamaker: 1e-20,
        }
    }
}

impl CollectorInputs {
    /// Builder: set particle diameter \[µm\]
    pub fn with_particle_diameter(mut self, value: f64) -> Self {
        self.particle_diameter = value;
        self
    }

    /// Builder: set collector diameter \[mm\]
    pub fn with_collector_diameter(mut self, value: f64) -> Self {
        self.collector_diameter = value;
        self
    }

    /// Builder: set approach velocity \[m/h\]
    pub fn with_velocity(mut self, value: f64) -> Self {
        self.velocity = value;
        self
    }

    /// Builder: set porosity \[-\]
    pub fn with_porosity(mut self, value: f64) -> Self {
        self.porosity = value;
        self
    }

    /// Builder: set temperature \[°C\]
    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = value;
        self
    }

    /// Builder: set Hamaker constant \[J\]
    pub fn with_hamaker(mut self, value: f64) -> Self {
        self.hamaker = value;
        self
    }

    /// Builder: set particle density \[kg/m³\]
    pub fn with_particle_density(mut self, value: f64) -> Self {
        self.particle_density = value;
        self
    }

    /// Copy with one sweep variable replaced
    pub fn with_variable(self, variable: CollectorVariable, value: f64) -> Self {
        match variable {
            CollectorVariable::ParticleDiameter => self.with_particle_diameter(value),
            CollectorVariable::CollectorDiameter => self.with_collector_diameter(value),
            CollectorVariable::Velocity => self.with_velocity(value),
            CollectorVariable::Porosity => self.with_porosity(value),
            CollectorVariable::Temperature => self.with_temperature(value),
            CollectorVariable::Hamaker => self.with_hamaker(value),
            CollectorVariable::ParticleDensity => self.with_particle_density(value),
        }
    }

    /// Read the inputs from a record; particle density is not a record field
    pub fn from_record(record: &ParameterRecord, particle_density: f64, model: &str) -> ModelResult<Self> {
        Ok(Self {
            particle_diameter: record.require(Parameter::ParticleDiameter, model)?,
            collector_diameter: record.require(Parameter::CollectorDiameter, model)?,
            velocity: record.require(Parameter::Velocity, model)?,
            porosity: record.require(Parameter::Porosity, model)?,
            particle_density,
            temperature: record.require(Parameter::Temperature, model)?,
            hamaker: record.require(Parameter::Hamaker, model)?,
        })
    }
}

/// Independent variables a collector sweep can vary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorVariable {
    ParticleDiameter,
    CollectorDiameter,
    Velocity,
    Porosity,
    Temperature,
    Hamaker,
    ParticleDensity,
}

impl CollectorVariable {
    const ALL: [CollectorVariable; 7] = [
        CollectorVariable::ParticleDiameter,
        CollectorVariable::CollectorDiameter,
        CollectorVariable::Velocity,
        CollectorVariable::Porosity,
        CollectorVariable::Temperature,
        CollectorVariable::Hamaker,
        CollectorVariable::ParticleDensity,
    ];

    /// String key
    pub fn key(&self) -> &'static str {
        match self {
            CollectorVariable::ParticleDensity => "particle_density",
            other => other.parameter().map(|p| p.key()).unwrap_or_default(),
        }
    }

    /// Unit of the swept value
    pub fn unit(&self) -> &'static str {
        match self {
            CollectorVariable::ParticleDensity => "kg/m³",
            other => other.parameter().map(|p| p.unit()).unwrap_or_default(),
        }
    }

    /// Matching record parameter, if any
    pub fn parameter(&self) -> Option<Parameter> {
        match self {
            CollectorVariable::ParticleDiameter => Some(Parameter::ParticleDiameter),
            CollectorVariable::CollectorDiameter => Some(Parameter::CollectorDiameter),
            CollectorVariable::Velocity => Some(Parameter::Velocity),
            CollectorVariable::Porosity => Some(Parameter::Porosity),
            CollectorVariable::Temperature => Some(Parameter::Temperature),
            CollectorVariable::Hamaker => Some(Parameter::Hamaker),
            CollectorVariable::ParticleDensity => None,
        }
    }
}

impl fmt::Display for CollectorVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CollectorVariable {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        CollectorVariable::ALL
            .iter()
            .copied()
            .find(|v| v.key() == key)
            .ok_or(ModelError::UnsupportedVariable { model: MODEL.to_string(), variable: s.to_string() })
    }
}

// =================================================================================================
// Derived quantities
// =================================================================================================

/// Intermediate quantities of the correlation (SI units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedQuantities {
    /// Absolute temperature \[K\]
    pub temperature_k: f64,
    /// Dynamic viscosity \[Pa·s\]
    pub viscosity: f64,
    /// Fluid density \[kg/m³\]
    pub fluid_density: f64,
    /// Stokes–Einstein diffusivity \[m²/s\]
    pub diffusivity: f64,
    /// Happel parameter As \[-\]
    pub happel_parameter: f64,
    /// Aspect ratio NR
    pub nr: f64,
    /// Péclet number NPe
    pub npe: f64,
    /// van der Waals number NvdW
    pub nvdw: f64,
    /// Gravity number NG, clamped at 0 for buoyant particles
    pub ng: f64,
    /// Attraction number NA
    pub na: f64,
    /// True when ρp < ρf and NG was clamped
    pub buoyant: bool,
}

/// Happel sphere-in-cell parameter As for porosity f ∈ ]0,1[
///
/// ```rust
/// use ssf_rs::models::collector::happel_parameter;
///
/// let textbook = |f: f64| {
///     let g = (1.0 - f).cbrt();
///     2.0 * (1.0 - g.powi(5)) / (2.0 - 3.0 * g + 3.0 * g.powi(5) - 2.0 * g.powi(6))
/// };
/// let a = happel_parameter(0.4).unwrap();
/// assert!((a - textbook(0.4)).abs() / a < 1e-10);
/// ```
pub fn happel_parameter(porosity: f64) -> ModelResult<f64> {
    let f = ensure_open_fraction(MODEL, "porosity", porosity)?;
    let g = (1.0 - f).cbrt();
    let g2 = g * g;
    let one_minus_g = f / (1.0 + g + g2);

    let numerator = 2.0 * (1.0 + g + g2 + g2 * g + g2 * g2);
    let denominator = one_minus_g * one_minus_g * (1.0 + g) * (2.0 * g2 + g + 2.0);
    Ok(numerator / denominator)
}

/// Compute the dimensionless groups from practitioner-unit inputs
///
/// # Errors
/// - dp, dc, U or A not strictly positive
/// - porosity outside `]0,1[`
/// - temperature at or below −133.15 °C (viscosity correlation singular)
pub fn derived_quantities(inputs: &CollectorInputs) -> ModelResult<DerivedQuantities> {
    let dp = um_to_m(ensure_positive(MODEL, "particle_diameter", inputs.particle_diameter)?);
    let dc = mm_to_m(ensure_positive(MODEL, "collector_diameter", inputs.collector_diameter)?);
    let u = m_per_h_to_m_per_s(ensure_positive(MODEL, "velocity", inputs.velocity)?);
    let hamaker = ensure_positive(MODEL, "hamaker", inputs.hamaker)?;
    let rho_p = clamp_non_negative(MODEL, "particle_density", inputs.particle_density)?;
    let temperature_c = ensure_finite(MODEL, "temperature", inputs.temperature)?;

    let temperature_k = celsius_to_kelvin(temperature_c);
    if temperature_k <= 140.0 {
        return Err(ModelError::domain(MODEL, "temperature_k", temperature_k, "> 140 K"));
    }

    let happel = happel_parameter(inputs.porosity)?;
    let mu = water_viscosity(temperature_k);
    let rho_f = water_density(temperature_c);
    let ap = dp / 2.0;
    let kt = BOLTZMANN * temperature_k;

    let diffusivity = kt / (3.0 * PI * mu * dp);
    let raw_ng = (2.0 / 9.0) * ap * ap * (rho_p - rho_f) * GRAVITY / (mu * u);
    let buoyant = raw_ng < 0.0;

    let derived = DerivedQuantities {
        temperature_k,
        viscosity: mu,
        fluid_density: rho_f,
        diffusivity,
        happel_parameter: happel,
        nr: dp / dc,
        npe: u * dc / diffusivity,
        nvdw: hamaker / kt,
        ng: raw_ng.max(0.0),
        na: hamaker / (12.0 * PI * mu * ap * ap * u),
        buoyant,
    };
    log::debug!("{}: derived {:?}", MODEL, derived);
    Ok(derived)
}

// =================================================================================================
// Efficiency
// =================================================================================================

/// Single-collector contact efficiencies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectorEfficiency {
    /// Diffusion
    pub eta_d: f64,
    /// Interception
    pub eta_i: f64,
    /// Gravity
    pub eta_g: f64,
    /// Total
    pub eta0: f64,
}

impl CollectorEfficiency {
    /// Per-mechanism breakdown
    pub fn breakdown(&self) -> Vec<Contribution> {
        vec![
            Contribution::new("eta_d", self.eta_d),
            Contribution::new("eta_i", self.eta_i),
            Contribution::new("eta_g", self.eta_g),
        ]
    }
}

/// Tufenkji–Elimelech contact efficiencies for the given groups
pub fn collector_efficiency(derived: &DerivedQuantities) -> CollectorEfficiency {
    let DerivedQuantities { happel_parameter: a_s, nr, npe, nvdw, ng, na, .. } = *derived;

    let eta_d = 2.4 * a_s.cbrt() * nr.powf(-0.081) * npe.powf(-0.715) * nvdw.powf(0.052);
    let eta_i = 0.55 * a_s * nr.powf(1.675) * na.powf(0.125);
    let eta_g = 0.22 * nr.powf(-0.24) * ng.powf(1.11) * nvdw.powf(0.053);

    CollectorEfficiency { eta_d, eta_i, eta_g, eta0: eta_d + eta_i + eta_g }
}

/// Whether NR and NPe fall inside the fitted window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityFlags {
    pub nr_in_range: bool,
    pub npe_in_range: bool,
}

impl ValidityFlags {
    /// True when both groups are inside the window
    pub fn all_in_range(&self) -> bool {
        self.nr_in_range && self.npe_in_range
    }
}

/// Check NR and NPe against the correlation's fitted window
pub fn validity_flags(nr: f64, npe: f64) -> ValidityFlags {
    ValidityFlags {
        nr_in_range: (NR_VALIDITY.0..=NR_VALIDITY.1).contains(&nr),
        npe_in_range: (NPE_VALIDITY.0..=NPE_VALIDITY.1).contains(&npe),
    }
}

/// Advisories for an evaluated operating point
pub fn advisories(derived: &DerivedQuantities) -> Vec<Advisory> {
    let flags = validity_flags(derived.nr, derived.npe);
    let mut advisories = Vec::new();

    if !flags.nr_in_range {
        advisories.push(Advisory::new(
            AdvisoryKind::OutsideValidityRange,
            format!("{}: NR = {:.4e} outside [{}, {}]", MODEL, derived.nr, NR_VALIDITY.0, NR_VALIDITY.1),
        ));
    }
    if !flags.npe_in_range {
        advisories.push(Advisory::new(
            AdvisoryKind::OutsideValidityRange,
            format!("{}: NPe = {:.4e} outside [{:e}, {:e}]", MODEL, derived.npe, NPE_VALIDITY.0, NPE_VALIDITY.1),
        ));
    }
    if derived.buoyant {
        advisories.push(Advisory::new(
            AdvisoryKind::Clamped,
            format!("{}: particle lighter than water, gravity term set to 0", MODEL),
        ));
    }
    advisories
}

/// Filter coefficient λ = (3/2)·(1 − f)/dc·α·η0 \[m⁻¹\]
///
/// `collector_diameter_m` in metres.
pub fn filter_coefficient(porosity: f64, collector_diameter_m: f64, alpha: f64, eta0: f64) -> ModelResult<f64> {
    let f = ensure_open_fraction(MODEL, "porosity", porosity)?;
    let dc = ensure_positive(MODEL, "collector_diameter", collector_diameter_m)?;
    let alpha = clamp_non_negative(MODEL, "sticking_efficiency", alpha)?;
    let eta0 = clamp_non_negative(MODEL, "eta0", eta0)?;
    Ok(1.5 * (1.0 - f) / dc * alpha * eta0)
}

/// log10 removal over a bed of depth `bed_depth_m`
///
/// ```text
/// (3/2) · (1 − f)/dc · (L / ln 10) · α · η0
/// ```
pub fn filter_scale_log_removal(
    porosity: f64,
    collector_diameter_m: f64,
    bed_depth_m: f64,
    alpha: f64,
    eta0: f64,
) -> ModelResult<f64> {
    let depth = clamp_non_negative(MODEL, "bed_depth", bed_depth_m)?;
    Ok(filter_coefficient(porosity, collector_diameter_m, alpha, eta0)? * depth / LN_10)
}

/// Sweep the contact efficiencies over one input
///
/// Columns: `eta_d`, `eta_i`, `eta_g`, `eta0`. Use logarithmic spacing for
/// particle diameter sweeps across orders of magnitude.
///
/// ```rust
/// use ssf_rs::models::collector::{sweep_over_variable, CollectorInputs, CollectorVariable};
/// use ssf_rs::sweep::{SweepConfiguration, SweepRange};
///
/// let config = SweepConfiguration::new(SweepRange::logarithmic(0.01, 10.0, 31));
/// let series = sweep_over_variable(CollectorVariable::ParticleDiameter, &config, &CollectorInputs::default()).unwrap();
/// assert_eq!(series.labels, ["eta_d", "eta_i", "eta_g", "eta0"]);
/// ```
pub fn sweep_over_variable(
    variable: CollectorVariable,
    config: &SweepConfiguration,
    fixed: &CollectorInputs,
) -> ModelResult<SweepSeries> {
    run_sweep(config, variable.key(), variable.unit(), &["eta_d", "eta_i", "eta_g", "eta0"], |x| {
        let derived = derived_quantities(&fixed.with_variable(variable, x))?;
        let eta = collector_efficiency(&derived);
        Ok(vec![eta.eta_d, eta.eta_i, eta.eta_g, eta.eta0])
    })
}

// =================================================================================================
// Record-driven model
// =================================================================================================

/// Collector correlation evaluated from a [`ParameterRecord`]
///
/// Without a bed depth the prediction is η0. With one, it is the
/// filter-scale log10 removal and the record must also carry the sticking
/// efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleCollectorModel {
    /// Particle density ρp \[kg/m³\]
    particle_density: f64,
    /// Bed depth L \[m\]
    bed_depth: Option<f64>,
}

impl Default for SingleCollectorModel {
    fn default() -> Self {
        Self::new(CollectorInputs::default().particle_density)
    }
}

impl SingleCollectorModel {
    /// Model predicting η0 for particles of density `particle_density` \[kg/m³\]
    pub fn new(particle_density: f64) -> Self {
        Self { particle_density, bed_depth: None }
    }

    /// Builder: predict log10 removal over a bed of `depth` \[m\]
    pub fn with_bed_depth(mut self, depth: f64) -> Self {
        self.bed_depth = Some(depth);
        self
    }
}

impl RemovalModel for SingleCollectorModel {
    fn name(&self) -> &str {
        MODEL
    }

    fn equation(&self) -> &str {
        match self.bed_depth {
            None => "eta0 = etaD + etaI + etaG",
            Some(_) => "log10(C0/C) = 1.5 (1 - f)/dc * alpha * eta0 * L / ln10",
        }
    }

    fn description(&self) -> Option<&str> {
        Some("Tufenkji-Elimelech single-collector contact efficiency")
    }

    fn required_parameters(&self) -> Vec<Parameter> {
        let mut parameters = vec![
            Parameter::ParticleDiameter,
            Parameter::CollectorDiameter,
            Parameter::Velocity,
            Parameter::Porosity,
            Parameter::Temperature,
            Parameter::Hamaker,
        ];
        if self.bed_depth.is_some() {
            parameters.push(Parameter::StickingEfficiency);
        }
        parameters
    }

    fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult> {
        let inputs = CollectorInputs::from_record(record, self.particle_density, MODEL)?;
        let derived = derived_quantities(&inputs)?;
        let eta = collector_efficiency(&derived);
        let advisories = advisories(&derived);

        let result = match self.bed_depth {
            None => PredictionResult::new(eta.eta0, RemovalConvention::Efficiency, MODEL),
            Some(depth) => {
                let alpha = record.require(Parameter::StickingEfficiency, MODEL)?;
                let removal = filter_scale_log_removal(
                    inputs.porosity,
                    mm_to_m(inputs.collector_diameter),
                    depth,
                    alpha,
                    eta.eta0,
                )?;
                PredictionResult::new(removal, RemovalConvention::Log10Removal, MODEL)
            }
        };

        Ok(result.with_breakdown(eta.breakdown()).with_advisories(advisories))
    }
}

// =================================================================================================
// Tests
// =================================================================================================
