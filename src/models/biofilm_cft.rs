//! Biofilm-augmented colloid filtration
//!
//! Two complementary descriptions of how a developing biofilm changes
//! removal in the bed.
//!
//! # (a) System-property regression
//!
//! A linear fit over bulk properties of the colonised bed:
//!
//! ```text
//! −ln(C/C0) = β0 + β1·θ + β2·HC + β3·τ + β4·SVR
//! ```
//!
//! with θ porosity, HC normalised hydraulic conductivity, τ tortuosity and
//! SVR the surface-to-volume ratio \[µm⁻¹\]. The response is a **natural-log**
//! removal; [`SystemBreakdown::log10_total`] converts it. Negative totals
//! occur at non-physical inputs and are kept in the raw value, clamped only
//! in the presentation value of the [`PredictionResult`].
//!
//! # (b) Three-stage mechanistic model
//!
//! Biofilm growth is split into three stages, each adding an efficiency
//! term on top of the clean-bed efficiency η_base:
//!
//! | Stage | Mechanism | Driver |
//! |-------|-----------|--------|
//! | 1 | roughness | T1 = f_shape + f_concave |
//! | 2 | EPS network | T2 = SVR·dp / RC |
//! | 3 | pore occlusion | T3 = (1 − √(HC/HC0))·dp / (dp + dth) |
//!
//! The porosity loss drives a stage progress t ∈ \[0,1\], mapped to Bernstein
//! weights and sharpened by a softmax into stage weights c_i. Each driver
//! is normalised by a fixed reference, then saturated:
//!
//! ```text
//! B_i = 1 − exp(−c_i · T_i^e_i)          (B_i ∈ [0,1))
//! s   = (1 − η_base) / (ΣB + k·(1 − η_base))
//! η_i = B_i · s                          (η_base + Ση_i ≤ 1)
//! ```
//!
//! The total efficiency enters the attachment rate
//! `k_att = γ · Avx · (U/θ) · η_total` with projected area
//! `Avx = (SVR/4) · (1/τ) · (1 − θ)/(1 − θ0)`.
//!
//! The exponents and reference normalisers were calibrated on a small
//! microfluidic data set and are treated as fixed constants of
//! [`StageModelConfig`].
//!
//! # Example Usage
//!
//! ```rust
//! use ssf_rs::models::biofilm_cft::SystemRegressionCoefficients;
//!
//! let breakdown = SystemRegressionCoefficients::default()
//!     .contribution_breakdown(0.26, 0.68, 1.25, 0.21)
//!     .unwrap();
//! assert!((breakdown.total + 8.2297).abs() < 1e-4);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{clamp_non_negative, ensure_finite, ensure_open_fraction, ensure_positive, ModelError, ModelResult};
use crate::physics::units::{ln_to_log10, m_per_h_to_m_per_day};
use crate::physics::{Contribution, Parameter, ParameterRecord, PredictionResult, RemovalConvention, RemovalModel};
use crate::sweep::{run_sweep, SweepConfiguration, SweepSeries};

const SYSTEM_MODEL: &str = "ExtendedCFT/system";
const STAGE_MODEL: &str = "ExtendedCFT/stages";

// =================================================================================================
// (a) System-property regression
// =================================================================================================

/// Coefficients of the system-property regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemRegressionCoefficients {
    /// β0
    pub intercept: f64,
    /// β1 (porosity)
    pub porosity: f64,
    /// β2 (hydraulic conductivity)
    pub hydraulic_conductivity: f64,
    /// β3 (tortuosity)
    pub tortuosity: f64,
    /// β4 (surface-to-volume ratio)
    pub surface_to_volume: f64,
}

impl Default for SystemRegressionCoefficients {
    fn default() -> Self {
        Self {
            intercept: 18.33,
            porosity: -13.29,
            hydraulic_conductivity: -15.34,
            tortuosity: -10.12,
            surface_to_volume: -0.11,
        }
    }
}

/// Signed contribution of one regression term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermContribution {
    /// Term label
    pub label: &'static str,
    /// βi·xi
    pub value: f64,
    /// 100·value/|total| (0 when the total vanishes)
    pub percent_of_total: f64,
}

/// Additive decomposition of the regression output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemBreakdown {
    /// β0
    pub intercept: f64,
    /// Porosity, hydraulic conductivity, tortuosity, SVR terms
    pub terms: [TermContribution; 4],
    /// −ln(C/C0), unclamped
    pub total: f64,
}

impl SystemBreakdown {
    /// Total expressed as log10 removal
    pub fn log10_total(&self) -> f64 {
        ln_to_log10(self.total)
    }

    /// Breakdown as generic contributions (intercept first)
    pub fn contributions(&self) -> Vec<Contribution> {
        std::iter::once(Contribution::new("intercept", self.intercept))
            .chain(self.terms.iter().map(|t| Contribution::new(t.label, t.value)))
            .collect()
    }
}

impl SystemRegressionCoefficients {
    /// Validate coefficients
    pub fn validate(&self) -> ModelResult<()> {
        ensure_finite(SYSTEM_MODEL, "intercept", self.intercept)?;
        ensure_finite(SYSTEM_MODEL, "porosity", self.porosity)?;
        ensure_finite(SYSTEM_MODEL, "hydraulic_conductivity", self.hydraulic_conductivity)?;
        ensure_finite(SYSTEM_MODEL, "tortuosity", self.tortuosity)?;
        ensure_finite(SYSTEM_MODEL, "surface_to_volume", self.surface_to_volume)?;
        Ok(())
    }

    /// −ln(C/C0), unclamped
    pub fn ln_removal(&self, porosity: f64, hydraulic_conductivity: f64, tortuosity: f64, svr: f64) -> f64 {
        self.intercept
            + self.porosity * porosity
            + self.hydraulic_conductivity * hydraulic_conductivity
            + self.tortuosity * tortuosity
            + self.surface_to_volume * svr
    }

    /// Per-term contributions and their share of |total|
    ///
    /// # Errors
    /// Porosity outside ]0,1[.
    pub fn contribution_breakdown(
        &self,
        porosity: f64,
        hydraulic_conductivity: f64,
        tortuosity: f64,
        svr: f64,
    ) -> ModelResult<SystemBreakdown> {
        let porosity = ensure_open_fraction(SYSTEM_MODEL, "porosity", porosity)?;
        let total = self.ln_removal(porosity, hydraulic_conductivity, tortuosity, svr);
        let magnitude = total.abs();
        let term = |label, value: f64| TermContribution {
            label,
            value,
            percent_of_total: if magnitude > 0.0 { 100.0 * value / magnitude } else { 0.0 },
        };

        Ok(SystemBreakdown {
            intercept: self.intercept,
            terms: [
                term("porosity", self.porosity * porosity),
                term("hydraulic_conductivity", self.hydraulic_conductivity * hydraulic_conductivity),
                term("tortuosity", self.tortuosity * tortuosity),
                term("surface_to_volume", self.surface_to_volume * svr),
            ],
            total,
        })
    }
}

/// Record-driven system-property regression (natural-log removal)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemRegressionModel {
    coefficients: SystemRegressionCoefficients,
}

impl SystemRegressionModel {
    /// Create a model with custom coefficients
    pub fn new(coefficients: SystemRegressionCoefficients) -> ModelResult<Self> {
        coefficients.validate()?;
        Ok(Self { coefficients })
    }

    /// Coefficients in use
    pub fn coefficients(&self) -> &SystemRegressionCoefficients {
        &self.coefficients
    }
}

impl RemovalModel for SystemRegressionModel {
    fn name(&self) -> &str {
        SYSTEM_MODEL
    }

    fn equation(&self) -> &str {
        "-ln(C/C0) = 18.33 - 13.29 theta - 15.34 HC - 10.12 tau - 0.11 SVR"
    }

    fn required_parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::Porosity,
            Parameter::HydraulicConductivity,
            Parameter::Tortuosity,
            Parameter::SurfaceToVolume,
        ]
    }

    fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult> {
        let breakdown = self.coefficients.contribution_breakdown(
            record.require(Parameter::Porosity, SYSTEM_MODEL)?,
            record.require(Parameter::HydraulicConductivity, SYSTEM_MODEL)?,
            record.require(Parameter::Tortuosity, SYSTEM_MODEL)?,
            record.require(Parameter::SurfaceToVolume, SYSTEM_MODEL)?,
        )?;
        log::debug!("{}: -ln(C/C0) = {}", SYSTEM_MODEL, breakdown.total);

        Ok(PredictionResult::new(breakdown.total, RemovalConvention::NaturalLogRemoval, SYSTEM_MODEL)
            .with_breakdown(breakdown.contributions()))
    }
}

// =================================================================================================
// (b) Three-stage model: building blocks
// =================================================================================================

/// Stage progress t = clamp01((θmax − θ)/(θmax − θmin))
///
/// Exactly 0 at θ = θmax and 1 at θ = θmin.
pub fn stage_progress(porosity: f64, theta_min: f64, theta_max: f64) -> ModelResult<f64> {
    let span = theta_max - theta_min;
    if !(span > 0.0) {
        return Err(ModelError::domain(STAGE_MODEL, "theta_max - theta_min", span, "> 0"));
    }
    let porosity = ensure_finite(STAGE_MODEL, "porosity", porosity)?;
    Ok(((theta_max - porosity) / span).clamp(0.0, 1.0))
}

/// Quadratic Bernstein basis (b1, b2, b3) = ((1−t)², 2t(1−t), t²)
#[inline]
pub fn bernstein_weights(t: f64) -> [f64; 3] {
    let s = 1.0 - t;
    [s * s, 2.0 * t * s, t * t]
}

/// Softmax of the Bernstein weights with the given sharpness
///
/// Always sums to one with strictly positive entries.
pub fn softmax_stage_weights(b: [f64; 3], sharpness: f64) -> [f64; 3] {
    let max = b.iter().fold(f64::NEG_INFINITY, |m, v| m.max(sharpness * v));
    let e = b.map(|v| (sharpness * v - max).exp());
    let sum: f64 = e.iter().sum();
    e.map(|v| v / sum)
}

/// Effective pore-throat diameter min(dth_grain, dth_θ)
///
/// ```text
/// dth_grain = dth0² / (dth0 + (dg − dg0))
/// dth_θ     = dth0 · (θ/(1−θ)) / (θ0/(1−θ0))
/// ```
///
/// All diameters in the same length unit.
pub fn effective_throat_diameter(
    dth0: f64,
    dg: f64,
    dg0: f64,
    porosity: f64,
    porosity_clean: f64,
) -> ModelResult<f64> {
    let dth0 = ensure_positive(STAGE_MODEL, "throat_diameter_clean", dth0)?;
    let theta = ensure_open_fraction(STAGE_MODEL, "porosity", porosity)?;
    let theta0 = ensure_open_fraction(STAGE_MODEL, "porosity_clean", porosity_clean)?;

    let denominator = dth0 + (ensure_finite(STAGE_MODEL, "grain_diameter", dg)? - dg0);
    if !(denominator > 0.0) {
        return Err(ModelError::domain(STAGE_MODEL, "dth0 + (dg - dg0)", denominator, "> 0"));
    }

    let by_grain = dth0 * dth0 / denominator;
    let by_porosity = dth0 * (theta / (1.0 - theta)) / (theta0 / (1.0 - theta0));
    Ok(by_grain.min(by_porosity))
}

/// Raw stage drivers (T1, T2, T3) before normalisation
///
/// Negative drivers (HC above its clean-bed value) are clamped at 0.
#[allow(clippy::too_many_arguments)]
pub fn raw_drivers(
    f_shape: f64,
    f_concave: f64,
    svr: f64,
    dp: f64,
    roughness: f64,
    hydraulic_conductivity: f64,
    hydraulic_conductivity_clean: f64,
    dth_eff: f64,
) -> ModelResult<[f64; 3]> {
    let roughness = ensure_positive(STAGE_MODEL, "roughness_coefficient", roughness)?;
    let hc0 = ensure_positive(STAGE_MODEL, "hydraulic_conductivity_clean", hydraulic_conductivity_clean)?;
    let hc = clamp_non_negative(STAGE_MODEL, "hydraulic_conductivity", hydraulic_conductivity)?;
    let dp = clamp_non_negative(STAGE_MODEL, "particle_diameter", dp)?;
    let svr = clamp_non_negative(STAGE_MODEL, "surface_to_volume", svr)?;

    let size_sum = dp + ensure_finite(STAGE_MODEL, "throat_diameter", dth_eff)?;
    if !(size_sum > 0.0) {
        return Err(ModelError::domain(STAGE_MODEL, "dp + dth_eff", size_sum, "> 0"));
    }

    let t1 = clamp_non_negative(STAGE_MODEL, "T1", f_shape + f_concave)?;
    let t2 = svr * dp / roughness;
    let t3 = ((1.0 - (hc / hc0).sqrt()) * dp / size_sum).max(0.0);
    Ok([t1, t2, t3])
}

/// Saturating transform B_i = 1 − exp(−c_i · T_i^e_i), each in \[0,1)
pub fn bounded_stage_efficiencies(weights: [f64; 3], drivers: [f64; 3], exponents: [f64; 3]) -> [f64; 3] {
    [0, 1, 2].map(|i| 1.0 - (-weights[i] * drivers[i].powf(exponents[i])).exp())
}

/// Scale the stage terms into the capacity left by η_base
///
/// # Errors
/// η_base outside \[0,1\] or a negative shrink factor.
pub fn capacity_scaled_efficiencies(eta_base: f64, bounded: [f64; 3], shrink: f64) -> ModelResult<[f64; 3]> {
    let eta_base = ensure_finite(STAGE_MODEL, "eta_base", eta_base)?;
    if !(0.0..=1.0).contains(&eta_base) {
        return Err(ModelError::domain(STAGE_MODEL, "eta_base", eta_base, "in [0,1]"));
    }
    let shrink = ensure_finite(STAGE_MODEL, "shrink_factor", shrink)?;
    if shrink < 0.0 {
        return Err(ModelError::domain(STAGE_MODEL, "shrink_factor", shrink, ">= 0"));
    }

    let sum: f64 = bounded.iter().sum();
    if sum <= 0.0 {
        return Ok([0.0; 3]);
    }

    let capacity = 1.0 - eta_base;
    let scale = capacity / (sum + shrink * capacity);
    Ok(bounded.map(|b| b * scale))
}

/// Flow-aligned projected area Avx = (SVR/4)·(1/τ)·(1−θ)/(1−θ0)
pub fn projected_area(svr: f64, tortuosity: f64, porosity: f64, porosity_clean: f64) -> ModelResult<f64> {
    let tortuosity = ensure_positive(STAGE_MODEL, "tortuosity", tortuosity)?;
    let theta = ensure_open_fraction(STAGE_MODEL, "porosity", porosity)?;
    let theta0 = ensure_open_fraction(STAGE_MODEL, "porosity_clean", porosity_clean)?;
    let svr = clamp_non_negative(STAGE_MODEL, "surface_to_volume", svr)?;
    Ok(svr / 4.0 / tortuosity * (1.0 - theta) / (1.0 - theta0))
}

/// Attachment rate k_att = γ·Avx·(U/θ)·η_total
pub fn attachment_rate(gamma: f64, area: f64, velocity: f64, porosity: f64, eta_total: f64) -> ModelResult<f64> {
    let theta = ensure_open_fraction(STAGE_MODEL, "porosity", porosity)?;
    let velocity = clamp_non_negative(STAGE_MODEL, "velocity", velocity)?;
    Ok(gamma * area * (velocity / theta) * eta_total)
}

// =================================================================================================
// (b) Three-stage model: configuration and evaluation
// =================================================================================================

/// Fixed constants of the three-stage model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageModelConfig {
    /// Porosity at which the bed is fully occluded (t = 1)
    pub theta_min: f64,
    /// Porosity of the clean bed in the stage scale (t = 0)
    pub theta_max: f64,
    /// Softmax sharpness λ
    pub sharpness: f64,
    /// Geometric-mean reference values of T1, T2, T3
    pub reference_drivers: [f64; 3],
    /// Exponents n, m, p
    pub exponents: [f64; 3],
    /// Shrink factor k of the capacity scaling
    pub shrink: f64,
    /// Global scale γ of the attachment rate
    pub gamma: f64,
}

impl Default for StageModelConfig {
    fn default() -> Self {
        Self {
            theta_min: 0.0,
            theta_max: 0.34,
            sharpness: 4.0,
            reference_drivers: [0.6, 0.05, 0.15],
            exponents: [1.0, 0.8, 1.2],
            shrink: 0.5,
            gamma: 1.0,
        }
    }
}

impl StageModelConfig {
    /// Builder: set the porosity window of the stage progress
    pub fn with_porosity_window(mut self, theta_min: f64, theta_max: f64) -> Self {
        self.theta_min = theta_min;
        self.theta_max = theta_max;
        self
    }

    /// Builder: set the softmax sharpness
    pub fn with_sharpness(mut self, sharpness: f64) -> Self {
        self.sharpness = sharpness;
        self
    }

    /// Builder: set the shrink factor
    pub fn with_shrink(mut self, shrink: f64) -> Self {
        self.shrink = shrink;
        self
    }

    /// Builder: set the global attachment scale γ
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.theta_max - self.theta_min > 0.0) {
            return Err(ModelError::domain(STAGE_MODEL, "theta_max - theta_min", self.theta_max - self.theta_min, "> 0"));
        }
        let sharpness = ensure_finite(STAGE_MODEL, "sharpness", self.sharpness)?;
        if sharpness < 0.0 {
            return Err(ModelError::domain(STAGE_MODEL, "sharpness", sharpness, ">= 0"));
        }
        for reference in self.reference_drivers {
            ensure_positive(STAGE_MODEL, "reference_driver", reference)?;
        }
        for exponent in self.exponents {
            ensure_positive(STAGE_MODEL, "exponent", exponent)?;
        }
        if !(self.shrink >= 0.0) {
            return Err(ModelError::domain(STAGE_MODEL, "shrink", self.shrink, ">= 0"));
        }
        if !(self.gamma >= 0.0) {
            return Err(ModelError::domain(STAGE_MODEL, "gamma", self.gamma, ">= 0"));
        }
        Ok(())
    }
}

/// Clean-bed reference state the biofilm stages are measured against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanBedReference {
    /// Clean-bed contact efficiency η_base (e.g. η0 of the collector model)
    pub eta_base: f64,
    /// Clean-bed porosity θ0
    pub porosity: f64,
    /// Clean-bed throat diameter dth0 \[µm\]
    pub throat_diameter: f64,
    /// Reference grain diameter dg0 \[mm\]
    pub grain_diameter: f64,
    /// Clean-bed hydraulic conductivity HC0 (same normalisation as HC)
    pub hydraulic_conductivity: f64,
    /// Grain shape factor
    pub f_shape: f64,
    /// Concavity factor
    pub f_concave: f64,
    /// Roughness coefficient RC
    pub roughness: f64,
}

impl Default for CleanBedReference {
    fn default() -> Self {
        Self {
            eta_base: 0.01,
            porosity: 0.40,
            throat_diameter: 60.0,
            grain_diameter: 0.3,
            hydraulic_conductivity: 1.0,
            f_shape: 0.3,
            f_concave: 0.2,
            roughness: 4.0,
        }
    }
}

impl CleanBedReference {
    /// Builder: set η_base
    pub fn with_eta_base(mut self, eta_base: f64) -> Self {
        self.eta_base = eta_base;
        self
    }
}

/// Operating point of the three-stage model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageInputs {
    /// Porosity θ
    pub porosity: f64,
    /// Hydraulic conductivity HC (normalised)
    pub hydraulic_conductivity: f64,
    /// Tortuosity τ
    pub tortuosity: f64,
    /// Surface-to-volume ratio \[µm⁻¹\]
    pub surface_to_volume: f64,
    /// Particle diameter dp \[µm\]
    pub particle_diameter: f64,
    /// Grain diameter dg \[mm\]
    pub grain_diameter: f64,
    /// Approach velocity U \[m/h\]
    pub velocity: f64,
}

impl StageInputs {
    fn from_record(record: &ParameterRecord, with_velocity: bool) -> ModelResult<Self> {
        Ok(Self {
            porosity: record.require(Parameter::Porosity, STAGE_MODEL)?,
            hydraulic_conductivity: record.require(Parameter::HydraulicConductivity, STAGE_MODEL)?,
            tortuosity: record.require(Parameter::Tortuosity, STAGE_MODEL)?,
            surface_to_volume: record.require(Parameter::SurfaceToVolume, STAGE_MODEL)?,
            particle_diameter: record.require(Parameter::ParticleDiameter, STAGE_MODEL)?,
            grain_diameter: record.require(Parameter::GrainSize, STAGE_MODEL)?,
            velocity: if with_velocity { record.require(Parameter::Velocity, STAGE_MODEL)? } else { 0.0 },
        })
    }
}

/// Every intermediate of one three-stage evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvaluation {
    /// Stage progress t
    pub progress: f64,
    /// Stage weights c_i
    pub weights: [f64; 3],
    /// Effective throat diameter \[µm\]
    pub throat_diameter: f64,
    /// Normalised drivers T_i / T_ref,i
    pub drivers: [f64; 3],
    /// Bounded efficiencies B_i
    pub bounded: [f64; 3],
    /// Capacity-scaled stage efficiencies η1, η2, η3
    pub stage_efficiencies: [f64; 3],
    /// η_base + η1 + η2 + η3
    pub total_efficiency: f64,
    /// Projected area Avx \[m⁻¹\]
    pub projected_area: f64,
    /// Attachment rate k_att \[d⁻¹\]
    pub attachment_rate: f64,
}

/// Three-stage biofilm efficiency model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageModel {
    config: StageModelConfig,
    reference: CleanBedReference,
    report_attachment_rate: bool,
}

impl StageModel {
    /// Create a model
    pub fn new(config: StageModelConfig, reference: CleanBedReference) -> ModelResult<Self> {
        config.validate()?;
        Ok(Self { config, reference, report_attachment_rate: false })
    }

    /// Builder: report k_att \[d⁻¹\] instead of η_total through [`RemovalModel`]
    pub fn reporting_attachment_rate(mut self) -> Self {
        self.report_attachment_rate = true;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &StageModelConfig {
        &self.config
    }

    /// Clean-bed reference in use
    pub fn reference(&self) -> &CleanBedReference {
        &self.reference
    }

    /// Full evaluation at an operating point
    pub fn evaluate_stages(&self, inputs: &StageInputs) -> ModelResult<StageEvaluation> {
        let cfg = &self.config;
        let reference = &self.reference;

        let progress = stage_progress(inputs.porosity, cfg.theta_min, cfg.theta_max)?;
        let weights = softmax_stage_weights(bernstein_weights(progress), cfg.sharpness);

        // grain diameters in mm, throat diameters in µm
        let throat_diameter = effective_throat_diameter(
            reference.throat_diameter,
            inputs.grain_diameter * 1e3,
            reference.grain_diameter * 1e3,
            inputs.porosity,
            reference.porosity,
        )?;

        let raw = raw_drivers(
            reference.f_shape,
            reference.f_concave,
            inputs.surface_to_volume,
            inputs.particle_diameter,
            reference.roughness,
            inputs.hydraulic_conductivity,
            reference.hydraulic_conductivity,
            throat_diameter,
        )?;
        let drivers = [0, 1, 2].map(|i| raw[i] / cfg.reference_drivers[i]);

        let bounded = bounded_stage_efficiencies(weights, drivers, cfg.exponents);
        let stage_efficiencies = capacity_scaled_efficiencies(reference.eta_base, bounded, cfg.shrink)?;
        let total_efficiency = reference.eta_base + stage_efficiencies.iter().sum::<f64>();

        // SVR µm⁻¹ → m⁻¹, U m/h → m/d
        let area = projected_area(inputs.surface_to_volume * 1e6, inputs.tortuosity, inputs.porosity, reference.porosity)?;
        let rate = attachment_rate(
            cfg.gamma,
            area,
            m_per_h_to_m_per_day(inputs.velocity),
            inputs.porosity,
            total_efficiency,
        )?;

        log::debug!(
            "{}: t = {:.3}, c = {:?}, eta = {:?}, total = {:.4}",
            STAGE_MODEL,
            progress,
            weights,
            stage_efficiencies,
            total_efficiency
        );

        Ok(StageEvaluation {
            progress,
            weights,
            throat_diameter,
            drivers,
            bounded,
            stage_efficiencies,
            total_efficiency,
            projected_area: area,
            attachment_rate: rate,
        })
    }

    /// Sweep the stage efficiencies over one record parameter
    ///
    /// Columns: `eta_roughness`, `eta_network`, `eta_occlusion`, `eta_total`, `k_att`.
    pub fn sweep_stages(
        &self,
        variable: Parameter,
        config: &SweepConfiguration,
        fixed: &ParameterRecord,
    ) -> ModelResult<SweepSeries> {
        let required = [self.required_parameters(), vec![Parameter::Velocity]].concat();
        if !required.contains(&variable) {
            return Err(ModelError::UnsupportedVariable {
                model: STAGE_MODEL.to_string(),
                variable: variable.key().to_string(),
            });
        }

        run_sweep(
            config,
            variable.key(),
            variable.unit(),
            &["eta_roughness", "eta_network", "eta_occlusion", "eta_total", "k_att"],
            |x| {
                let inputs = StageInputs::from_record(&fixed.overriding(variable, x), true)?;
                let e = self.evaluate_stages(&inputs)?;
                let [e1, e2, e3] = e.stage_efficiencies;
                Ok(vec![e1, e2, e3, e.total_efficiency, e.attachment_rate])
            },
        )
    }
}

impl RemovalModel for StageModel {
    fn name(&self) -> &str {
        STAGE_MODEL
    }

    fn equation(&self) -> &str {
        if self.report_attachment_rate {
            "k_att = gamma * Avx * (U/theta) * (eta_base + eta1 + eta2 + eta3)"
        } else {
            "eta = eta_base + eta1 + eta2 + eta3"
        }
    }

    fn description(&self) -> Option<&str> {
        Some("Three-stage biofilm efficiency blended by porosity loss")
    }

    fn required_parameters(&self) -> Vec<Parameter> {
        let mut parameters = vec![
            Parameter::Porosity,
            Parameter::HydraulicConductivity,
            Parameter::Tortuosity,
            Parameter::SurfaceToVolume,
            Parameter::ParticleDiameter,
            Parameter::GrainSize,
        ];
        if self.report_attachment_rate {
            parameters.push(Parameter::Velocity);
        }
        parameters
    }

    fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult> {
        let inputs = StageInputs::from_record(record, self.report_attachment_rate)?;
        let e = self.evaluate_stages(&inputs)?;

        let breakdown = vec![
            Contribution::new("eta_base", self.reference.eta_base),
            Contribution::new("eta_roughness", e.stage_efficiencies[0]),
            Contribution::new("eta_network", e.stage_efficiencies[1]),
            Contribution::new("eta_occlusion", e.stage_efficiencies[2]),
        ];

        let result = if self.report_attachment_rate {
            PredictionResult::new(e.attachment_rate, RemovalConvention::RateConstantPerDay, STAGE_MODEL)
        } else {
            PredictionResult::new(e.total_efficiency, RemovalConvention::Efficiency, STAGE_MODEL)
        };
        Ok(result.with_breakdown(breakdown))
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepRange;
    use approx::assert_relative_eq;

    fn inputs() -> StageInputs {
        StageInputs {
            porosity: 0.26,
            hydraulic_conductivity: 0.68,
            tortuosity: 1.25,
            surface_to_volume: 0.21,
            particle_diameter: 1.0,
            grain_diameter: 0.3,
            velocity: 0.2,
        }
    }

    fn record() -> ParameterRecord {
        let i = inputs();
        ParameterRecord::empty()
            .with(Parameter::Porosity, i.porosity)
            .with(Parameter::HydraulicConductivity, i.hydraulic_conductivity)
            .with(Parameter::Tortuosity, i.tortuosity)
            .with(Parameter::SurfaceToVolume, i.surface_to_volume)
            .with(Parameter::ParticleDiameter, i.particle_diameter)
            .with(Parameter::GrainSize, i.grain_diameter)
            .with(Parameter::Velocity, i.velocity)
    }

    // ==================== System regression ====================

    #[test]
    fn test_system_regression_reference_point() {
        let b = SystemRegressionCoefficients::default().contribution_breakdown(0.26, 0.68, 1.25, 0.21).unwrap();
        assert_relative_eq!(b.total, -8.2297, epsilon = 1e-9);
        assert_relative_eq!(b.terms[0].value, -3.4554, epsilon = 1e-12);
        assert_relative_eq!(b.terms[2].value, -12.65, epsilon = 1e-12);
        assert_relative_eq!(b.log10_total(), -8.2297 / std::f64::consts::LN_10, epsilon = 1e-9);
    }

    #[test]
    fn test_breakdown_percentages_use_absolute_total() {
        let b = SystemRegressionCoefficients::default().contribution_breakdown(0.26, 0.68, 1.25, 0.21).unwrap();
        let tortuosity = &b.terms[2];
        assert_relative_eq!(tortuosity.percent_of_total, 100.0 * -12.65 / 8.2297, max_relative = 1e-9);

        let sum: f64 = b.intercept + b.terms.iter().map(|t| t.value).sum::<f64>();
        assert_relative_eq!(sum, b.total, epsilon = 1e-12);
    }

    #[test]
    fn test_system_model_clamps_only_presentation_value() {
        let prediction = SystemRegressionModel::default().evaluate(&record()).unwrap();
        assert_eq!(prediction.value, 0.0);
        assert_relative_eq!(prediction.raw, -8.2297, epsilon = 1e-9);
        assert_eq!(prediction.convention, RemovalConvention::NaturalLogRemoval);
        assert_eq!(prediction.breakdown.len(), 5);
    }

    #[test]
    fn test_system_model_missing_field() {
        let mut record = record();
        record.remove(Parameter::Tortuosity);
        let err = SystemRegressionModel::default().evaluate(&record).unwrap_err();
        assert_eq!(err, ModelError::missing(SYSTEM_MODEL, "tortuosity"));
    }

    #[test]
    fn test_system_model_rejects_porosity_outside_unit_interval() {
        for porosity in [-0.5, 0.0, 1.0, 1.7] {
            let record = record().overriding(Parameter::Porosity, porosity);
            let err = SystemRegressionModel::default().evaluate(&record).unwrap_err();
            assert!(err.is_domain_violation(), "porosity {} accepted", porosity);
        }
        assert!(SystemRegressionCoefficients::default().contribution_breakdown(-0.5, 0.68, 1.25, 0.21).is_err());
    }

    // ==================== Stage blending ====================

    #[test]
    fn test_stage_progress_endpoints() {
        assert_eq!(stage_progress(0.34, 0.0, 0.34).unwrap(), 0.0);
        assert_eq!(stage_progress(0.0, 0.0, 0.34).unwrap(), 1.0);
        assert_eq!(stage_progress(0.5, 0.0, 0.34).unwrap(), 0.0);
        assert_eq!(stage_progress(-0.1, 0.0, 0.34).unwrap(), 1.0);
        assert!(stage_progress(0.2, 0.34, 0.34).is_err());
    }

    #[test]
    fn test_bernstein_weights_partition_unity() {
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let w = bernstein_weights(t);
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
            assert!(w.iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn test_softmax_weights_positive_and_normalised() {
        for sharpness in [0.0, 1.0, 4.0, 50.0, 700.0] {
            for t in [0.0, 0.3, 0.5, 1.0] {
                let c = softmax_stage_weights(bernstein_weights(t), sharpness);
                assert_relative_eq!(c.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
                assert!(c.iter().all(|v| *v > 0.0 && v.is_finite()));
            }
        }
        let uniform = softmax_stage_weights([1.0, 0.0, 0.0], 0.0);
        assert_relative_eq!(uniform[0], 1.0 / 3.0);
    }

    #[test]
    fn test_sharpness_concentrates_dominant_stage() {
        let soft = softmax_stage_weights(bernstein_weights(0.0), 1.0);
        let sharp = softmax_stage_weights(bernstein_weights(0.0), 20.0);
        assert!(sharp[0] > soft[0]);
        assert!(sharp[0] > 0.99);
    }

    // ==================== Geometry and drivers ====================

    #[test]
    fn test_throat_diameter_takes_minimum() {
        // equal grains: grain branch is dth0, porosity branch shrinks with θ
        let d = effective_throat_diameter(60.0, 300.0, 300.0, 0.26, 0.40).unwrap();
        let expected = 60.0 * (0.26 / 0.74) / (0.40 / 0.60);
        assert_relative_eq!(d, expected, max_relative = 1e-12);

        let coarse = effective_throat_diameter(60.0, 400.0, 300.0, 0.40, 0.40).unwrap();
        assert_relative_eq!(coarse, 3600.0 / 160.0);
    }

    #[test]
    fn test_throat_diameter_non_positive_denominator() {
        let err = effective_throat_diameter(60.0, 200.0, 300.0, 0.3, 0.4).unwrap_err();
        assert!(matches!(err, ModelError::DomainViolation { quantity: "dth0 + (dg - dg0)", .. }));
    }

    #[test]
    fn test_raw_drivers() {
        let [t1, t2, t3] = raw_drivers(0.3, 0.2, 0.21, 1.0, 4.0, 0.64, 1.0, 9.0).unwrap();
        assert_relative_eq!(t1, 0.5);
        assert_relative_eq!(t2, 0.0525);
        assert_relative_eq!(t3, 0.2 * 0.1, max_relative = 1e-12);

        let [_, _, clamped] = raw_drivers(0.3, 0.2, 0.21, 1.0, 4.0, 1.5, 1.0, 9.0).unwrap();
        assert_eq!(clamped, 0.0);

        assert!(raw_drivers(0.3, 0.2, 0.21, 1.0, 0.0, 0.64, 1.0, 9.0).is_err());
        assert!(raw_drivers(0.3, 0.2, 0.21, 0.0, 4.0, 0.64, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_bounded_efficiencies_in_unit_interval() {
        let b = bounded_stage_efficiencies([0.3, 0.3, 0.4], [0.5, 0.0, 2.0], [1.0, 0.8, 1.2]);
        assert!(b.iter().all(|v| (0.0..1.0).contains(v)));
        assert_relative_eq!(b[0], 1.0 - (-0.15f64).exp(), max_relative = 1e-12);
        assert_eq!(b[1], 0.0);

        // saturates instead of growing with the driver
        let huge = bounded_stage_efficiencies([0.3, 0.3, 0.4], [1e6, 1e6, 1e6], [1.0, 0.8, 1.2]);
        assert!(huge.iter().all(|v| *v <= 1.0));
    }

    #[test]
    fn test_capacity_constraint() {
        for eta_base in [0.0, 0.01, 0.5, 0.99] {
            let eta = capacity_scaled_efficiencies(eta_base, [0.99, 0.99, 0.99], 0.0).unwrap();
            let total = eta_base + eta.iter().sum::<f64>();
            assert!(total <= 1.0 + 1e-12, "total {} > 1", total);
        }
        assert_eq!(capacity_scaled_efficiencies(0.2, [0.0; 3], 0.5).unwrap(), [0.0; 3]);
        assert!(capacity_scaled_efficiencies(1.2, [0.5; 3], 0.5).is_err());
        assert!(capacity_scaled_efficiencies(0.2, [0.5; 3], -1.0).is_err());
    }

    #[test]
    fn test_projected_area_and_attachment_rate() {
        let area = projected_area(2.0, 1.25, 0.26, 0.40).unwrap();
        assert_relative_eq!(area, 0.5 / 1.25 * 0.74 / 0.60, max_relative = 1e-12);
        let rate = attachment_rate(1.0, area, 4.8, 0.26, 0.1).unwrap();
        assert_relative_eq!(rate, area * 4.8 / 0.26 * 0.1, max_relative = 1e-12);
        assert!(projected_area(2.0, 0.0, 0.26, 0.4).is_err());
    }

    // ==================== Full model ====================

    #[test]
    fn test_stage_model_total_within_capacity() {
        let model = StageModel::default();
        let e = model.evaluate_stages(&inputs()).unwrap();
        assert!(e.total_efficiency > model.reference().eta_base);
        assert!(e.total_efficiency <= 1.0);
        assert_relative_eq!(e.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(e.attachment_rate > 0.0);
    }

    #[test]
    fn test_stage_model_record_and_rate_report() {
        let efficiency = StageModel::default().evaluate(&record()).unwrap();
        assert_eq!(efficiency.convention, RemovalConvention::Efficiency);
        assert_eq!(efficiency.breakdown.len(), 4);

        let rate_model = StageModel::default().reporting_attachment_rate();
        assert!(rate_model.required_parameters().contains(&Parameter::Velocity));
        let rate = rate_model.evaluate(&record()).unwrap();
        assert_eq!(rate.convention, RemovalConvention::RateConstantPerDay);
        assert!(rate.value > 0.0);
    }

    #[test]
    fn test_stage_sweep_over_porosity() {
        let config = SweepConfiguration::new(SweepRange::linear(0.05, 0.34, 12));
        let series = StageModel::default().sweep_stages(Parameter::Porosity, &config, &record()).unwrap();
        assert_eq!(series.len(), 12);
        let total = series.column("eta_total").unwrap();
        assert!(total.iter().all(|v| *v <= 1.0 && *v > 0.0));
        assert!(StageModel::default().sweep_stages(Parameter::Protein, &config, &record()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StageModelConfig::default().with_porosity_window(0.3, 0.3);
        assert!(StageModel::new(config, CleanBedReference::default()).is_err());
        let config = StageModelConfig::default().with_sharpness(-1.0);
        assert!(config.validate().is_err());
    }
}
