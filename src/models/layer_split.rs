//! Depth-resolved split of removal between the Schmutzdecke and the bed below
//!
//! An empirical maturation curve: the share of removal achieved in the
//! uppermost zone grows with Schmutzdecke age and is higher in inoculated
//! filters.
//!
//! ```text
//! f_upper = min(ceiling, min(cap, baseline + asymptote·(1 − exp(−rate·months))) + bonus·inoculated)
//! upper   = total · f_upper
//! deeper  = total · (1 − f_upper)/f_upper · deeper_scale
//! ```
//!
//! The deeper-layer removal is not the complement of the upper one: it
//! follows the distinct decay observed in layer measurements.
//!
//! # Example
//!
//! ```rust
//! use ssf_rs::models::layer_split::LayerSplitter;
//!
//! let splitter = LayerSplitter::default();
//! let fraction = splitter.upper_layer_fraction(730.0, true).unwrap();
//! assert_eq!(fraction, 0.98);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{clamp_non_negative, ensure_finite, ModelError, ModelResult};
use crate::physics::units::{days_to_months, months_to_days};
use crate::physics::{Parameter, ParameterRecord, PredictionResult, RemovalConvention, RemovalModel};
use crate::sweep::{run_sweep, SweepConfiguration, SweepSeries};

const MODEL: &str = "LayerSplit";

/// Maturation curve constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSplitConfig {
    /// Upper-layer share of a new filter
    pub baseline: f64,
    /// Share gained at full maturation
    pub asymptote: f64,
    /// Maturation rate \[month⁻¹\]
    pub rate: f64,
    /// Added share for inoculated filters
    pub inoculation_bonus: f64,
    /// Cap of the maturation term
    pub maturation_cap: f64,
    /// Final ceiling of the upper-layer share
    pub ceiling: f64,
    /// Scale of the deeper-layer removal
    pub deeper_scale: f64,
}

impl Default for LayerSplitConfig {
    fn default() -> Self {
        Self {
            baseline: 0.25,
            asymptote: 0.70,
            rate: 0.15,
            inoculation_bonus: 0.10,
            maturation_cap: 0.90,
            ceiling: 0.98,
            deeper_scale: 0.3,
        }
    }
}

impl LayerSplitConfig {
    /// Builder: set the maturation rate \[month⁻¹\]
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Builder: set the inoculation bonus
    pub fn with_inoculation_bonus(mut self, bonus: f64) -> Self {
        self.inoculation_bonus = bonus;
        self
    }

    /// Builder: set the ceiling
    pub fn with_ceiling(mut self, ceiling: f64) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ModelResult<()> {
        let baseline = ensure_finite(MODEL, "baseline", self.baseline)?;
        if !(baseline > 0.0) {
            return Err(ModelError::domain(MODEL, "baseline", baseline, "> 0"));
        }
        for (name, value) in [
            ("asymptote", self.asymptote),
            ("rate", self.rate),
            ("inoculation_bonus", self.inoculation_bonus),
            ("deeper_scale", self.deeper_scale),
        ] {
            if !(ensure_finite(MODEL, name, value)? >= 0.0) {
                return Err(ModelError::domain(MODEL, name, value, ">= 0"));
            }
        }
        if !(self.ceiling > 0.0 && self.ceiling <= 1.0) {
            return Err(ModelError::domain(MODEL, "ceiling", self.ceiling, "in ]0,1]"));
        }
        if !(self.maturation_cap > 0.0 && self.maturation_cap <= self.ceiling) {
            return Err(ModelError::domain(MODEL, "maturation_cap", self.maturation_cap, "in ]0, ceiling]"));
        }
        Ok(())
    }
}

/// Absolute removal attributed to each zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSplit {
    /// Upper-layer share used
    pub upper_fraction: f64,
    /// Removal in the upper zone
    pub upper: f64,
    /// Removal in the remainder of the bed
    pub deeper: f64,
}

/// Upper/deeper split driven by age and inoculation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSplitter {
    config: LayerSplitConfig,
}

impl LayerSplitter {
    /// Create a splitter
    pub fn new(config: LayerSplitConfig) -> ModelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &LayerSplitConfig {
        &self.config
    }

    /// Upper-layer share in ]0, ceiling] for a Schmutzdecke age in days
    pub fn upper_layer_fraction(&self, age_days: f64, inoculated: bool) -> ModelResult<f64> {
        let c = &self.config;
        let months = days_to_months(clamp_non_negative(MODEL, "age_days", age_days)?);

        let matured = (c.baseline + c.asymptote * (1.0 - (-c.rate * months).exp())).min(c.maturation_cap);
        let bonus = if inoculated { c.inoculation_bonus } else { 0.0 };
        Ok((matured + bonus).min(c.ceiling))
    }

    /// Split a total removal estimate
    ///
    /// # Errors
    /// `upper_fraction` outside ]0,1].
    pub fn split_removal(&self, total: f64, upper_fraction: f64) -> ModelResult<LayerSplit> {
        let total = ensure_finite(MODEL, "total", total)?;
        let f = ensure_finite(MODEL, "upper_fraction", upper_fraction)?;
        if !(f > 0.0 && f <= 1.0) {
            return Err(ModelError::domain(MODEL, "upper_fraction", f, "in ]0,1]"));
        }

        Ok(LayerSplit {
            upper_fraction: f,
            upper: total * f,
            deeper: total * (1.0 - f) / f * self.config.deeper_scale,
        })
    }

    /// Split over a range of ages in months
    ///
    /// `removal` supplies the total removal at each age (in months).
    /// Columns: `upper_fraction`, `upper_removal`, `deeper_removal`.
    pub fn time_series<F>(
        &self,
        months: &SweepConfiguration,
        inoculated: bool,
        removal: F,
    ) -> ModelResult<SweepSeries>
    where
        F: Fn(f64) -> ModelResult<f64> + Sync + Send,
    {
        run_sweep(months, "month", "month", &["upper_fraction", "upper_removal", "deeper_removal"], |m| {
            let fraction = self.upper_layer_fraction(months_to_days(m), inoculated)?;
            let split = self.split_removal(removal(m)?, fraction)?;
            Ok(vec![split.upper_fraction, split.upper, split.deeper])
        })
    }

    /// Split over ages with the total removal taken from a sibling model
    ///
    /// The model is evaluated on `fixed` with the Schmutzdecke age set to
    /// each sampled month (converted to days). Its presentation value is
    /// split.
    pub fn time_series_with_model(
        &self,
        months: &SweepConfiguration,
        inoculated: bool,
        model: &dyn RemovalModel,
        fixed: &ParameterRecord,
    ) -> ModelResult<SweepSeries> {
        self.time_series(months, inoculated, |m| {
            let record = fixed.overriding(Parameter::SchmutzdeckeAge, months_to_days(m));
            Ok(model.evaluate(&record)?.value)
        })
    }
}

impl RemovalModel for LayerSplitter {
    fn name(&self) -> &str {
        MODEL
    }

    fn equation(&self) -> &str {
        "f = min(0.98, min(0.90, 0.25 + 0.70 (1 - exp(-0.15 months))) + 0.10 inoculated)"
    }

    fn required_parameters(&self) -> Vec<Parameter> {
        vec![Parameter::SchmutzdeckeAge, Parameter::Inoculated]
    }

    fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult> {
        let fraction = self.upper_layer_fraction(
            record.require(Parameter::SchmutzdeckeAge, MODEL)?,
            record.require_flag(Parameter::Inoculated, MODEL)?,
        )?;
        Ok(PredictionResult::new(fraction, RemovalConvention::Fraction, MODEL))
    }
}
