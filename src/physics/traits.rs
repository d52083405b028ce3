//! Parameter records and the model trait
//!
//! This module defines the core API shared by every removal model:
//! - `Parameter`: type-safe identifier for a physical/biochemical input, with its unit
//! - `ParameterRecord`: flat container of parameter values supplied by the caller
//! - `RemovalModel`: trait for models evaluated from a record

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::physics::data::PredictionResult;

// =================================================================================================
// Parameters (Type-safe Identifiers)
// =================================================================================================

/// Known model inputs (type-safe enum)
///
/// Each variant documents the unit the engine expects at its public
/// boundary. Conversion to SI happens inside the model entry points
/// (see [`units`](crate::physics::units)).
///
/// # Example
/// ```
/// use ssf_rs::physics::Parameter;
///
/// let p: Parameter = "carbohydrate".parse().unwrap();
/// assert_eq!(p, Parameter::Carbohydrate);
/// assert_eq!(p.unit(), "µg/g");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// EPS protein content (µg/g sand)
    Protein,
    /// EPS carbohydrate content (µg/g sand)
    Carbohydrate,
    /// Biomass (16S gene copies/g sand)
    Biomass,
    /// Schmutzdecke age (days)
    SchmutzdeckeAge,
    /// Bed porosity (-)
    Porosity,
    /// Hydraulic conductivity, in the normalised units of the system-property fit
    HydraulicConductivity,
    /// Tortuosity (-)
    Tortuosity,
    /// Surface-to-volume ratio (µm⁻¹)
    SurfaceToVolume,
    /// Particle (microbe) diameter (µm)
    ParticleDiameter,
    /// Collector (grain) diameter (mm)
    CollectorDiameter,
    /// Filtration (approach) velocity (m/h)
    Velocity,
    /// Water temperature (°C)
    Temperature,
    /// Hamaker constant (J)
    Hamaker,
    /// Sticking (attachment) efficiency α (-)
    StickingEfficiency,
    /// Inoculation flag (0 or 1)
    Inoculated,
    /// Median sand grain size D₅₀ (mm)
    GrainSize,
}

impl Parameter {
    /// Every parameter, in declaration order
    pub const ALL: [Parameter; 16] = [
        Parameter::Protein,
        Parameter::Carbohydrate,
        Parameter::Biomass,
        Parameter::SchmutzdeckeAge,
        Parameter::Porosity,
        Parameter::HydraulicConductivity,
        Parameter::Tortuosity,
        Parameter::SurfaceToVolume,
        Parameter::ParticleDiameter,
        Parameter::CollectorDiameter,
        Parameter::Velocity,
        Parameter::Temperature,
        Parameter::Hamaker,
        Parameter::StickingEfficiency,
        Parameter::Inoculated,
        Parameter::GrainSize,
    ];

    /// Key used by string-addressed callers
    pub fn key(&self) -> &'static str {
        match self {
            Parameter::Protein => "protein",
            Parameter::Carbohydrate => "carbohydrate",
            Parameter::Biomass => "biomass",
            Parameter::SchmutzdeckeAge => "schmutzdecke_age",
            Parameter::Porosity => "porosity",
            Parameter::HydraulicConductivity => "hydraulic_conductivity",
            Parameter::Tortuosity => "tortuosity",
            Parameter::SurfaceToVolume => "surface_to_volume",
            Parameter::ParticleDiameter => "particle_diameter",
            Parameter::CollectorDiameter => "collector_diameter",
            Parameter::Velocity => "velocity",
            Parameter::Temperature => "temperature",
            Parameter::Hamaker => "hamaker",
            Parameter::StickingEfficiency => "sticking_efficiency",
            Parameter::Inoculated => "inoculated",
            Parameter::GrainSize => "grain_size",
        }
    }

    /// Unit expected at the API boundary
    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Protein | Parameter::Carbohydrate => "µg/g",
            Parameter::Biomass => "copies/g",
            Parameter::SchmutzdeckeAge => "d",
            Parameter::HydraulicConductivity => "normalised",
            Parameter::SurfaceToVolume => "µm⁻¹",
            Parameter::ParticleDiameter => "µm",
            Parameter::CollectorDiameter | Parameter::GrainSize => "mm",
            Parameter::Velocity => "m/h",
            Parameter::Temperature => "°C",
            Parameter::Hamaker => "J",
            Parameter::Porosity
            | Parameter::Tortuosity
            | Parameter::StickingEfficiency
            | Parameter::Inoculated => "-",
        }
    }

    /// True for quantities whose negative values are clamped to zero on read
    ///
    /// Temperature may be negative. Porosity is a bounded fraction that each
    /// model validates, so a negative porosity is an error there.
    pub fn is_non_negative(&self) -> bool {
        !matches!(self, Parameter::Temperature | Parameter::Porosity)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Parameter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.key() == key)
            .ok_or(ModelError::UnknownParameter { key: s.to_string() })
    }
}

// =================================================================================================
// Parameter Record (Flat Input Container)
// =================================================================================================

/// Caller-owned set of model inputs
///
/// Not every model needs every field; each model declares the subset it
/// consumes and fails with [`ModelError::MissingField`] when one is absent.
/// Values are stored as given. Validation (finiteness, non-negativity
/// clamping) happens when a model reads them through [`require`](Self::require).
///
/// # Example
/// ```
/// use ssf_rs::physics::{Parameter, ParameterRecord};
///
/// let record = ParameterRecord::empty()
///     .with(Parameter::Carbohydrate, 390.0)
///     .with(Parameter::Protein, 185.0)
///     .with_flag(Parameter::Inoculated, true);
///
/// assert_eq!(record.get(Parameter::Protein), Some(185.0));
/// assert_eq!(record.flag(Parameter::Inoculated), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterRecord {
    values: BTreeMap<Parameter, f64>,
}

impl ParameterRecord {
    /// Create a record with a single value
    pub fn new(parameter: Parameter, value: f64) -> Self {
        Self::empty().with(parameter, value)
    }

    /// Create an empty record
    pub fn empty() -> Self {
        Self { values: BTreeMap::new() }
    }

    /// Builder: set a value and return the record
    pub fn with(mut self, parameter: Parameter, value: f64) -> Self {
        self.set(parameter, value);
        self
    }

    /// Builder: set a boolean flag (stored as 0/1)
    pub fn with_flag(mut self, parameter: Parameter, flag: bool) -> Self {
        self.set(parameter, if flag { 1.0 } else { 0.0 });
        self
    }

    /// Get a value as stored
    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        self.values.get(&parameter).copied()
    }

    /// Set a value
    pub fn set(&mut self, parameter: Parameter, value: f64) {
        self.values.insert(parameter, value);
    }

    /// Set a value addressed by its string key
    pub fn set_by_key(&mut self, key: &str, value: f64) -> ModelResult<()> {
        let parameter: Parameter = key.parse()?;
        self.set(parameter, value);
        Ok(())
    }

    /// Remove a value
    pub fn remove(&mut self, parameter: Parameter) -> Option<f64> {
        self.values.remove(&parameter)
    }

    /// Check presence
    pub fn contains(&self, parameter: Parameter) -> bool {
        self.values.contains_key(&parameter)
    }

    /// Read a flag: any non-zero value is `true`
    pub fn flag(&self, parameter: Parameter) -> Option<bool> {
        self.get(parameter).map(|v| v != 0.0)
    }

    /// List of parameters present in the record
    pub fn available_parameters(&self) -> Vec<Parameter> {
        self.values.keys().copied().collect()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read a required value for `model`
    ///
    /// Fails on absence or non-finite values. Non-negative quantities are
    /// clamped at zero.
    pub fn require(&self, parameter: Parameter, model: &str) -> ModelResult<f64> {
        let value = self
            .get(parameter)
            .ok_or_else(|| ModelError::missing(model, parameter.key()))?;

        if !value.is_finite() {
            return Err(ModelError::NonFinite {
                model: model.to_string(),
                field: parameter.key(),
                value,
            });
        }

        if parameter.is_non_negative() && value < 0.0 {
            log::debug!("{}: clamping negative {} ({}) to 0", model, parameter, value);
            return Ok(0.0);
        }

        Ok(value)
    }

    /// Read a required flag for `model`
    pub fn require_flag(&self, parameter: Parameter, model: &str) -> ModelResult<bool> {
        self.require(parameter, model).map(|v| v != 0.0)
    }

    /// Copy of the record with one value replaced (used by sweeps)
    pub fn overriding(&self, parameter: Parameter, value: f64) -> Self {
        let mut copy = self.clone();
        copy.set(parameter, value);
        copy
    }
}

impl FromIterator<(Parameter, f64)> for ParameterRecord {
    fn from_iter<I: IntoIterator<Item = (Parameter, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

// =================================================================================================
// Removal Model Trait
// =================================================================================================

/// Trait for models evaluated from a [`ParameterRecord`]
///
/// # Responsibility
/// Turns a record into a single prediction. Implementations are pure: the
/// same record always yields the same result, and nothing is retained
/// between calls, so a model can be shared across threads freely.
///
/// Sweeps ([`crate::sweep`]) re-evaluate a model through this trait while
/// overriding one parameter.
pub trait RemovalModel: Send + Sync {
    /// Name of the model (used for display, logging and error messages)
    fn name(&self) -> &str;

    /// Human readable equation (documentation only, never executed)
    fn equation(&self) -> &str;

    /// Parameters read from the record
    fn required_parameters(&self) -> Vec<Parameter>;

    /// Evaluate the model at the operating point described by `record`
    ///
    /// # Errors
    /// - [`ModelError::MissingField`] when a required parameter is absent
    /// - [`ModelError::DomainViolation`] when the expression is undefined
    fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult>;

    /// Description of the model (option)
    fn description(&self) -> Option<&str> {
        None
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        let record = ParameterRecord::empty();
        assert!(record.is_empty());
        assert_eq!(record.available_parameters().len(), 0);
    }

    #[test]
    fn test_new_record() {
        let record = ParameterRecord::new(Parameter::Porosity, 0.38);
        assert_eq!(record.len(), 1);
        assert!(record.contains(Parameter::Porosity));
        assert_eq!(record.get(Parameter::Porosity), Some(0.38));
    }

    #[test]
    fn test_keys_roundtrip_through_from_str() {
        for p in Parameter::ALL {
            assert_eq!(p.key().parse::<Parameter>().unwrap(), p);
        }
        assert_eq!(" Protein ".parse::<Parameter>().unwrap(), Parameter::Protein);
    }

    #[test]
    fn test_unknown_key() {
        let err = "chlorophyll".parse::<Parameter>().unwrap_err();
        assert_eq!(err, ModelError::UnknownParameter { key: "chlorophyll".into() });

        let mut record = ParameterRecord::empty();
        assert!(record.set_by_key("chlorophyll", 1.0).is_err());
        assert!(record.set_by_key("protein", 1.0).is_ok());
        assert_eq!(record.get(Parameter::Protein), Some(1.0));
    }

    #[test]
    fn test_require_missing_field() {
        let record = ParameterRecord::new(Parameter::Protein, 185.0);
        let err = record.require(Parameter::Carbohydrate, "pilot/C").unwrap_err();
        assert_eq!(err, ModelError::missing("pilot/C", "carbohydrate"));
    }

    #[test]
    fn test_require_non_finite() {
        let record = ParameterRecord::new(Parameter::Protein, f64::NAN);
        assert!(matches!(
            record.require(Parameter::Protein, "m"),
            Err(ModelError::NonFinite { field: "protein", .. })
        ));
    }

    #[test]
    fn test_require_clamps_negative_concentration_but_not_temperature() {
        let record = ParameterRecord::empty()
            .with(Parameter::Protein, -5.0)
            .with(Parameter::Temperature, -2.0);
        assert_eq!(record.require(Parameter::Protein, "m").unwrap(), 0.0);
        assert_eq!(record.require(Parameter::Temperature, "m").unwrap(), -2.0);
        // stored value untouched
        assert_eq!(record.get(Parameter::Protein), Some(-5.0));
    }

    #[test]
    fn test_require_keeps_negative_porosity() {
        let record = ParameterRecord::new(Parameter::Porosity, -0.2);
        assert_eq!(record.require(Parameter::Porosity, "m").unwrap(), -0.2);
        assert!(!Parameter::Porosity.is_non_negative());
    }

    #[test]
    fn test_flags() {
        let record = ParameterRecord::empty().with_flag(Parameter::Inoculated, false);
        assert_eq!(record.flag(Parameter::Inoculated), Some(false));
        assert!(!record.require_flag(Parameter::Inoculated, "m").unwrap());
        assert_eq!(record.flag(Parameter::Biomass), None);
    }

    #[test]
    fn test_overriding_leaves_original_intact() {
        let record = ParameterRecord::new(Parameter::Velocity, 0.1);
        let swept = record.overriding(Parameter::Velocity, 0.3);
        assert_eq!(record.get(Parameter::Velocity), Some(0.1));
        assert_eq!(swept.get(Parameter::Velocity), Some(0.3));
    }

    #[test]
    fn test_collect_from_pairs() {
        let record: ParameterRecord = [(Parameter::Protein, 1.0), (Parameter::Biomass, 1e8)]
            .into_iter()
            .collect();
        assert_eq!(record.available_parameters(), vec![Parameter::Protein, Parameter::Biomass]);
    }
}
