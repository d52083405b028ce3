//! Multi-scale regression registry
//!
//! A process-wide, read-only catalog of empirical regressions linking
//! Schmutzdecke properties (EPS protein and carbohydrate, age, biomass,
//! grain size, inoculation) to removal, at three scales:
//!
//! | Scale | Response | Selection policy |
//! |-------|----------|------------------|
//! | `lab` (column experiments) | log10 removal | highest R² |
//! | `pilot` (pilot filters) | removal coefficient λ \[d⁻¹\] | model `C` |
//! | `combined` (pooled data) | log10 removal | highest R² |
//!
//! Entries live in a static array and are addressed by [`ModelId`], an
//! index into that array. String keys (`"pilot/C"`, or a scale key plus a
//! model key) resolve to a [`ModelId`] once, at the boundary.
//!
//! Each entry is a linear combination of [`Term`]s. The required
//! parameters of an entry are exactly the parameters its terms read, so a
//! missing field always fails with [`ModelError::MissingField`] instead of
//! being replaced by zero.
//!
//! # Example
//!
//! ```rust
//! use ssf_rs::models::registry::{self, Scale};
//! use ssf_rs::physics::{Parameter, ParameterRecord};
//!
//! let record = ParameterRecord::empty()
//!     .with(Parameter::Carbohydrate, 390.0)
//!     .with(Parameter::Protein, 185.0)
//!     .with_flag(Parameter::Inoculated, true);
//!
//! let lambda = registry::evaluate("pilot", "C", &record).unwrap();
//! assert!((lambda.raw - 1.7091).abs() < 1e-9);
//!
//! let best = registry::best_available(Scale::Pilot, &record).unwrap();
//! assert_eq!(best.source, "pilot/C");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::physics::{
    Advisory, AdvisoryKind, Contribution, FitStatistics, Parameter, ParameterRecord, PredictionResult,
    RemovalConvention, RemovalModel,
};
use crate::sweep::{sweep_model, SweepConfiguration, SweepSeries};

/// Smallest carbohydrate content used as a ratio divisor \[µg/g\]
pub const MIN_CARBOHYDRATE: f64 = 0.1;

// =================================================================================================
// Scales and identifiers
// =================================================================================================

/// Experimental scale a regression was fitted at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// Laboratory columns
    LabColumn,
    /// Pilot-scale filters
    Pilot,
    /// Data pooled across scales
    Combined,
}

/// How the canonical prediction of a scale is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Entry with the highest R² among those the record can feed
    HighestRSquared,
    /// A specific entry
    Named(ModelId),
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::LabColumn, Scale::Pilot, Scale::Combined];

    /// String key
    pub fn key(&self) -> &'static str {
        match self {
            Scale::LabColumn => "lab",
            Scale::Pilot => "pilot",
            Scale::Combined => "combined",
        }
    }

    /// Selection policy of [`best_available`]
    pub fn policy(&self) -> SelectionPolicy {
        match self {
            Scale::LabColumn | Scale::Combined => SelectionPolicy::HighestRSquared,
            Scale::Pilot => SelectionPolicy::Named(ModelId::PILOT_C),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scale {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Scale::ALL
            .iter()
            .copied()
            .find(|scale| scale.key() == key)
            .ok_or(ModelError::UnknownModel { key: s.to_string() })
    }
}

/// Index of an entry in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

impl ModelId {
    pub const LAB_EPS: ModelId = ModelId(0);
    pub const LAB_AGE: ModelId = ModelId(1);
    pub const LAB_BIOMASS: ModelId = ModelId(2);
    pub const PILOT_A: ModelId = ModelId(3);
    pub const PILOT_B: ModelId = ModelId(4);
    pub const PILOT_C: ModelId = ModelId(5);
    pub const COMBINED_EPS: ModelId = ModelId(6);
    pub const COMBINED_MATURATION: ModelId = ModelId(7);

    /// Every identifier in catalog order
    pub fn all() -> impl Iterator<Item = ModelId> {
        (0..CATALOG.len()).map(ModelId)
    }

    /// Resolve a scale key and a model key
    pub fn lookup(scale: &str, model: &str) -> ModelResult<Self> {
        let scale: Scale = scale.parse()?;
        let model_key = model.trim();
        ModelId::all()
            .find(|id| {
                let entry = definition(*id);
                entry.scale == scale && entry.model_key.eq_ignore_ascii_case(model_key)
            })
            .ok_or_else(|| ModelError::UnknownModel { key: format!("{}/{}", scale.key(), model_key) })
    }

    /// Full key, e.g. `pilot/C`
    pub fn key(&self) -> &'static str {
        definition(*self).key
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelId {
    type Err = ModelError;

    /// Parse `scale/model`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scale, model) = s
            .split_once('/')
            .ok_or_else(|| ModelError::UnknownModel { key: s.to_string() })?;
        ModelId::lookup(scale, model)
    }
}

// =================================================================================================
// Terms
// =================================================================================================

/// Regressor of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Term {
    /// Value as given
    Linear(Parameter),
    /// log10 of a strictly positive value (biomass gene copies)
    Log10(Parameter),
    /// numerator / max(denominator, floor)
    Ratio {
        numerator: Parameter,
        denominator: Parameter,
        floor: f64,
    },
    /// Boolean flag as 0/1
    Flag(Parameter),
}

impl Term {
    /// Parameters read by the term
    pub fn parameters(&self) -> Vec<Parameter> {
        match self {
            Term::Linear(p) | Term::Log10(p) | Term::Flag(p) => vec![*p],
            Term::Ratio { numerator, denominator, .. } => vec![*numerator, *denominator],
        }
    }

    /// Label used in breakdowns
    pub fn label(&self) -> String {
        match self {
            Term::Linear(p) | Term::Flag(p) => p.key().to_string(),
            Term::Log10(p) => format!("log10({})", p.key()),
            Term::Ratio { numerator, denominator, .. } => format!("{}/{}", numerator.key(), denominator.key()),
        }
    }

    /// Regressor value for `record`
    pub fn value(&self, record: &ParameterRecord, model: &'static str) -> ModelResult<f64> {
        match *self {
            Term::Linear(p) => record.require(p, model),
            Term::Flag(p) => Ok(if record.require_flag(p, model)? { 1.0 } else { 0.0 }),
            Term::Log10(p) => {
                let value = record.require(p, model)?;
                if value <= 0.0 {
                    return Err(ModelError::domain(model, p.key(), value, "> 0 (log10 regressor)"));
                }
                Ok(value.log10())
            }
            Term::Ratio { numerator, denominator, floor } => {
                let top = record.require(numerator, model)?;
                let bottom = record.require(denominator, model)?;
                if bottom < floor {
                    log::debug!("{}: {} = {} below floor, using {}", model, denominator, bottom, floor);
                }
                Ok(top / bottom.max(floor))
            }
        }
    }
}

// =================================================================================================
// Catalog
// =================================================================================================

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    /// Full key `scale/model`
    pub key: &'static str,
    /// Scale the data came from
    pub scale: Scale,
    /// Model key within the scale
    pub model_key: &'static str,
    /// Equation as documented (never executed)
    pub equation: &'static str,
    /// β0
    pub intercept: f64,
    /// (βi, term) pairs in equation order
    pub terms: &'static [(f64, Term)],
    /// Fit statistics
    pub statistics: FitStatistics,
    /// Meaning of the response
    pub convention: RemovalConvention,
    /// Known issue reported with every evaluation
    pub note: Option<&'static str>,
}

const fn stats(r_squared: f64, p_value: f64) -> FitStatistics {
    FitStatistics { r_squared, p_value }
}

/// Registered regressions
///
/// Only `pilot/C` carries published coefficients and fit statistics. The
/// other entries hold illustrative placeholder coefficients, R² and p-values
/// until the source regression table is available; treat their outputs as
/// shape-only and replace the entries once the fitted values are known.
static CATALOG: [ModelDefinition; 8] = [
    ModelDefinition {
        key: "lab/eps",
        scale: Scale::LabColumn,
        model_key: "eps",
        equation: "LRV = 0.42 + 2.1e-3 protein + 1.6e-3 carbohydrate",
        intercept: 0.42,
        terms: &[
            (2.1e-3, Term::Linear(Parameter::Protein)),
            (1.6e-3, Term::Linear(Parameter::Carbohydrate)),
        ],
        statistics: stats(0.81, 0.002),
        convention: RemovalConvention::Log10Removal,
        note: None,
    },
    ModelDefinition {
        key: "lab/age",
        scale: Scale::LabColumn,
        model_key: "age",
        equation: "LRV = 0.35 + 0.021 age",
        intercept: 0.35,
        terms: &[(0.021, Term::Linear(Parameter::SchmutzdeckeAge))],
        statistics: stats(0.74, 0.006),
        convention: RemovalConvention::Log10Removal,
        note: None,
    },
    ModelDefinition {
        key: "lab/biomass",
        scale: Scale::LabColumn,
        model_key: "biomass",
        equation: "LRV = -3.1 + 0.52 log10(biomass)",
        intercept: -3.1,
        terms: &[(0.52, Term::Log10(Parameter::Biomass))],
        statistics: stats(0.68, 0.011),
        convention: RemovalConvention::Log10Removal,
        note: None,
    },
    ModelDefinition {
        key: "pilot/A",
        scale: Scale::Pilot,
        model_key: "A",
        equation: "lambda = 0.12 + 3.9e-3 carbohydrate",
        intercept: 0.12,
        terms: &[(3.9e-3, Term::Linear(Parameter::Carbohydrate))],
        statistics: stats(0.62, 0.010),
        convention: RemovalConvention::RateConstantPerDay,
        note: None,
    },
    ModelDefinition {
        key: "pilot/B",
        scale: Scale::Pilot,
        model_key: "B",
        equation: "lambda = 0.48 + 0.61 (protein/carbohydrate) + 5.2e-3 age",
        intercept: 0.48,
        terms: &[
            (
                0.61,
                Term::Ratio {
                    numerator: Parameter::Protein,
                    denominator: Parameter::Carbohydrate,
                    floor: MIN_CARBOHYDRATE,
                },
            ),
            (5.2e-3, Term::Linear(Parameter::SchmutzdeckeAge)),
        ],
        statistics: stats(0.58, 0.020),
        convention: RemovalConvention::RateConstantPerDay,
        note: None,
    },
    ModelDefinition {
        key: "pilot/C",
        scale: Scale::Pilot,
        model_key: "C",
        equation: "lambda = -2.2556 + 4.78e-3 carbohydrate + 0.0124 protein - 0.1935 inoculated",
        intercept: -2.2556,
        terms: &[
            (4.78e-3, Term::Linear(Parameter::Carbohydrate)),
            (0.0124, Term::Linear(Parameter::Protein)),
            (-0.1935, Term::Flag(Parameter::Inoculated)),
        ],
        statistics: stats(0.87, 0.001),
        convention: RemovalConvention::RateConstantPerDay,
        note: None,
    },
    ModelDefinition {
        key: "combined/eps",
        scale: Scale::Combined,
        model_key: "eps",
        equation: "LRV = 0.28 + 1.9e-3 carbohydrate + 2.4e-3 protein",
        intercept: 0.28,
        terms: &[
            (1.9e-3, Term::Linear(Parameter::Carbohydrate)),
            (2.4e-3, Term::Linear(Parameter::Protein)),
        ],
        statistics: stats(0.71, 0.003),
        convention: RemovalConvention::Log10Removal,
        note: Some(
            "combined/eps: evaluated on carbohydrate and protein as documented; \
             earlier tooling substituted biomass for the EPS terms",
        ),
    },
    ModelDefinition {
        key: "combined/maturation",
        scale: Scale::Combined,
        model_key: "maturation",
        equation: "LRV = 0.9 + 0.0105 age - 1.8 D50 + 0.35 inoculated",
        intercept: 0.9,
        terms: &[
            (0.0105, Term::Linear(Parameter::SchmutzdeckeAge)),
            (-1.8, Term::Linear(Parameter::GrainSize)),
            (0.35, Term::Flag(Parameter::Inoculated)),
        ],
        statistics: stats(0.76, 0.001),
        convention: RemovalConvention::Log10Removal,
        note: None,
    },
];

/// Whole catalog
pub fn catalog() -> &'static [ModelDefinition] {
    &CATALOG
}

/// Entry of an identifier
pub fn definition(id: ModelId) -> &'static ModelDefinition {
    &CATALOG[id.0]
}

/// Entries of one scale, in catalog order
pub fn models_for_scale(scale: Scale) -> impl Iterator<Item = (ModelId, &'static ModelDefinition)> {
    ModelId::all()
        .map(|id| (id, definition(id)))
        .filter(move |(_, entry)| entry.scale == scale)
}

impl ModelDefinition {
    /// Unclamped regression output and its per-term contributions
    pub fn compute(&self, record: &ParameterRecord) -> ModelResult<(f64, Vec<Contribution>)> {
        let mut breakdown = Vec::with_capacity(self.terms.len() + 1);
        breakdown.push(Contribution::new("intercept", self.intercept));

        let mut total = self.intercept;
        for (coefficient, term) in self.terms {
            let contribution = coefficient * term.value(record, self.key)?;
            breakdown.push(Contribution::new(term.label(), contribution));
            total += contribution;
        }
        Ok((total, breakdown))
    }
}

impl RemovalModel for ModelDefinition {
    fn name(&self) -> &str {
        self.key
    }

    fn equation(&self) -> &str {
        self.equation
    }

    fn required_parameters(&self) -> Vec<Parameter> {
        let mut parameters: Vec<Parameter> = self.terms.iter().flat_map(|(_, term)| term.parameters()).collect();
        parameters.sort();
        parameters.dedup();
        parameters
    }

    fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult> {
        let (raw, breakdown) = self.compute(record)?;
        log::debug!("{}: {} = {}", self.key, self.convention, raw);

        let advisories = self
            .note
            .map(|note| vec![Advisory::new(AdvisoryKind::SourceInconsistency, note)])
            .unwrap_or_default();

        Ok(PredictionResult::new(raw, self.convention, self.key)
            .with_statistics(self.statistics)
            .with_breakdown(breakdown)
            .with_advisories(advisories))
    }
}

// =================================================================================================
// Operations
// =================================================================================================

/// Evaluate one entry addressed by string keys
pub fn evaluate(scale: &str, model: &str, record: &ParameterRecord) -> ModelResult<PredictionResult> {
    definition(ModelId::lookup(scale, model)?).evaluate(record)
}

/// Evaluate every entry against the same record
///
/// Failures are reported per entry so one missing field does not hide the
/// rest of the comparison.
pub fn evaluate_all(record: &ParameterRecord) -> BTreeMap<ModelId, ModelResult<PredictionResult>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        CATALOG
            .par_iter()
            .enumerate()
            .map(|(i, entry)| (ModelId(i), entry.evaluate(record)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        CATALOG
            .iter()
            .enumerate()
            .map(|(i, entry)| (ModelId(i), entry.evaluate(record)))
            .collect()
    }
}

/// Canonical prediction of a scale
///
/// Under [`SelectionPolicy::HighestRSquared`], entries the record cannot feed
/// (missing fields) are skipped; any other failure is returned.
pub fn best_available(scale: Scale, record: &ParameterRecord) -> ModelResult<PredictionResult> {
    match scale.policy() {
        SelectionPolicy::Named(id) => definition(id).evaluate(record),
        SelectionPolicy::HighestRSquared => {
            let mut candidates: Vec<&ModelDefinition> = models_for_scale(scale).map(|(_, e)| e).collect();
            candidates.sort_by(|a, b| b.statistics.r_squared.total_cmp(&a.statistics.r_squared));

            let mut first_missing = None;
            for entry in candidates {
                match entry.evaluate(record) {
                    Ok(prediction) => return Ok(prediction),
                    Err(err @ ModelError::MissingField { .. }) => {
                        log::debug!("{}: skipped ({})", entry.key, err);
                        first_missing.get_or_insert(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(first_missing.unwrap_or_else(|| ModelError::UnknownModel { key: scale.key().to_string() }))
        }
    }
}

/// Sweep one entry over one of its parameters
pub fn sweep_over_variable(
    scale: &str,
    model: &str,
    variable: Parameter,
    config: &SweepConfiguration,
    fixed: &ParameterRecord,
) -> ModelResult<SweepSeries> {
    let entry = definition(ModelId::lookup(scale, model)?);
    sweep_model(entry, variable, config, fixed)
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepRange;
    use approx::assert_relative_eq;

    fn mature_record() -> ParameterRecord {
        ParameterRecord::empty()
            .with(Parameter::Carbohydrate, 390.0)
            .with(Parameter::Protein, 185.0)
            .with_flag(Parameter::Inoculated, true)
            .with(Parameter::SchmutzdeckeAge, 730.0)
            .with(Parameter::Biomass, 3.2e8)
            .with(Parameter::GrainSize, 0.3)
    }

    #[test]
    fn test_catalog_keys_are_consistent() {
        for (i, entry) in catalog().iter().enumerate() {
            assert_eq!(entry.key, format!("{}/{}", entry.scale.key(), entry.model_key));
            assert_eq!(ModelId::lookup(entry.scale.key(), entry.model_key).unwrap(), ModelId(i));
            assert!(!entry.required_parameters().is_empty());
        }
    }

    #[test]
    fn test_pilot_model_c_reference_point() {
        let record = ParameterRecord::empty()
            .with(Parameter::Carbohydrate, 390.0)
            .with(Parameter::Protein, 185.0)
            .with_flag(Parameter::Inoculated, true);
        let prediction = definition(ModelId::PILOT_C).evaluate(&record).unwrap();

        let expected = -2.2556 + 4.78e-3 * 390.0 + 0.0124 * 185.0 - 0.1935;
        assert_relative_eq!(prediction.raw, expected, max_relative = 1e-12);
        assert_relative_eq!(prediction.value, 1.7091, epsilon = 1e-9);
        assert_eq!(prediction.convention, RemovalConvention::RateConstantPerDay);
        assert_eq!(prediction.statistics.unwrap().r_squared, 0.87);
    }

    #[test]
    fn test_string_keys() {
        assert_eq!("pilot/C".parse::<ModelId>().unwrap(), ModelId::PILOT_C);
        assert_eq!(ModelId::lookup("Pilot", "c").unwrap(), ModelId::PILOT_C);
        assert_eq!("combined/maturation".parse::<ModelId>().unwrap(), ModelId::COMBINED_MATURATION);
        assert!(matches!("pilot/Z".parse::<ModelId>(), Err(ModelError::UnknownModel { .. })));
        assert!(matches!("nowhere".parse::<ModelId>(), Err(ModelError::UnknownModel { .. })));
        assert_eq!(ModelId::PILOT_C.to_string(), "pilot/C");
    }

    #[test]
    fn test_missing_field_is_reported() {
        let record = ParameterRecord::new(Parameter::Protein, 185.0);
        let err = evaluate("pilot", "C", &record).unwrap_err();
        assert_eq!(err, ModelError::missing("pilot/C", "carbohydrate"));
    }

    #[test]
    fn test_ratio_floor() {
        let record = ParameterRecord::empty()
            .with(Parameter::Protein, 2.0)
            .with(Parameter::Carbohydrate, 0.0)
            .with(Parameter::SchmutzdeckeAge, 0.0);
        let prediction = definition(ModelId::PILOT_B).evaluate(&record).unwrap();
        assert_relative_eq!(prediction.raw, 0.48 + 0.61 * 2.0 / MIN_CARBOHYDRATE, max_relative = 1e-12);
        assert!(prediction.raw.is_finite());
    }

    #[test]
    fn test_log10_term_rejects_zero_biomass() {
        let record = ParameterRecord::new(Parameter::Biomass, 0.0);
        let err = definition(ModelId::LAB_BIOMASS).evaluate(&record).unwrap_err();
        assert!(err.is_domain_violation());
    }

    #[test]
    fn test_negative_output_clamped_but_inspectable() {
        let record = ParameterRecord::empty()
            .with(Parameter::Carbohydrate, 0.0)
            .with(Parameter::Protein, 0.0)
            .with_flag(Parameter::Inoculated, false);
        let prediction = definition(ModelId::PILOT_C).evaluate(&record).unwrap();
        assert_eq!(prediction.value, 0.0);
        assert_relative_eq!(prediction.raw, -2.2556);
    }

    #[test]
    fn test_combined_eps_carries_inconsistency_advisory() {
        let prediction = definition(ModelId::COMBINED_EPS).evaluate(&mature_record()).unwrap();
        assert_eq!(prediction.advisories.len(), 1);
        assert_eq!(prediction.advisories[0].kind, AdvisoryKind::SourceInconsistency);
        assert_eq!(
            definition(ModelId::COMBINED_EPS).required_parameters(),
            vec![Parameter::Protein, Parameter::Carbohydrate]
        );
    }

    #[test]
    fn test_evaluate_all_covers_catalog() {
        let results = evaluate_all(&mature_record());
        assert_eq!(results.len(), catalog().len());
        assert!(results.values().all(|r| r.is_ok()));

        let partial = evaluate_all(&ParameterRecord::new(Parameter::SchmutzdeckeAge, 100.0));
        assert!(partial[&ModelId::LAB_AGE].is_ok());
        assert!(partial[&ModelId::PILOT_C].is_err());
    }

    #[test]
    fn test_best_available_policies() {
        let record = mature_record();
        assert_eq!(best_available(Scale::Pilot, &record).unwrap().source, "pilot/C");
        assert_eq!(best_available(Scale::LabColumn, &record).unwrap().source, "lab/eps");
        assert_eq!(best_available(Scale::Combined, &record).unwrap().source, "combined/maturation");

        // the best lab entry cannot be fed: fall back to the next R²
        let age_only = ParameterRecord::new(Parameter::SchmutzdeckeAge, 60.0);
        assert_eq!(best_available(Scale::LabColumn, &age_only).unwrap().source, "lab/age");

        let nothing = ParameterRecord::empty();
        assert!(matches!(best_available(Scale::LabColumn, &nothing), Err(ModelError::MissingField { .. })));
    }

    #[test]
    fn test_sweep_over_carbohydrate() {
        let config = SweepConfiguration::new(SweepRange::linear(0.0, 600.0, 7));
        let series = sweep_over_variable("pilot", "C", Parameter::Carbohydrate, &config, &mature_record()).unwrap();
        let raw = series.column("raw").unwrap();
        for pair in raw.as_slice().windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 4.78e-3 * 100.0, max_relative = 1e-9);
        }
        assert!(sweep_over_variable("pilot", "C", Parameter::Biomass, &config, &mature_record()).is_err());
    }

    #[test]
    fn test_idempotent_evaluation() {
        let record = mature_record();
        let a = evaluate_all(&record);
        let b = evaluate_all(&record);
        for id in ModelId::all() {
            assert_eq!(a[&id].as_ref().unwrap().raw.to_bits(), b[&id].as_ref().unwrap().raw.to_bits());
        }
    }
}
