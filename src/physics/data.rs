//! Prediction data types
//!
//! This module provides the containers models hand back to callers:
//! a clamped value, the raw value it was clamped from, the convention the
//! number is expressed in, and optional diagnostics (per-term breakdown,
//! goodness-of-fit statistics, validity advisories).

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a predicted number means
///
/// Natural-log and log10 removals coexist in the literature these models
/// come from. The convention is carried with every result so the two are
/// never mixed silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalConvention {
    /// −log10(C/C0)
    Log10Removal,
    /// −ln(C/C0)
    NaturalLogRemoval,
    /// First-order removal coefficient \[d⁻¹\]
    RateConstantPerDay,
    /// Dimensionless efficiency in \[0,1\]
    Efficiency,
    /// Dimensionless fraction in \[0,1\]
    Fraction,
}

impl RemovalConvention {
    /// Short label used in CSV headers and displays
    pub fn label(&self) -> &'static str {
        match self {
            RemovalConvention::Log10Removal => "log10 removal",
            RemovalConvention::NaturalLogRemoval => "ln removal",
            RemovalConvention::RateConstantPerDay => "lambda (1/d)",
            RemovalConvention::Efficiency => "efficiency (-)",
            RemovalConvention::Fraction => "fraction (-)",
        }
    }
}

impl fmt::Display for RemovalConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Goodness-of-fit statistics of an empirical regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    /// Coefficient of determination R²
    pub r_squared: f64,
    /// Significance of the fit (p-value)
    pub p_value: f64,
}

/// One signed term of an additive expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Term label (e.g. "porosity", "etaD")
    pub label: String,
    /// Signed value of the term
    pub value: f64,
}

impl Contribution {
    /// Create a labelled contribution
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self { label: label.into(), value }
    }
}

/// Kind of non-fatal warning attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvisoryKind {
    /// A correlation is used outside its published applicability window
    OutsideValidityRange,
    /// An input or intermediate quantity was clamped
    Clamped,
    /// The model's documentation and its fitted variables disagree
    SourceInconsistency,
}

/// Non-fatal warning carried alongside a valid numeric result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// Category
    pub kind: AdvisoryKind,
    /// Human readable message
    pub message: String,
}

impl Advisory {
    /// Create an advisory and forward it to the log
    pub fn new(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{}", message);
        Self { kind, message }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

/// Result of evaluating one model at one operating point
///
/// # Clamping
///
/// `value` is the presentation value, clamped at zero. `raw` keeps the
/// unclamped number so a negative regression output stays inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Presentation value (≥ 0)
    pub value: f64,
    /// Value as computed, before clamping
    pub raw: f64,
    /// Meaning of the number
    pub convention: RemovalConvention,
    /// Name of the model that produced the value
    pub source: String,
    /// Fit statistics when the model is an empirical regression
    pub statistics: Option<FitStatistics>,
    /// Per-term breakdown of additive expressions
    pub breakdown: Vec<Contribution>,
    /// Validity warnings
    pub advisories: Vec<Advisory>,
}

impl PredictionResult {
    /// Create a result from a raw value, clamping at zero
    pub fn new(raw: f64, convention: RemovalConvention, source: impl Into<String>) -> Self {
        Self {
            value: raw.max(0.0),
            raw,
            convention,
            source: source.into(),
            statistics: None,
            breakdown: Vec::new(),
            advisories: Vec::new(),
        }
    }

    /// Builder: attach fit statistics
    pub fn with_statistics(mut self, statistics: FitStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Builder: attach a breakdown
    pub fn with_breakdown(mut self, breakdown: Vec<Contribution>) -> Self {
        self.breakdown = breakdown;
        self
    }

    /// Builder: attach advisories
    pub fn with_advisories(mut self, advisories: Vec<Advisory>) -> Self {
        self.advisories.extend(advisories);
        self
    }

    /// True when clamping changed the value
    pub fn was_clamped(&self) -> bool {
        self.raw < 0.0
    }

    /// True when no advisory is attached
    pub fn is_trustworthy(&self) -> bool {
        self.advisories.is_empty()
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.4} {}", self.source, self.value, self.convention)?;
        if self.was_clamped() {
            write!(f, " (raw {:.4})", self.raw)?;
        }
        Ok(())
    }
}

// ==================== Tests ====================
