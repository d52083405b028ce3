//! Export of model results
//!
//! # Architecture
//!
//! This module defines the [`Exporter`] trait that abstracts the export format.
//! Each format is an independent implementation in its own sub-module, so a
//! new format is a new file and existing formats stay untouched.
//!
//! # Available formats
//!
//! | Format  | Module          |
//! |---------|-----------------|
//! | CSV     | [`csv`]         |
//!
//! # Usage example
//!
//! ```rust,no_run
//! use ssf_rs::output::export::{CsvExporter, Exporter};
//! use ssf_rs::models::registry;
//! use ssf_rs::physics::{Parameter, ParameterRecord};
//!
//! let record = ParameterRecord::new(Parameter::SchmutzdeckeAge, 365.0);
//! let exporter = CsvExporter::default();
//! exporter.export_comparison(&registry::evaluate_all(&record), "comparison.csv")?;
//! # Ok::<(), ssf_rs::output::export::CsvError>(())
//! ```

pub mod csv;

pub use csv::{CsvConfig, CsvError, CsvExporter, CsvMetadata};

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ModelResult;
use crate::models::registry::ModelId;
use crate::physics::PredictionResult;
use crate::sweep::SweepSeries;

/// Abstraction trait for all export formats.
///
/// # Associated type `Error`
///
/// Each format manages its own errors via the associated type, so the
/// caller can react to the precise failure without boxing.
///
/// # Parameter `n_points`
///
/// - `None`: exports every sample
/// - `Some(n)`: uniformly downsamples to `n` points, always keeping the
///   **first and last** samples of the sweep
pub trait Exporter {
    /// Error type specific to this export format.
    type Error: std::error::Error;

    /// Exports a sweep: the independent variable, then one column per output.
    ///
    /// # Errors
    ///
    /// - the series is empty or contains NaN/∞
    /// - the path cannot be written
    fn export_series(
        &self,
        series: &SweepSeries,
        n_points: Option<usize>,
        path: impl AsRef<Path>,
    ) -> Result<(), Self::Error>;

    /// Exports a cross-model comparison, one row per catalog entry.
    ///
    /// Entries that failed are kept with their error message.
    fn export_comparison(
        &self,
        results: &BTreeMap<ModelId, ModelResult<PredictionResult>>,
        path: impl AsRef<Path>,
    ) -> Result<(), Self::Error>;
}
