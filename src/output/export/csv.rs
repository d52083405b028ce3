//! CSV export of sweeps and model comparisons
//!
//! CSV is read by spreadsheets, pandas and most plotting tools, which is
//! where sweep curves usually end up.
//!
//! # Features
//!
//! - **Sweeps**: any [`SweepSeries`], optionally downsampled (first and last
//!   samples are always kept)
//! - **Comparisons**: the per-entry results of
//!   [`registry::evaluate_all`](crate::models::registry::evaluate_all)
//! - **Metadata**: optional `#` header with model, equation, fit statistics
//!   and a UTC timestamp
//! - **Locale**: delimiter and decimal separator are configurable
//! - **Validation**: empty series and NaN/∞ values are rejected before the
//!   file is created
//!
//! # Example
//!
//! ```rust,no_run
//! use ssf_rs::output::export::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
//! use ssf_rs::models::collector::{sweep_over_variable, CollectorInputs, CollectorVariable};
//! use ssf_rs::sweep::{SweepConfiguration, SweepRange};
//!
//! let config = SweepConfiguration::new(SweepRange::logarithmic(0.01, 10.0, 200));
//! let series = sweep_over_variable(CollectorVariable::ParticleDiameter, &config, &CollectorInputs::default())?;
//!
//! let metadata = CsvMetadata::for_model("SingleCollectorEfficiency", "eta0 = etaD + etaI + etaG");
//! let exporter = CsvExporter::new(CsvConfig::default().with_metadata(metadata));
//! exporter.export_series(&series, Some(50), "eta_vs_dp.csv")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! **Output** (`eta_vs_dp.csv`):
//! ```csv
//! # Slow Sand Filter Model Output
//! # Generated: 2026-10-18T09:30:00+00:00
//! # Model: SingleCollectorEfficiency
//! # Equation: eta0 = etaD + etaI + etaG
//! #
//! particle_diameter (µm),eta_d,eta_i,eta_g,eta0
//! 0.010000,0.258452,0.000001,0.000000,0.258453
//! ...
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ModelResult;
use crate::models::registry::{definition, ModelId};
use crate::output::export::Exporter;
use crate::physics::{FitStatistics, PredictionResult};
use crate::sweep::SweepSeries;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by CSV export
#[derive(Error, Debug)]
pub enum CsvError {
    /// File creation or write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing to write
    #[error("empty data: {0}")]
    EmptyData(&'static str),

    /// NaN or infinity in the data
    #[error("invalid data: non-finite value in column '{column}' at row {row}")]
    NonFinite {
        /// Column label
        column: String,
        /// Zero-based data row
        row: usize,
    },

    /// Configuration that would produce an unreadable file
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Example
///
/// ```rust
/// use ssf_rs::output::export::CsvConfig;
///
/// let config = CsvConfig::european().precision(4);
/// assert_eq!(config.delimiter, ';');
/// assert_eq!(config.decimal_separator, ',');
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places for floating-point values (default: 6)
    pub precision: usize,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    /// Metadata to include in header
    pub metadata: Option<CsvMetadata>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 6,
            include_metadata: false,
            metadata: None,
        }
    }
}

impl CsvConfig {
    /// European CSV (semicolon delimiter, comma decimal separator)
    pub fn european() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        }
    }

    /// High precision (12 decimal places)
    pub fn high_precision() -> Self {
        Self {
            precision: 12,
            ..Default::default()
        }
    }

    /// Builder pattern: set delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder pattern: set precision
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Builder pattern: enable metadata
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CsvError> {
        if self.delimiter == self.decimal_separator {
            return Err(CsvError::InvalidConfig(format!(
                "delimiter and decimal separator are both '{}'",
                self.delimiter
            )));
        }
        if self.delimiter == '\n' || self.delimiter == '"' {
            return Err(CsvError::InvalidConfig(format!("unusable delimiter {:?}", self.delimiter)));
        }
        Ok(())
    }
}

/// Metadata for CSV header comments
///
/// Only fields that are set are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvMetadata {
    /// Model name (e.g. "pilot/C")
    pub model_name: Option<String>,

    /// Equation text
    pub equation: Option<String>,

    /// Coefficient of determination
    pub r_squared: Option<f64>,

    /// Significance of the fit
    pub p_value: Option<f64>,

    /// Additional custom entries
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    /// Metadata naming a model and its equation
    pub fn for_model(name: &str, equation: &str) -> Self {
        Self {
            model_name: Some(name.to_string()),
            equation: Some(equation.to_string()),
            ..Default::default()
        }
    }

    /// Metadata of a registry entry, including its fit statistics
    pub fn for_registry_entry(id: ModelId) -> Self {
        let entry = definition(id);
        Self::for_model(entry.key, entry.equation).with_statistics(entry.statistics)
    }

    /// Builder: attach fit statistics
    pub fn with_statistics(mut self, statistics: FitStatistics) -> Self {
        self.r_squared = Some(statistics.r_squared);
        self.p_value = Some(statistics.p_value);
        self
    }

    /// Add custom entry
    pub fn add_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.push((key.into(), value.into()));
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Write metadata header comments
fn write_metadata_header<W: Write>(writer: &mut W, metadata: &CsvMetadata) -> std::io::Result<()> {
    writeln!(writer, "# Slow Sand Filter Model Output")?;
    writeln!(writer, "# Generated: {}", chrono::Utc::now().to_rfc3339())?;

    if let Some(model) = &metadata.model_name {
        writeln!(writer, "# Model: {}", model)?;
    }
    if let Some(equation) = &metadata.equation {
        writeln!(writer, "# Equation: {}", equation)?;
    }
    if let Some(r_squared) = metadata.r_squared {
        writeln!(writer, "# R²: {}", r_squared)?;
    }
    if let Some(p_value) = metadata.p_value {
        writeln!(writer, "# p-value: {}", p_value)?;
    }
    for (key, value) in &metadata.custom {
        writeln!(writer, "# {}: {}", key, value)?;
    }

    writeln!(writer, "#")
}

/// Format number with configured precision and decimal separator
fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = format!("{:.prec$}", value, prec = config.precision);

    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

/// Quote a text field when it contains the delimiter, a quote or a newline
fn quote_field(field: &str, config: &CsvConfig) -> String {
    if field.contains(config.delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// =============================================================================
// Exporter
// =============================================================================

/// CSV implementation of [`Exporter`]
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    config: CsvConfig,
}

impl CsvExporter {
    /// Exporter with a custom configuration
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &CsvConfig {
        &self.config
    }

    fn write_header<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        if self.config.include_metadata {
            if let Some(metadata) = &self.config.metadata {
                write_metadata_header(writer, metadata)?;
            }
        }
        Ok(())
    }

    /// Write a series to any writer
    pub fn write_series<W: Write>(
        &self,
        series: &SweepSeries,
        n_points: Option<usize>,
        writer: &mut W,
    ) -> Result<(), CsvError> {
        self.config.validate()?;

        // ============================= Validation =============================

        if series.is_empty() {
            return Err(CsvError::EmptyData("sweep series has no samples"));
        }
        if let Some(row) = series.x.iter().position(|x| !x.is_finite()) {
            return Err(CsvError::NonFinite { column: series.variable.clone(), row });
        }
        for (col, label) in series.labels.iter().enumerate() {
            if let Some(row) = series.values.column(col).iter().position(|v| !v.is_finite()) {
                return Err(CsvError::NonFinite { column: label.clone(), row });
            }
        }

        let rows = match n_points {
            Some(n) => series.downsample_indices(n),
            None => (0..series.len()).collect(),
        };

        // ============================= Write =============================

        let d = self.config.delimiter;
        self.write_header(writer)?;

        let mut header = quote_field(&format!("{} ({})", series.variable, series.unit), &self.config);
        for label in &series.labels {
            header.push(d);
            header.push_str(&quote_field(label, &self.config));
        }
        writeln!(writer, "{}", header)?;

        for row in rows {
            let mut line = format_number(series.x[row], &self.config);
            for col in 0..series.outputs() {
                line.push(d);
                line.push_str(&format_number(series.values[(row, col)], &self.config));
            }
            writeln!(writer, "{}", line)?;
        }

        log::debug!("wrote {} series ({} columns)", series.variable, series.outputs() + 1);
        Ok(())
    }

    /// Write a comparison table to any writer
    ///
    /// Failed entries keep their row, with empty numeric cells and the
    /// error message in the `status` column.
    pub fn write_comparison<W: Write>(
        &self,
        results: &BTreeMap<ModelId, ModelResult<PredictionResult>>,
        writer: &mut W,
    ) -> Result<(), CsvError> {
        self.config.validate()?;
        if results.is_empty() {
            return Err(CsvError::EmptyData("no model results"));
        }

        let d = self.config.delimiter;
        self.write_header(writer)?;
        writeln!(writer, "model{d}scale{d}convention{d}value{d}raw{d}r_squared{d}p_value{d}status")?;

        for (row, (id, result)) in results.iter().enumerate() {
            let entry = definition(*id);
            let stats = [entry.statistics.r_squared, entry.statistics.p_value]
                .map(|v| format_number(v, &self.config));

            let (value, raw, status) = match result {
                Ok(prediction) => {
                    if !prediction.raw.is_finite() {
                        return Err(CsvError::NonFinite { column: entry.key.to_string(), row });
                    }
                    let status = if prediction.is_trustworthy() {
                        "ok".to_string()
                    } else {
                        prediction.advisories.iter().map(|a| a.message.as_str()).collect::<Vec<_>>().join(" | ")
                    };
                    (
                        format_number(prediction.value, &self.config),
                        format_number(prediction.raw, &self.config),
                        status,
                    )
                }
                Err(err) => (String::new(), String::new(), err.to_string()),
            };

            writeln!(
                writer,
                "{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
                entry.key,
                entry.scale,
                quote_field(entry.convention.label(), &self.config),
                value,
                raw,
                stats[0],
                stats[1],
                quote_field(&status, &self.config),
            )?;
        }
        Ok(())
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, CsvError> {
    Ok(BufWriter::new(File::create(path)?))
}

impl Exporter for CsvExporter {
    type Error = CsvError;

    fn export_series(
        &self,
        series: &SweepSeries,
        n_points: Option<usize>,
        path: impl AsRef<Path>,
    ) -> Result<(), Self::Error> {
        // validate before touching the file system
        let mut buffer = Vec::new();
        self.write_series(series, n_points, &mut buffer)?;
        let mut file = create(path.as_ref())?;
        file.write_all(&buffer)?;
        file.flush()?;
        Ok(())
    }

    fn export_comparison(
        &self,
        results: &BTreeMap<ModelId, ModelResult<PredictionResult>>,
        path: impl AsRef<Path>,
    ) -> Result<(), Self::Error> {
        let mut buffer = Vec::new();
        self.write_comparison(results, &mut buffer)?;
        let mut file = create(path.as_ref())?;
        file.write_all(&buffer)?;
        file.flush()?;
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::models::registry::evaluate_all;
    use crate::physics::{Parameter, ParameterRecord};
    use crate::sweep::{run_sweep, SweepConfiguration, SweepRange, SweepSample};
    use std::fs;
    use tempfile::NamedTempFile;

    fn series(points: usize) -> SweepSeries {
        let config = SweepConfiguration::new(SweepRange::linear(0.0, 1.0, points));
        run_sweep(&config, "velocity", "m/h", &["a", "b"], |x| Ok(vec![x * 2.0, x + 0.5])).unwrap()
    }

    fn to_string(exporter: &CsvExporter, series: &SweepSeries, n: Option<usize>) -> String {
        let mut buffer = Vec::new();
        exporter.write_series(series, n, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_series_header_and_rows() {
        let text = to_string(&CsvExporter::default(), &series(3), None);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "velocity (m/h),a,b");
        assert_eq!(lines[1], "0.000000,0.000000,0.500000");
        assert_eq!(lines[3], "1.000000,2.000000,1.500000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_downsampling_keeps_endpoints() {
        let text = to_string(&CsvExporter::default(), &series(101), Some(5));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].starts_with("0.000000"));
        assert!(lines[5].starts_with("1.000000"));
    }

    #[test]
    fn test_european_format() {
        let exporter = CsvExporter::new(CsvConfig::european().precision(2));
        let text = to_string(&exporter, &series(2), None);
        assert_eq!(text.lines().nth(2).unwrap(), "1,00;2,00;1,50");
    }

    #[test]
    fn test_metadata_header() {
        let mut metadata = CsvMetadata::for_registry_entry(ModelId::PILOT_C);
        metadata.add_custom("Scenario", "fully mature");
        let exporter = CsvExporter::new(CsvConfig::default().with_metadata(metadata));
        let text = to_string(&exporter, &series(2), None);

        assert!(text.starts_with("# Slow Sand Filter Model Output\n# Generated: "));
        assert!(text.contains("# Model: pilot/C\n"));
        assert!(text.contains("# R²: 0.87\n"));
        assert!(text.contains("# Scenario: fully mature\n"));
        assert!(text.contains("#\nvelocity (m/h),a,b\n"));
    }

    #[test]
    fn test_rejects_non_finite_and_empty() {
        let bad = SweepSeries::from_samples("x", "-", &["y"], vec![SweepSample::new(0.0, vec![f64::NAN])]).unwrap();
        let mut sink = Vec::new();
        let err = CsvExporter::default().write_series(&bad, None, &mut sink).unwrap_err();
        assert!(matches!(err, CsvError::NonFinite { row: 0, .. }));

        let empty = SweepSeries::from_samples("x", "-", &["y"], Vec::new()).unwrap();
        assert!(matches!(
            CsvExporter::default().write_series(&empty, None, &mut sink),
            Err(CsvError::EmptyData(_))
        ));
    }

    #[test]
    fn test_invalid_config() {
        let exporter = CsvExporter::new(CsvConfig::default().delimiter('.'));
        let mut sink = Vec::new();
        assert!(matches!(
            exporter.write_series(&series(2), None, &mut sink),
            Err(CsvError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_export_series_to_file() {
        let file = NamedTempFile::new().unwrap();
        CsvExporter::default().export_series(&series(4), None, file.path()).unwrap();
        let text = fs::read_to_string(file.path()).unwrap();
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_failed_export_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let empty = SweepSeries::from_samples("x", "-", &["y"], Vec::new()).unwrap();
        assert!(CsvExporter::default().export_series(&empty, None, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_comparison_table() {
        let record = ParameterRecord::empty()
            .with(Parameter::Carbohydrate, 390.0)
            .with(Parameter::Protein, 185.0)
            .with_flag(Parameter::Inoculated, true);
        let mut results = evaluate_all(&record);
        results.insert(ModelId::LAB_AGE, Err(ModelError::missing("lab/age", "schmutzdecke_age")));

        let mut buffer = Vec::new();
        CsvExporter::default().write_comparison(&results, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "model,scale,convention,value,raw,r_squared,p_value,status");
        assert_eq!(lines.len(), 1 + results.len());

        let pilot_c = lines.iter().find(|l| l.starts_with("pilot/C,")).unwrap();
        assert!(pilot_c.contains(",1.709100,1.709100,"));
        assert!(pilot_c.ends_with(",ok"));

        let lab_age = lines.iter().find(|l| l.starts_with("lab/age,")).unwrap();
        assert!(lab_age.contains("missing required field"));
    }
}
