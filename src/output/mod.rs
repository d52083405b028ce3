//! Output module for model results
//!
//! Sweeps and cross-model comparisons are written to files for analysis in
//! external tools.
//!
//! # Architecture
//!
//! ```text
//! output/
//! ├── mod.rs              ← This file
//! └── export/             ← Data export
//!     ├── mod.rs          ← Exporter trait
//!     └── csv.rs
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ssf_rs::output::{CsvExporter, Exporter};
//! use ssf_rs::models::two_site::concentration_profile;
//! use ssf_rs::sweep::SweepRange;
//!
//! let profile = concentration_profile(2.4, 0.01, 0.5, &SweepRange::linear(0.0, 1.0, 101))?;
//! CsvExporter::default().export_series(&profile, None, "profile.csv")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod export;

// Re-export commonly used items for convenience
pub use export::{CsvConfig, CsvError, CsvExporter, CsvMetadata, Exporter};
