//! ssf-rs: Microbial Removal Models for Slow Sand Filters
//!
//! A library of closed-form and semi-empirical models that predict how well
//! a slow sand filter removes microorganisms, from the clean-bed physics of
//! a single sand grain up to regressions fitted on pilot filters.
//!
//! # Architecture
//!
//! ssf-rs is built on two core principles:
//!
//! 1. **Separation of Models and Sweeps**
//!    - Models define expressions (what is evaluated)
//!    - Sweeps decide the operating points (where it is evaluated)
//!
//! 2. **Explicit Conventions**
//!    - Every result states whether it is a log10 removal, a natural-log
//!      removal, a rate constant, an efficiency or a fraction
//!    - Domain violations are typed errors, validity concerns are advisories
//!
//! # Quick Start
//!
//! ```rust
//! use ssf_rs::prelude::*;
//!
//! # fn main() -> Result<(), ModelError> {
//! // 1. Describe the operating point
//! let record = ParameterRecord::empty()
//!     .with(Parameter::Carbohydrate, 390.0)
//!     .with(Parameter::Protein, 185.0)
//!     .with_flag(Parameter::Inoculated, true);
//!
//! // 2. Evaluate a pilot-scale regression
//! let prediction = registry::evaluate("pilot", "C", &record)?;
//! assert!((prediction.value - 1.7091).abs() < 1e-9);
//!
//! // 3. Sweep the clean-bed collector efficiency over particle size
//! let config = SweepConfiguration::new(SweepRange::logarithmic(0.01, 10.0, 50));
//! let series = collector::sweep_over_variable(
//!     CollectorVariable::ParticleDiameter,
//!     &config,
//!     &CollectorInputs::default(),
//! )?;
//! assert_eq!(series.len(), 50);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`physics`]: Parameters, records, result conventions and units
//! - [`models`]: The removal models
//! - [`sweep`]: Sensitivity sweeps over one variable
//! - [`output`]: CSV export of sweeps and comparisons
//! - [`error`]: The shared error type

// Core modules
pub mod error;
pub mod physics;

pub mod models;
pub mod sweep;

pub mod output;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use ssf_rs::prelude::*;
    //! ```
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::models::{biofilm_cft, collector, layer_split, registry, two_site};
    pub use crate::models::{
        CollectorInputs, CollectorVariable, LayerSplitter, ModelId, Scale, SingleCollectorModel, StageModel,
        SystemRegressionModel, TwoSiteModel, TwoSiteRates,
    };
    pub use crate::physics::{Parameter, ParameterRecord, PredictionResult, RemovalConvention, RemovalModel};
    pub use crate::sweep::{run_sweep, sweep_model, SweepConfiguration, SweepRange, SweepSeries};
}
