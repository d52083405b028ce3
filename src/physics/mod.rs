//! Shared physics vocabulary
//!
//! This module provides the types every removal model speaks:
//!
//! - **Parameter**: type-safe identifier for an input, with its unit
//! - **ParameterRecord**: the caller's flat set of inputs
//! - **RemovalModel**: trait for models evaluated from a record
//! - **PredictionResult**: clamped value + raw value + diagnostics
//! - **units**: conversions applied at the API boundary and water properties
//!
//! # Architecture
//!
//! Models never keep state between evaluations. A caller owns the
//! [`ParameterRecord`], hands it to a model, and receives a
//! [`PredictionResult`]. Sweeps ([`crate::sweep`]) repeat that call while
//! varying one parameter.
//!
//! # Example
//!
//! ```rust
//! use ssf_rs::physics::{Parameter, ParameterRecord, RemovalModel};
//! use ssf_rs::models::registry::{self, ModelId};
//!
//! let record = ParameterRecord::empty()
//!     .with(Parameter::Carbohydrate, 390.0)
//!     .with(Parameter::Protein, 185.0)
//!     .with_flag(Parameter::Inoculated, true);
//!
//! let model = registry::definition(ModelId::PILOT_C);
//! let prediction = model.evaluate(&record).unwrap();
//! assert!(prediction.value > 1.7 && prediction.value < 1.71);
//! ```

// module declaration
pub mod traits;
pub mod data;
pub mod units;

// re-export commonly used types for convenience
pub use data::{
    Advisory,
    AdvisoryKind,
    Contribution,
    FitStatistics,
    PredictionResult,
    RemovalConvention, };
pub use traits::{
    Parameter,
    ParameterRecord,
    RemovalModel, };
