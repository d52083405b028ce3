//! Removal models for slow sand filters
//!
//! Every model is a closed-form or semi-empirical expression evaluated at a
//! caller-specified operating point. Models that read a
//! [`ParameterRecord`](crate::physics::ParameterRecord) implement
//! [`RemovalModel`](crate::physics::RemovalModel), so sweeps and comparison
//! displays can consume them uniformly.
//!
//! # Available Models
//!
//! ## [`two_site`]: two-site attachment kinetics
//!
//! Steady-state balance of liquid-phase inactivation and attachment to two
//! site populations, giving a removal coefficient λ \[d⁻¹\] and the
//! dispersive concentration profile along the bed.
//!
//! ## [`collector`]: single-collector efficiency
//!
//! Tufenkji–Elimelech contact efficiency of a clean grain (diffusion,
//! interception, gravity) and its filter-scale log removal.
//!
//! ## [`biofilm_cft`]: biofilm-augmented filtration
//!
//! A linear regression on bulk bed properties (natural-log removal) and a
//! three-stage mechanistic efficiency blended by porosity loss.
//!
//! ## [`registry`]: multi-scale regressions
//!
//! Static catalog of lab, pilot and pooled regressions on EPS, age and
//! biomass, with per-scale selection and cross-model comparison.
//!
//! ## [`layer_split`]: depth-resolved split
//!
//! Share of removal achieved in the Schmutzdecke as the filter matures.
//!
//! # Chaining
//!
//! The models compose: the clean-bed η0 of [`collector`] is the η_base of
//! the three-stage model, whose attachment rate can feed the two-site
//! kinetics, and any record-driven model can supply the total removal that
//! [`layer_split`] apportions.

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod biofilm_cft;
pub mod collector;
pub mod layer_split;
pub mod registry;
pub mod two_site;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use biofilm_cft::{
    CleanBedReference, StageModel, StageModelConfig, SystemRegressionCoefficients, SystemRegressionModel,
};
pub use collector::{CollectorEfficiency, CollectorInputs, CollectorVariable, SingleCollectorModel};
pub use layer_split::{LayerSplit, LayerSplitConfig, LayerSplitter};
pub use registry::{ModelDefinition, ModelId, Scale};
pub use two_site::{DispersiveTransport, TwoSiteModel, TwoSiteRates};
