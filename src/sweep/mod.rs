//! Sensitivity sweeps
//!
//! A sweep re-evaluates a model over a range of one independent variable
//! while every other input stays fixed. It is the counterpart of a
//! time integrator for closed-form models: the model provides WHAT is
//! evaluated, the sweep decides WHERE.
//!
//! # Module Organization
//!
//! - **`traits`**: [`SweepRange`], [`SweepSpacing`], [`SweepConfiguration`]
//! - **`series`**: [`SweepSample`], [`SweepSeries`]
//! - this file: the generators
//!   - [`run_sweep`]: eager, optionally parallel, returns a [`SweepSeries`]
//!   - [`lazy_sweep`]: lazy iterator of samples, evaluated on demand
//!   - [`sweep_model`]: sweep any [`RemovalModel`] over one [`Parameter`]
//!
//! # Example
//!
//! ```rust
//! use ssf_rs::sweep::{run_sweep, SweepConfiguration, SweepRange};
//!
//! let config = SweepConfiguration::new(SweepRange::linear(0.0, 2.0, 5));
//! let series = run_sweep(&config, "x", "-", &["square"], |x| Ok(vec![x * x])).unwrap();
//! assert_eq!(series.values[(4, 0)], 4.0);
//! ```
//!
//! # Error Handling
//!
//! Generators stop at the first failing sample and return its error. The
//! lazy generator yields each sample's `Result` and leaves the decision to
//! the caller.

mod traits;
mod series;

pub use traits::{
    SweepConfiguration,
    SweepRange,
    SweepSpacing,
    SweepValues,
    DEFAULT_PARALLEL_THRESHOLD,
};
pub use series::{SweepSample, SweepSeries};

use crate::error::{ModelError, ModelResult};
use crate::physics::{Parameter, ParameterRecord, RemovalModel};

/// Evaluate `evaluate` at every value of the configured range
///
/// Sample order always follows the range, whether or not the evaluation
/// ran in parallel.
pub fn run_sweep<F>(
    config: &SweepConfiguration,
    variable: &str,
    unit: &str,
    labels: &[&str],
    evaluate: F,
) -> ModelResult<SweepSeries>
where
    F: Fn(f64) -> ModelResult<Vec<f64>> + Sync + Send,
{
    config.validate()?;
    log::debug!(
        "sweeping {} over {} .. {} ({} points, {:?})",
        variable,
        config.range.start,
        config.range.end,
        config.range.points,
        config.range.spacing
    );

    let range = config.range;
    let evaluate_at = |i: usize| -> ModelResult<SweepSample> {
        let x = range.value_at(i);
        let values = evaluate(x)?;
        log::trace!("{} = {} -> {:?}", variable, x, values);
        Ok(SweepSample::new(x, values))
    };

    let samples: ModelResult<Vec<SweepSample>> = if range.points > config.parallel_threshold {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            (0..range.points).into_par_iter().map(evaluate_at).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            (0..range.points).map(evaluate_at).collect()
        }
    } else {
        (0..range.points).map(evaluate_at).collect()
    };

    SweepSeries::from_samples(variable, unit, labels, samples?)
}

/// Lazily evaluate `evaluate` over a range
///
/// Nothing is computed until the iterator is advanced. Dropping the
/// iterator early simply skips the remaining samples.
pub fn lazy_sweep<'a, F>(
    range: &SweepRange,
    evaluate: F,
) -> impl Iterator<Item = ModelResult<SweepSample>> + 'a
where
    F: Fn(f64) -> ModelResult<Vec<f64>> + 'a,
{
    let validity = range.validate();
    let failed = validity.is_err();
    let values = range.values();

    validity
        .err()
        .map(Err)
        .into_iter()
        .chain(values.take_while(move |_| !failed).map(move |x| -> ModelResult<SweepSample> {
            let values = evaluate(x)?;
            Ok(SweepSample::new(x, values))
        }))
}

/// Sweep a record-driven model over one of its parameters
///
/// Each sample evaluates the model on a copy of `fixed` where `variable`
/// is replaced by the sampled value. The series has two columns: the
/// presentation `value` and the unclamped `raw` value.
///
/// # Errors
/// - [`ModelError::UnsupportedVariable`] when the model does not read `variable`
/// - any evaluation error of the model
pub fn sweep_model(
    model: &dyn RemovalModel,
    variable: Parameter,
    config: &SweepConfiguration,
    fixed: &ParameterRecord,
) -> ModelResult<SweepSeries> {
    if !model.required_parameters().contains(&variable) {
        return Err(ModelError::UnsupportedVariable {
            model: model.name().to_string(),
            variable: variable.key().to_string(),
        });
    }

    run_sweep(config, variable.key(), variable.unit(), &["value", "raw"], |x| {
        let prediction = model.evaluate(&fixed.overriding(variable, x))?;
        Ok(vec![prediction.value, prediction.raw])
    })
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{PredictionResult, RemovalConvention};

    struct Linear;

    impl RemovalModel for Linear {
        fn name(&self) -> &str {
            "linear"
        }

        fn equation(&self) -> &str {
            "y = protein - 10"
        }

        fn required_parameters(&self) -> Vec<Parameter> {
            vec![Parameter::Protein]
        }

        fn evaluate(&self, record: &ParameterRecord) -> ModelResult<PredictionResult> {
            let protein = record.require(Parameter::Protein, self.name())?;
            Ok(PredictionResult::new(protein - 10.0, RemovalConvention::Log10Removal, self.name()))
        }
    }

    #[test]
    fn test_run_sweep_orders_samples() {
        let config = SweepConfiguration::new(SweepRange::linear(1.0, 3.0, 3));
        let series = run_sweep(&config, "x", "-", &["double"], |x| Ok(vec![2.0 * x])).unwrap();
        assert_eq!(series.x.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(series.column("double").unwrap().as_slice(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_run_sweep_above_threshold_matches_sequential() {
        let range = SweepRange::logarithmic(1e-3, 1e3, 64);
        let sequential = run_sweep(&SweepConfiguration::new(range), "x", "-", &["ln"], |x| Ok(vec![x.ln()])).unwrap();
        let forced = run_sweep(
            &SweepConfiguration::new(range).with_parallel_threshold(1),
            "x",
            "-",
            &["ln"],
            |x| Ok(vec![x.ln()]),
        )
        .unwrap();
        assert_eq!(sequential, forced);
    }

    #[test]
    fn test_run_sweep_propagates_first_error() {
        let config = SweepConfiguration::new(SweepRange::linear(-1.0, 1.0, 5));
        let result = run_sweep(&config, "x", "-", &["sqrt"], |x| {
            if x < 0.0 {
                Err(ModelError::domain("sqrt", "x", x, ">= 0"))
            } else {
                Ok(vec![x.sqrt()])
            }
        });
        assert!(matches!(result, Err(ModelError::DomainViolation { .. })));
    }

    #[test]
    fn test_lazy_sweep_is_lazy_and_restartable() {
        let range = SweepRange::linear(0.0, 9.0, 10);
        let first: Vec<f64> = lazy_sweep(&range, |x| Ok(vec![x + 1.0]))
            .take(3)
            .map(|s| s.unwrap().values[0])
            .collect();
        assert_eq!(first, vec![1.0, 2.0, 3.0]);

        let again: Vec<f64> = lazy_sweep(&range, |x| Ok(vec![x + 1.0]))
            .take(3)
            .map(|s| s.unwrap().values[0])
            .collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_lazy_sweep_reports_invalid_range_once() {
        let range = SweepRange::logarithmic(0.0, 1.0, 4);
        let items: Vec<_> = lazy_sweep(&range, |x| Ok(vec![x])).collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn test_sweep_model_overrides_variable() {
        let fixed = ParameterRecord::new(Parameter::Protein, 0.0);
        let config = SweepConfiguration::new(SweepRange::linear(0.0, 20.0, 3));
        let series = sweep_model(&Linear, Parameter::Protein, &config, &fixed).unwrap();

        assert_eq!(series.variable, "protein");
        assert_eq!(series.column("raw").unwrap().as_slice(), &[-10.0, 0.0, 10.0]);
        assert_eq!(series.column("value").unwrap().as_slice(), &[0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_sweep_model_rejects_foreign_variable() {
        let fixed = ParameterRecord::new(Parameter::Protein, 0.0);
        let config = SweepConfiguration::new(SweepRange::linear(0.0, 1.0, 3));
        let err = sweep_model(&Linear, Parameter::Velocity, &config, &fixed).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedVariable { .. }));
    }
}
