//! Sweep ranges and configuration
//!
//! # Design Philosophy
//!
//! A sweep is a list of values of one independent variable. The range
//! only describes *where* to sample (bounds, count, spacing). It never
//! stores the samples, so the same range always regenerates the same
//! sequence and can be iterated as many times as needed.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

// ============================================================================
// Spacing
// ============================================================================

/// How sample points are distributed between the bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepSpacing {
    /// Equal increments (velocity, porosity, age sweeps)
    Linear,
    /// Equal ratios (particle diameter across orders of magnitude)
    Logarithmic,
}

// ============================================================================
// Range
// ============================================================================

/// Sampled interval of the independent variable
///
/// # Examples
///
/// ```rust
/// use ssf_rs::sweep::SweepRange;
///
/// let velocity = SweepRange::linear(0.05, 0.5, 10);
/// assert_eq!(velocity.values().count(), 10);
///
/// let diameter = SweepRange::logarithmic(0.01, 10.0, 4);
/// let values: Vec<f64> = diameter.values().collect();
/// assert!((values[1] - 0.1).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    /// First value (included)
    pub start: f64,
    /// Last value (included)
    pub end: f64,
    /// Number of samples
    pub points: usize,
    /// Distribution of samples
    pub spacing: SweepSpacing,
}

impl SweepRange {
    /// Linearly spaced range
    pub fn linear(start: f64, end: f64, points: usize) -> Self {
        Self { start, end, points, spacing: SweepSpacing::Linear }
    }

    /// Logarithmically spaced range (both bounds must be > 0)
    pub fn logarithmic(start: f64, end: f64, points: usize) -> Self {
        Self { start, end, points, spacing: SweepSpacing::Logarithmic }
    }

    /// Validate that the range can be sampled
    pub fn validate(&self) -> ModelResult<()> {
        if self.points == 0 {
            return Err(ModelError::range("at least one point is required"));
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ModelError::range(format!(
                "bounds must be finite (got {} .. {})",
                self.start, self.end
            )));
        }
        if self.spacing == SweepSpacing::Logarithmic && (self.start <= 0.0 || self.end <= 0.0) {
            return Err(ModelError::range(format!(
                "logarithmic spacing needs positive bounds (got {} .. {})",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.points
    }

    /// True when the range has no samples
    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    /// Value of sample `index`
    ///
    /// The first and last samples are exactly `start` and `end`.
    pub fn value_at(&self, index: usize) -> f64 {
        if index == 0 || self.points <= 1 {
            return self.start;
        }
        if index + 1 == self.points {
            return self.end;
        }

        let fraction = index as f64 / (self.points - 1) as f64;
        match self.spacing {
            SweepSpacing::Linear => self.start + (self.end - self.start) * fraction,
            SweepSpacing::Logarithmic => {
                let low = self.start.log10();
                let high = self.end.log10();
                10f64.powf(low + (high - low) * fraction)
            }
        }
    }

    /// Iterator over the sample values
    pub fn values(&self) -> SweepValues {
        SweepValues { range: *self, index: 0 }
    }
}

/// Iterator over the values of a [`SweepRange`]
#[derive(Debug, Clone)]
pub struct SweepValues {
    range: SweepRange,
    index: usize,
}

impl Iterator for SweepValues {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.range.points {
            return None;
        }
        let value = self.range.value_at(self.index);
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.range.points.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SweepValues {}

// =================================================================================================
// Sweep configuration
// =================================================================================================

/// Default number of samples above which sweeps are evaluated with rayon
///
/// Below that point thread-pool dispatch costs more than the closed-form
/// evaluations it would spread out.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 999;

/// Configuration for a sweep
///
/// Carries the range and the parallel-execution threshold by value, so
/// no global state is consulted during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepConfiguration {
    /// Sampled range of the independent variable
    pub range: SweepRange,
    /// Samples above which the `parallel` feature switches to rayon
    pub parallel_threshold: usize,
}

impl SweepConfiguration {
    /// Create a configuration with the default threshold
    pub fn new(range: SweepRange) -> Self {
        Self { range, parallel_threshold: DEFAULT_PARALLEL_THRESHOLD }
    }

    /// Builder pattern: set the parallel threshold
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.parallel_threshold == 0 {
            return Err(ModelError::range("parallel threshold must be at least 1"));
        }
        self.range.validate()
    }
}

impl From<SweepRange> for SweepConfiguration {
    fn from(range: SweepRange) -> Self {
        Self::new(range)
    }
}
