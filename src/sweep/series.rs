//! Sweep samples and series
//!
//! A [`SweepSeries`] stores the sampled independent variable as a vector
//! and the dependent values as a matrix `values[sample, output]`, one
//! labelled column per output (e.g. `etaD`, `etaI`, `etaG`, `eta0`).

use nalgebra::{DMatrix, DVector};

use crate::error::{ModelError, ModelResult};

/// One point of a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSample {
    /// Independent variable value
    pub x: f64,
    /// Dependent values, in the series' label order
    pub values: Vec<f64>,
}

impl SweepSample {
    /// Create a sample
    pub fn new(x: f64, values: Vec<f64>) -> Self {
        Self { x, values }
    }
}

/// Materialised sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSeries {
    /// Name of the independent variable
    pub variable: String,
    /// Unit of the independent variable
    pub unit: String,
    /// Column labels of `values`
    pub labels: Vec<String>,
    /// Independent variable samples
    pub x: DVector<f64>,
    /// Dependent values, one row per sample
    pub values: DMatrix<f64>,
}

impl SweepSeries {
    /// Assemble a series from samples
    ///
    /// # Errors
    /// Fails when a sample does not carry exactly one value per label.
    pub fn from_samples(
        variable: impl Into<String>,
        unit: impl Into<String>,
        labels: &[&str],
        samples: Vec<SweepSample>,
    ) -> ModelResult<Self> {
        let n_outputs = labels.len();
        let mut values = DMatrix::zeros(samples.len(), n_outputs);
        let mut x = DVector::zeros(samples.len());

        for (row, sample) in samples.iter().enumerate() {
            if sample.values.len() != n_outputs {
                return Err(ModelError::range(format!(
                    "sample {} carries {} values for {} labels",
                    row,
                    sample.values.len(),
                    n_outputs
                )));
            }
            x[row] = sample.x;
            for (col, value) in sample.values.iter().enumerate() {
                values[(row, col)] = *value;
            }
        }

        Ok(Self {
            variable: variable.into(),
            unit: unit.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            x,
            values,
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check emptiness
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Number of dependent outputs
    pub fn outputs(&self) -> usize {
        self.labels.len()
    }

    /// Index of a labelled column
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Copy of a labelled column
    pub fn column(&self, label: &str) -> Option<DVector<f64>> {
        self.column_index(label).map(|i| self.values.column(i).into_owned())
    }

    /// Sample at `index`
    pub fn sample(&self, index: usize) -> Option<SweepSample> {
        if index >= self.len() {
            return None;
        }
        let values = self.values.row(index).iter().copied().collect();
        Some(SweepSample::new(self.x[index], values))
    }

    /// Iterate over the samples in order
    pub fn samples(&self) -> impl Iterator<Item = SweepSample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }

    /// Indices of a uniform downsampling to at most `n_points`
    ///
    /// The first and last samples are always kept.
    pub fn downsample_indices(&self, n_points: usize) -> Vec<usize> {
        let len = self.len();
        if len == 0 {
            return Vec::new();
        }
        if n_points >= len {
            return (0..len).collect();
        }
        if n_points <= 1 {
            return vec![0, len - 1];
        }

        let mut indices: Vec<usize> = (0..n_points)
            .map(|i| (i as f64 * (len - 1) as f64 / (n_points - 1) as f64).round() as usize)
            .collect();
        indices.dedup();
        indices
    }
}
