//! Missing value imputation estimators
//!
//! Provides the imputation capabilities behind the `Imputer` adapter:
//! - Simple (column statistic) imputation
//! - KNN imputation
//! - Iterative (round-robin regression) imputation
//!
//! Missing values are encoded as `f64::NAN`.

mod iterative;
mod knn;
mod simple;

pub use iterative::IterativeImputer;
pub use knn::KNNImputer;
pub use simple::SimpleImputer;

use crate::error::Result;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column statistic used to fill (or initially fill) missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InitialStrategy {
    /// Mean of the observed values
    Mean,
    /// Lower median of the observed values
    Median,
    /// Most frequent observed value (smallest on ties)
    MostFrequent,
}

impl InitialStrategy {
    /// Compute the statistic over the observed entries of a column.
    /// Returns `None` when the column has no observed value.
    pub fn compute(&self, column: ArrayView1<f64>) -> Option<f64> {
        let mut observed: Vec<f64> = column.iter().copied().filter(|v| !is_missing(*v)).collect();
        if observed.is_empty() {
            return None;
        }

        let value = match self {
            InitialStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
            InitialStrategy::Median => {
                observed.sort_by(f64::total_cmp);
                observed[(observed.len() - 1) / 2]
            }
            InitialStrategy::MostFrequent => {
                let mut counts: HashMap<u64, usize> = HashMap::new();
                for v in &observed {
                    *counts.entry(canonical_bits(*v)).or_insert(0) += 1;
                }
                observed.sort_by(f64::total_cmp);
                // First (smallest) value reaching the max count wins
                let max_count = counts.values().copied().max().unwrap_or(0);
                observed
                    .iter()
                    .copied()
                    .find(|v| counts.get(&canonical_bits(*v)) == Some(&max_count))
                    .unwrap_or(observed[0])
            }
        };

        Some(value)
    }
}

/// Trait for imputers
pub trait Imputer: Send + Sync {
    /// Fit the imputer on data with missing values
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Transform data by imputing missing values
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Bit pattern with `-0.0` folded into `0.0`, usable as a hash key
#[inline]
pub(crate) fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Indices of columns holding at least one observed value.
/// Fully missing columns are logged and dropped by every imputer.
pub(crate) fn observed_columns(x: &Array2<f64>) -> Vec<usize> {
    let mut keep = Vec::with_capacity(x.ncols());
    for (j, col) in x.axis_iter(Axis(1)).enumerate() {
        if col.iter().any(|v| !is_missing(*v)) {
            keep.push(j);
        } else {
            tracing::warn!(feature = j, "Skipping feature without any observed value");
        }
    }
    keep
}

/// Keep only the given columns, in order
pub(crate) fn select_columns(x: &Array2<f64>, columns: &[usize]) -> Array2<f64> {
    if columns.len() == x.ncols() {
        return x.clone();
    }
    crate::utils::take_columns(x, columns)
}
