//! KNN-based imputation

use crate::error::{PrepError, Result};
use crate::imputation::{is_missing, observed_columns, select_columns, Imputer, InitialStrategy};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered float for priority queue
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max heap by distance; later rows lose ties so earlier donors are kept
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// KNN-based imputer.
///
/// Every fit row is a potential donor for a feature as long as it observes
/// that feature. Distances ignore coordinates missing in either row and are
/// rescaled by the fraction of coordinates present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNImputer {
    /// Number of neighbors
    n_neighbors: usize,
    /// Fit data restricted to kept columns
    #[serde(with = "crate::utils::nan_array")]
    fit_data: Option<Array2<f64>>,
    /// Feature means for fallback
    feature_means: Option<Array1<f64>>,
    kept_columns: Vec<usize>,
    n_features_in: usize,
}

impl KNNImputer {
    /// Create new KNN imputer with uniform weights
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            fit_data: None,
            feature_means: None,
            kept_columns: Vec::new(),
            n_features_in: 0,
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Distance between two samples ignoring NaN positions.
    /// Returns infinity when no coordinate is observed in both.
    fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let n_features = a.len();
        let mut present = 0usize;
        let mut accum = 0.0f64;

        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            present += 1;
            let d = ai - bi;
            accum += d * d;
        }

        if present == 0 {
            return f64::INFINITY;
        }

        (accum * n_features as f64 / present as f64).sqrt()
    }

    /// Uniform mean of the `k` nearest donors observing `feature_idx`
    fn impute_value(&self, data: &Array2<f64>, distances: &[f64], feature_idx: usize) -> f64 {
        let k = self.n_neighbors;
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(k + 1);

        for (donor, &dist) in distances.iter().enumerate() {
            if !dist.is_finite() || is_missing(data[[donor, feature_idx]]) {
                continue;
            }
            let candidate = DistanceIdx(dist, donor);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(top) = heap.peek() {
                if candidate < *top {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        if heap.is_empty() {
            return self
                .feature_means
                .as_ref()
                .map(|m| m[feature_idx])
                .unwrap_or(f64::NAN);
        }

        let n = heap.len() as f64;
        heap.into_iter()
            .map(|DistanceIdx(_, donor)| data[[donor, feature_idx]])
            .sum::<f64>()
            / n
    }
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Imputer for KNNImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PrepError::DataError(
                "KNN imputation needs at least one sample".to_string(),
            ));
        }

        let kept = observed_columns(x);
        let data = select_columns(x, &kept);

        let feature_means = Array1::from_iter(
            data.columns()
                .into_iter()
                .map(|col| InitialStrategy::Mean.compute(col).unwrap_or(f64::NAN)),
        );

        self.fit_data = Some(data);
        self.feature_means = Some(feature_means);
        self.kept_columns = kept;
        self.n_features_in = x.ncols();

        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let data = self.fit_data.as_ref().ok_or(PrepError::NotFitted {
            adapter: "KNNImputer",
        })?;
        if x.ncols() != self.n_features_in {
            return Err(PrepError::feature_count(self.n_features_in, x.ncols()));
        }

        let x = select_columns(x, &self.kept_columns);
        let mut result = x.clone();

        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }

            let distances: Vec<f64> = data
                .rows()
                .into_iter()
                .map(|donor| Self::nan_euclidean(row, donor))
                .collect();

            for (j, &v) in row.iter().enumerate() {
                if is_missing(v) {
                    result[[row_idx, j]] = self.impute_value(data, &distances, j);
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_imputer_basic() {
        let data = Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0, 10.0,
                2.0, 20.0,
                3.0, 30.0,
                4.0, 40.0,
                f64::NAN, 25.0, // Missing first feature
                2.5, f64::NAN, // Missing second feature
            ],
        )
        .unwrap();

        let mut imputer = KNNImputer::new(3);
        let result = imputer.fit_transform(&data).unwrap();

        assert!(!result.iter().any(|&v| v.is_nan()));
        assert!(result[[4, 0]] >= 1.0 && result[[4, 0]] <= 4.0);
        assert!(result[[5, 1]] >= 10.0 && result[[5, 1]] <= 40.0);
    }

    #[test]
    fn test_knn_uses_nearest_donors() {
        let data = array![
            [0.0, 0.0],
            [1.0, 10.0],
            [2.0, 20.0],
            [100.0, 1000.0],
            [1.5, f64::NAN],
        ];

        let mut imputer = KNNImputer::new(2);
        let result = imputer.fit_transform(&data).unwrap();

        // Nearest donors are rows 1 and 2
        assert!((result[[4, 1]] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_knn_falls_back_to_mean() {
        let data = array![[1.0, f64::NAN], [f64::NAN, 4.0], [f64::NAN, 8.0]];
        let mut imputer = KNNImputer::new(2);
        imputer.fit(&data).unwrap();

        // Row shares no observed coordinate with any donor of feature 1
        let probe = array![[5.0, f64::NAN]];
        let result = imputer.transform(&probe).unwrap();
        assert!((result[[0, 1]] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_euclidean_rescales() {
        let a = array![1.0, f64::NAN, 3.0];
        let b = array![1.0, 2.0, 5.0];
        let d = KNNImputer::nan_euclidean(a.view(), b.view());
        assert!((d - (4.0f64 * 3.0 / 2.0).sqrt()).abs() < 1e-12);
    }
}
