//! Binning / discretization of continuous features into ordinal bin indices

use crate::error::{PrepError, Result};
use crate::imputation::is_missing;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Bins narrower than this are merged into their left neighbour
const MIN_BIN_WIDTH: f64 = 1e-8;
const EDGE_RTOL: f64 = 1e-5;
const EDGE_ATOL: f64 = 1e-8;
const KMEANS_MAX_ITER: usize = 100;

/// Strategy for creating bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinningStrategy {
    /// Equal-width bins
    Uniform,
    /// Equal-frequency bins (quantiles)
    #[default]
    Quantile,
    /// Bins around 1-D k-means centroids
    KMeans,
}

impl BinningStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinningStrategy::Uniform => "uniform",
            BinningStrategy::Quantile => "quantile",
            BinningStrategy::KMeans => "kmeans",
        }
    }
}

impl FromStr for BinningStrategy {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(BinningStrategy::Uniform),
            "quantile" => Ok(BinningStrategy::Quantile),
            "kmeans" => Ok(BinningStrategy::KMeans),
            other => Err(PrepError::InvalidConfiguration {
                adapter: "Discretizer",
                name: other.to_string(),
            }),
        }
    }
}

/// Linear-interpolated percentile of sorted values, `q` in `[0, 100]`
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { end } else { start + i as f64 * step })
        .collect()
}

/// Feature binner with ordinal output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KBinsDiscretizer {
    n_bins: usize,
    strategy: BinningStrategy,
    /// Edges per column, `n_bins_j + 1` values each
    bin_edges: Option<Vec<Vec<f64>>>,
}

impl KBinsDiscretizer {
    /// Create a new binner
    pub fn new(n_bins: usize, strategy: BinningStrategy) -> Self {
        Self {
            n_bins,
            strategy,
            bin_edges: None,
        }
    }

    pub fn strategy(&self) -> BinningStrategy {
        self.strategy
    }

    /// Fitted edges per column
    pub fn bin_edges(&self) -> Option<&[Vec<f64>]> {
        self.bin_edges.as_deref()
    }

    /// Effective number of bins per column after merging narrow bins
    pub fn n_bins_per_feature(&self) -> Option<Vec<usize>> {
        self.bin_edges
            .as_ref()
            .map(|edges| edges.iter().map(|e| e.len().saturating_sub(1)).collect())
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if self.n_bins < 2 {
            return Err(PrepError::InvalidParameter {
                name: "n_bins".to_string(),
                value: self.n_bins.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }

        let mut all_edges = Vec::with_capacity(x.ncols());
        for (j, col) in x.columns().into_iter().enumerate() {
            let mut values: Vec<f64> = col.iter().copied().filter(|v| !is_missing(*v)).collect();
            values.sort_by(f64::total_cmp);
            all_edges.push(self.compute_bin_edges(j, &values));
        }

        self.bin_edges = Some(all_edges);
        Ok(self)
    }

    /// Compute bin edges based on strategy
    fn compute_bin_edges(&self, feature: usize, sorted: &[f64]) -> Vec<f64> {
        let (Some(&min_val), Some(&max_val)) = (sorted.first(), sorted.last()) else {
            tracing::warn!(feature, "Feature has no observed value; using a single bin");
            return vec![0.0, 0.0];
        };
        // Two edges leave no inner edge, so every value lands in bin 0
        if min_val == max_val {
            tracing::warn!(feature, "Feature is constant; using a single bin");
            return vec![min_val, max_val];
        }

        let edges = match self.strategy {
            BinningStrategy::Uniform => return linspace(min_val, max_val, self.n_bins + 1),
            BinningStrategy::Quantile => linspace(0.0, 100.0, self.n_bins + 1)
                .into_iter()
                .map(|q| percentile(sorted, q))
                .collect(),
            BinningStrategy::KMeans => self.kmeans_bin_edges(sorted, min_val, max_val),
        };

        let mut merged: Vec<f64> = Vec::with_capacity(edges.len());
        for e in edges {
            match merged.last() {
                Some(&last) if e - last <= MIN_BIN_WIDTH => {}
                _ => merged.push(e),
            }
        }
        if merged.len() - 1 != self.n_bins {
            tracing::warn!(
                feature,
                n_bins = merged.len() - 1,
                "Bins whose width is too small were removed"
            );
        }
        merged
    }

    /// K-means based bin edge computation
    fn kmeans_bin_edges(&self, values: &[f64], min_val: f64, max_val: f64) -> Vec<f64> {
        // Initialize centroids at the centres of uniform bins
        let uniform = linspace(min_val, max_val, self.n_bins + 1);
        let mut centroids: Vec<f64> = uniform.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();

        for _ in 0..KMEANS_MAX_ITER {
            let mut sums = vec![0.0f64; self.n_bins];
            let mut counts = vec![0usize; self.n_bins];

            for &v in values {
                let mut nearest = 0;
                for (i, c) in centroids.iter().enumerate() {
                    if (v - c).abs() < (v - centroids[nearest]).abs() {
                        nearest = i;
                    }
                }
                sums[nearest] += v;
                counts[nearest] += 1;
            }

            let mut converged = true;
            for i in 0..self.n_bins {
                if counts[i] > 0 {
                    let new_centroid = sums[i] / counts[i] as f64;
                    if (new_centroid - centroids[i]).abs() > 1e-6 {
                        converged = false;
                    }
                    centroids[i] = new_centroid;
                }
            }

            if converged {
                break;
            }
        }

        // Edges are midpoints between sorted centroids
        centroids.sort_by(f64::total_cmp);
        let mut edges = vec![min_val];
        edges.extend(centroids.windows(2).map(|w| (w[0] + w[1]) / 2.0));
        edges.push(max_val);
        edges
    }

    /// Bin index of a value: right-side search over the inner edges
    fn find_bin(value: f64, edges: &[f64]) -> f64 {
        let inner = &edges[1..edges.len() - 1];
        let shifted = value + EDGE_ATOL + EDGE_RTOL * value.abs();
        let idx = inner.partition_point(|&e| e <= shifted);
        idx.min(edges.len() - 2) as f64
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let bin_edges = self.bin_edges.as_ref().ok_or(PrepError::NotFitted {
            adapter: "KBinsDiscretizer",
        })?;
        if x.ncols() != bin_edges.len() {
            return Err(PrepError::feature_count(bin_edges.len(), x.ncols()));
        }

        let mut result = x.clone();
        for (mut col, edges) in result.columns_mut().into_iter().zip(bin_edges.iter()) {
            col.mapv_inplace(|v| if is_missing(v) { v } else { Self::find_bin(v, edges) });
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
