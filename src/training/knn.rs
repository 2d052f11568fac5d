//! K-Nearest Neighbors probe models
//!
//! Brute-force euclidean KNN with uniform weights. Neighbour ties are broken
//! by training row order.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{PrepError, Result};
use crate::training::{check_target_len, unique_classes, Estimator, TaskType};

/// Stored training set shared by both KNN models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrainingSet {
    x: Option<Array2<f64>>,
    y: Option<Array1<f64>>,
}

impl TrainingSet {
    fn store(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_target_len(x, y)?;
        if x.nrows() == 0 {
            return Err(PrepError::DataError(
                "KNN needs at least one training sample".to_string(),
            ));
        }
        self.x = Some(x.clone());
        self.y = Some(y.clone());
        Ok(())
    }

    fn get(&self, adapter: &'static str) -> Result<(&Array2<f64>, &Array1<f64>)> {
        match (&self.x, &self.y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(PrepError::NotFitted { adapter }),
        }
    }
}

fn squared_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Target values of the `k` training rows nearest to `row`
fn find_k_nearest(row: ArrayView1<f64>, x_train: &Array2<f64>, y_train: &Array1<f64>, k: usize) -> Vec<f64> {
    let mut distances: Vec<(f64, usize)> = x_train
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, train_row)| (squared_euclidean(row, train_row), i))
        .collect();

    let k = k.min(distances.len());
    distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));

    distances[..k].iter().map(|&(_, i)| y_train[i]).collect()
}

/// Majority vote; ties resolve to the smallest label
fn vote_classify(neighbors: &[f64], classes: &[f64]) -> f64 {
    let mut best_label = f64::NAN;
    let mut best_count = 0usize;
    for &class in classes {
        let count = neighbors.iter().filter(|&&v| v == class).count();
        if count > best_count {
            best_count = count;
            best_label = class;
        }
    }
    best_label
}

fn check_width(x: &Array2<f64>, x_train: &Array2<f64>) -> Result<()> {
    if x.ncols() != x_train.ncols() {
        return Err(PrepError::feature_count(x_train.ncols(), x.ncols()));
    }
    Ok(())
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    n_neighbors: usize,
    train: TrainingSet,
    classes: Vec<f64>,
}

impl KNNClassifier {
    /// Create a classifier voting over `k` neighbours
    pub fn with_k(k: usize) -> Self {
        Self {
            n_neighbors: k.max(1),
            train: TrainingSet::default(),
            classes: Vec::new(),
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }
}

impl Default for KNNClassifier {
    fn default() -> Self {
        Self::with_k(5)
    }
}

impl Estimator for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.train.store(x, y)?;
        self.classes = unique_classes(y);
        Ok(())
    }

    /// Predict class labels (parallelized over test samples)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = self.train.get("KNNClassifier")?;
        check_width(x, x_train)?;
        let k = self.n_neighbors;
        let classes = &self.classes;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k);
                vote_classify(&neighbors, classes)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    n_neighbors: usize,
    train: TrainingSet,
}

impl KNNRegressor {
    /// Create a regressor averaging over `k` neighbours
    pub fn with_k(k: usize) -> Self {
        Self {
            n_neighbors: k.max(1),
            train: TrainingSet::default(),
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }
}

impl Default for KNNRegressor {
    fn default() -> Self {
        Self::with_k(5)
    }
}

impl Estimator for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.train.store(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = self.train.get("KNNRegressor")?;
        check_width(x, x_train)?;
        let k = self.n_neighbors;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k);
                neighbors.iter().sum::<f64>() / neighbors.len() as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_classifier() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [0.2, 0.0], [5.0, 5.0], [5.1, 5.2], [4.9, 5.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let pred = knn.predict(&array![[0.05, 0.05], [5.0, 5.1]]).unwrap();
        assert_eq!(pred, array![0.0, 1.0]);
    }

    #[test]
    fn test_vote_tie_goes_to_smallest_label() {
        assert_eq!(vote_classify(&[2.0, 1.0], &[1.0, 2.0]), 1.0);
    }

    #[test]
    fn test_knn_regressor_mean_of_neighbors() {
        let x = array![[0.0], [1.0], [2.0], [10.0]];
        let y = array![0.0, 1.0, 2.0, 10.0];

        let mut knn = KNNRegressor::with_k(2);
        knn.fit(&x, &y).unwrap();
        let pred = knn.predict(&array![[0.4]]).unwrap();
        assert!((pred[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut knn = KNNRegressor::with_k(10);
        knn.fit(&array![[0.0], [2.0]], &array![1.0, 3.0]).unwrap();
        assert_eq!(knn.predict(&array![[5.0]]).unwrap(), array![2.0]);
    }

    #[test]
    fn test_predict_unfitted() {
        let knn = KNNClassifier::default();
        assert!(matches!(
            knn.predict(&array![[1.0]]),
            Err(PrepError::NotFitted { adapter: "KNNClassifier" })
        ));
    }
}
