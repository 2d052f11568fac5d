//! Probe models and model evaluation
//!
//! Small supervised models used as scoring probes by sequential feature
//! selection and as the per-feature regressor of iterative imputation:
//! - Linear models (OLS, Ridge, multinomial Logistic)
//! - K-Nearest Neighbors (regressor and classifier)
//! - Depth-limited decision tree classifier
//! - K-fold / stratified K-fold cross-validation

pub mod cross_validation;
pub mod decision_tree;
pub mod knn;
pub mod linear_models;

pub use cross_validation::{cross_val_score, CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::DecisionTreeClassifier;
pub use knn::{KNNClassifier, KNNRegressor};
pub use linear_models::{LinearRegression, LogisticRegression, RidgeRegression};

use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Kind of supervised task a model solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Regression,
    Classification,
}

/// Common interface of the probe models
pub trait Estimator: Send + Sync {
    /// Fit the model on a design matrix and target
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict targets (or class labels)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn task(&self) -> TaskType;

    /// Default score: R² for regressors, accuracy for classifiers
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        Ok(match self.task() {
            TaskType::Regression => r2_score(y, &y_pred),
            TaskType::Classification => accuracy(y, &y_pred),
        })
    }
}

/// Coefficient of determination.
/// A constant target scores 1.0 on a perfect fit and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let y_mean = y_true.mean().unwrap_or(0.0);
    let ss_res = (y_pred - y_true).mapv(|v| v * v).sum();
    let ss_tot = y_true.mapv(|v| (v - y_mean) * (v - y_mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}

/// Fraction of exactly matching labels
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Sorted distinct class labels of a target vector
pub(crate) fn unique_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    classes
}

pub(crate) fn check_target_len(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PrepError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    Ok(())
}
