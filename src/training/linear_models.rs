//! Linear model implementations

use crate::error::{PrepError, Result};
use crate::training::{check_target_len, unique_classes, Estimator, TaskType};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a small ridge if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    if let Some(x) = cholesky_solve_inner(a, b) {
        return Some(x);
    }

    let mut a_reg = a.clone();
    let ridge = 1e-8 * (a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64).max(1e-12);
    for k in 0..n {
        a_reg[[k, k]] += ridge;
    }
    cholesky_solve_inner(&a_reg, b)
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan solve with partial pivoting (fallback for indefinite systems).
/// Pivots below `1e-10` are treated as zero and their unknowns set to 0.
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    let mut pivot_cols = vec![false; n];
    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if aug[[max_row, col]].abs() < 1e-10 {
            continue;
        }
        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..=n {
                        aug[[row, j]] -= factor * aug[[col, j]];
                    }
                }
            }
        }
        pivot_cols[col] = true;
    }

    Array1::from_iter((0..n).map(|i| if pivot_cols[i] { aug[[i, n]] } else { 0.0 }))
}

/// Solve `(X^T X + alpha I) w = X^T y` on centered data
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Array1<f64> {
    let mut xtx = x.t().dot(x);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += alpha;
    }
    let xty = x.t().dot(y);

    cholesky_solve(&xtx, &xty).unwrap_or_else(|| gauss_jordan_solve(&xtx, &xty))
}

/// Fit an intercept-carrying linear model with L2 penalty `alpha`
fn fit_linear(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<(Array1<f64>, f64)> {
    check_target_len(x, y)?;
    if x.nrows() == 0 {
        return Err(PrepError::DataError(
            "Cannot fit a linear model on zero samples".to_string(),
        ));
    }

    let y_mean = y.mean().unwrap_or(0.0);
    if x.ncols() == 0 {
        return Ok((Array1::zeros(0), y_mean));
    }

    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PrepError::ComputationError("Failed to compute means".to_string()))?;
    let x_centered = x - &x_mean.view().insert_axis(Axis(0));
    let y_centered = y - y_mean;

    let coefficients = solve_normal_equations(&x_centered, &y_centered, alpha);
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(PrepError::ComputationError(
            "Linear solve produced non-finite coefficients".to_string(),
        ));
    }
    let intercept = y_mean - coefficients.dot(&x_mean);

    Ok((coefficients, intercept))
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let (coefficients, intercept) = fit_linear(x, y, 0.0)?;
        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PrepError::NotFitted {
            adapter: "LinearRegression",
        })?;
        predict_linear(x, coefficients, self.intercept)
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }
}

/// Ridge Regression (L2-regularized linear regression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    /// L2 regularization strength
    alpha: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.max(0.0),
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Estimator for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let (coefficients, intercept) = fit_linear(x, y, self.alpha)?;
        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PrepError::NotFitted {
            adapter: "RidgeRegression",
        })?;
        predict_linear(x, coefficients, self.intercept)
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }
}

fn predict_linear(x: &Array2<f64>, coefficients: &Array1<f64>, intercept: f64) -> Result<Array1<f64>> {
    if x.ncols() != coefficients.len() {
        return Err(PrepError::feature_count(coefficients.len(), x.ncols()));
    }
    if coefficients.is_empty() {
        return Ok(Array1::from_elem(x.nrows(), intercept));
    }
    Ok(x.dot(coefficients) + intercept)
}

/// Multinomial logistic regression with an L2 penalty (`C = 1`),
/// trained by full-batch gradient descent on standardized inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    c: f64,
    max_iter: usize,
    tol: f64,
    learning_rate: f64,
    classes: Vec<f64>,
    /// (n_features, n_classes)
    weights: Option<Array2<f64>>,
    bias: Option<Array1<f64>>,
    feature_means: Option<Array1<f64>>,
    feature_scales: Option<Array1<f64>>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 500,
            tol: 1e-6,
            learning_rate: 0.5,
            classes: Vec::new(),
            weights: None,
            bias: None,
            feature_means: None,
            feature_scales: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn standardize(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (means, scales) = match (&self.feature_means, &self.feature_scales) {
            (Some(m), Some(s)) => (m, s),
            _ => {
                return Err(PrepError::NotFitted {
                    adapter: "LogisticRegression",
                })
            }
        };
        if x.ncols() != means.len() {
            return Err(PrepError::feature_count(means.len(), x.ncols()));
        }
        Ok((x - &means.view().insert_axis(Axis(0))) / &scales.view().insert_axis(Axis(0)))
    }

    /// Row-wise softmax, in place
    fn softmax(logits: &mut Array2<f64>) {
        for mut row in logits.rows_mut() {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
    }

    /// Class probabilities, columns ordered as [`Self::classes`]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let xs = self.standardize(x)?;
        let (weights, bias) = match (&self.weights, &self.bias) {
            (Some(w), Some(b)) => (w, b),
            _ => {
                return Err(PrepError::NotFitted {
                    adapter: "LogisticRegression",
                })
            }
        };
        let mut logits = xs.dot(weights) + &bias.view().insert_axis(Axis(0));
        Self::softmax(&mut logits);
        Ok(logits)
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_target_len(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 {
            return Err(PrepError::DataError(
                "Cannot fit logistic regression on zero samples".to_string(),
            ));
        }

        let classes = unique_classes(y);
        let n_classes = classes.len();

        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let scales = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 0.0 { s } else { 1.0 });
        self.feature_means = Some(means);
        self.feature_scales = Some(scales);
        let xs = self.standardize(x)?;

        // One-hot targets
        let mut targets = Array2::<f64>::zeros((n_samples, n_classes));
        for (i, &label) in y.iter().enumerate() {
            if let Ok(k) = classes.binary_search_by(|c| c.total_cmp(&label)) {
                targets[[i, k]] = 1.0;
            }
        }

        let mut weights = Array2::<f64>::zeros((n_features, n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);

        if n_classes > 1 {
            let penalty = 1.0 / (self.c * n_samples as f64);
            let lr = self.learning_rate;

            for _iter in 0..self.max_iter {
                let mut proba = xs.dot(&weights) + &bias.view().insert_axis(Axis(0));
                Self::softmax(&mut proba);

                let errors = &proba - &targets;
                let dw = xs.t().dot(&errors) / n_samples as f64 + &weights * penalty;
                let db = errors
                    .mean_axis(Axis(0))
                    .unwrap_or_else(|| Array1::zeros(n_classes));

                let grad_norm = (dw.mapv(|v| v * v).sum() + db.mapv(|v| v * v).sum()).sqrt();
                if grad_norm < self.tol {
                    break;
                }

                weights = weights - dw * lr;
                bias = bias - db * lr;
            }
        }

        self.classes = classes;
        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(Array1::from_iter(proba.rows().into_iter().map(|row| {
            let mut best = 0;
            for (k, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = k;
                }
            }
            self.classes.get(best).copied().unwrap_or(f64::NAN)
        })))
    }

    fn task(&self) -> TaskType {
        TaskType::Classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_exact() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 3.0]];
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| -1.0 * v) + 3.0;

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!((coef[1] + 1.0).abs() < 1e-8);
        assert!((model.intercept() - 3.0).abs() < 1e-8);
        assert!((model.score(&x, &y).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_linear_regression_collinear_does_not_fail() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_ridge_shrinks_towards_mean() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];

        let mut ols = RidgeRegression::new(0.0);
        let mut ridge = RidgeRegression::new(100.0);
        ols.fit(&x, &y).unwrap();
        ridge.fit(&x, &y).unwrap();

        let probe = array![[10.0]];
        let p_ols = ols.predict(&probe).unwrap()[0];
        let p_ridge = ridge.predict(&probe).unwrap()[0];
        assert!((p_ols - 10.0).abs() < 1e-8);
        assert!(p_ridge < p_ols);
    }

    #[test]
    fn test_ridge_without_features_predicts_mean() {
        let x = Array2::<f64>::zeros((3, 0));
        let y = array![1.0, 2.0, 6.0];
        let mut ridge = RidgeRegression::default();
        ridge.fit(&x, &y).unwrap();
        assert_eq!(ridge.predict(&x).unwrap(), array![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_logistic_separable() {
        let x = array![
            [1.0, 1.0], [1.5, 1.2], [2.0, 1.8], [1.2, 2.0],
            [8.0, 8.0], [8.5, 9.0], [9.0, 8.2], [9.5, 9.5],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.score(&x, &y).unwrap(), 1.0);

        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_logistic_multiclass() {
        let x = array![[0.0], [0.2], [5.0], [5.2], [10.0], [10.2]];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut model = LogisticRegression::new().with_max_iter(2000);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.classes(), &[0.0, 1.0, 2.0]);
        let pred = model.predict(&array![[0.1], [10.1]]).unwrap();
        assert_eq!(pred, array![0.0, 2.0]);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PrepError::NotFitted { .. })
        ));
    }
}
