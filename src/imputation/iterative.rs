//! Iterative (round-robin regression) imputation

use crate::error::{PrepError, Result};
use crate::imputation::{is_missing, select_columns, Imputer, InitialStrategy, SimpleImputer};
use crate::training::{Estimator, RidgeRegression};
use crate::utils::submatrix;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Floor applied to absolute correlations so every feature stays sampleable
const MIN_CORRELATION: f64 = 1e-6;

/// Ridge penalty of the per-feature regressions
const RIDGE_ALPHA: f64 = 1e-3;

/// One fitted regression of the imputation sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImputationStep {
    /// Column being imputed
    feature: usize,
    /// Columns used as predictors
    neighbors: Vec<usize>,
    model: RidgeRegression,
}

/// Iterative imputer (round-robin MICE-style regression).
///
/// Starts from a [`SimpleImputer`] fill, then repeatedly regresses every
/// feature on (a sample of) the others with ridge regression and overwrites
/// its missing entries with the prediction. Predictions are not clipped.
/// Features complete at fit time still get a model, so `transform` can fill
/// them on new rows; every fitted regression is recorded and replayed there.
///
/// Rounds stop once the largest row-wise absolute change drops below
/// `tol * max|X|`. A single kept feature, or data without missing values,
/// keeps the initial fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeImputer {
    initial_strategy: InitialStrategy,
    max_iter: usize,
    tol: f64,
    n_nearest_features: Option<usize>,
    random_state: u64,
    initial: Option<SimpleImputer>,
    steps: Vec<ImputationStep>,
    n_iter: usize,
    n_features_in: usize,
}

impl IterativeImputer {
    /// Create new iterative imputer
    pub fn new(initial_strategy: InitialStrategy) -> Self {
        Self {
            initial_strategy,
            max_iter: 10,
            tol: 1e-3,
            n_nearest_features: None,
            random_state: 0,
            initial: None,
            steps: Vec::new(),
            n_iter: 0,
            n_features_in: 0,
        }
    }

    /// Set max iterations
    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = n.max(1);
        self
    }

    /// Set tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol.max(0.0);
        self
    }

    /// Limit each regression to `n` predictor features (`None` uses all)
    pub fn with_n_nearest_features(mut self, n: Option<usize>) -> Self {
        self.n_nearest_features = n;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn initial_strategy(&self) -> InitialStrategy {
        self.initial_strategy
    }

    /// Rounds actually run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Absolute Pearson correlation between columns, floored and with a zero diagonal
    fn abs_correlation(data: &Array2<f64>) -> Array2<f64> {
        let n_features = data.ncols();
        let n = data.nrows().max(1) as f64;
        let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
        let centered = data - &means.view().insert_axis(Axis(0));
        let cov = centered.t().dot(&centered) / n;

        let mut corr = Array2::<f64>::zeros((n_features, n_features));
        for i in 0..n_features {
            for j in 0..n_features {
                if i == j {
                    continue;
                }
                let denom = (cov[[i, i]] * cov[[j, j]]).sqrt();
                let r = if denom > 0.0 { (cov[[i, j]] / denom).abs() } else { f64::NAN };
                corr[[i, j]] = if r.is_finite() { r.max(MIN_CORRELATION) } else { MIN_CORRELATION };
            }
        }
        corr
    }

    /// Predictor columns for `feature`
    fn choose_neighbors(
        &self,
        feature: usize,
        n_features: usize,
        abs_corr: Option<&Array2<f64>>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        let candidates: Vec<usize> = (0..n_features).filter(|&j| j != feature).collect();
        match (self.n_nearest_features, abs_corr) {
            (Some(k), Some(corr)) if k < candidates.len() => {
                let sampled = candidates
                    .choose_multiple_weighted(rng, k, |&j| corr[[feature, j]])
                    .map_err(|e| PrepError::ComputationError(format!("Neighbour sampling failed: {}", e)))?;
                Ok(sampled.copied().collect())
            }
            _ => Ok(candidates),
        }
    }

    /// Fit `feature` on the rows where it was observed and fill the others
    fn impute_feature(
        &self,
        data: &mut Array2<f64>,
        observed_rows: &[usize],
        missing_rows: &[usize],
        feature: usize,
        neighbors: Vec<usize>,
    ) -> Result<ImputationStep> {
        let x_train = submatrix(data, observed_rows, &neighbors);
        let y_train = Array1::from_iter(observed_rows.iter().map(|&i| data[[i, feature]]));

        let mut model = RidgeRegression::new(RIDGE_ALPHA);
        model.fit(&x_train, &y_train)?;

        let step = ImputationStep {
            feature,
            neighbors,
            model,
        };
        Self::apply_step(data, &step, missing_rows)?;
        Ok(step)
    }

    fn apply_step(data: &mut Array2<f64>, step: &ImputationStep, rows: &[usize]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let x_missing = submatrix(data, rows, &step.neighbors);
        let predictions = step.model.predict(&x_missing)?;
        for (&row, &pred) in rows.iter().zip(predictions.iter()) {
            data[[row, step.feature]] = pred;
        }
        Ok(())
    }
}

impl Default for IterativeImputer {
    fn default() -> Self {
        Self::new(InitialStrategy::Mean)
    }
}

/// Per column, the rows where `x` is missing
fn missing_rows_by_column(x: &Array2<f64>) -> Vec<Vec<usize>> {
    x.columns()
        .into_iter()
        .map(|col| {
            col.iter()
                .enumerate()
                .filter(|(_, &v)| is_missing(v))
                .map(|(i, _)| i)
                .collect()
        })
        .collect()
}

impl Imputer for IterativeImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.initial = None;
        self.steps.clear();

        if self.initial_strategy == InitialStrategy::MostFrequent {
            tracing::warn!(
                "Iterative imputation with most_frequent initial fill predicts continuous values, \
                 not original categories"
            );
        }

        let mut initial = SimpleImputer::new(self.initial_strategy);
        initial.fit(x)?;
        let raw = select_columns(x, initial.kept_columns());
        let mut data = initial.transform(x)?;
        let n_features = data.ncols();

        let missing = missing_rows_by_column(&raw);
        let has_missing = missing.iter().any(|rows| !rows.is_empty());

        // Every feature, ascending missing count, stable on column index
        let mut order: Vec<usize> = if n_features > 1 && has_missing {
            (0..n_features).collect()
        } else {
            Vec::new()
        };
        order.sort_by_key(|&j| missing[j].len());

        let observed: Vec<Vec<usize>> = missing
            .iter()
            .map(|rows| (0..raw.nrows()).filter(|i| rows.binary_search(i).is_err()).collect())
            .collect();

        let abs_corr = match self.n_nearest_features {
            Some(k) if k + 1 < n_features => Some(Self::abs_correlation(&data)),
            _ => None,
        };

        let max_observed = raw
            .iter()
            .filter(|v| !is_missing(**v))
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        let normalized_tol = self.tol * max_observed;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut steps = Vec::new();
        let mut n_iter = 0;

        if !order.is_empty() {
            for round in 0..self.max_iter {
                let previous = data.clone();
                for &feature in &order {
                    let neighbors = self.choose_neighbors(feature, n_features, abs_corr.as_ref(), &mut rng)?;
                    let step = self.impute_feature(&mut data, &observed[feature], &missing[feature], feature, neighbors)?;
                    steps.push(step);
                }
                n_iter = round + 1;

                let change = (&data - &previous)
                    .rows()
                    .into_iter()
                    .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
                    .fold(0.0f64, f64::max);
                tracing::trace!(round = n_iter, change, normalized_tol, "Iterative imputation round");
                if change < normalized_tol {
                    tracing::debug!(rounds = n_iter, "Iterative imputation converged");
                    break;
                }
            }
            if n_iter == self.max_iter {
                tracing::debug!(max_iter = self.max_iter, "Iterative imputation stopped at max_iter");
            }
        }

        self.initial = Some(initial);
        self.steps = steps;
        self.n_iter = n_iter;
        self.n_features_in = x.ncols();
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let initial = self.initial.as_ref().ok_or(PrepError::NotFitted {
            adapter: "IterativeImputer",
        })?;
        if x.ncols() != self.n_features_in {
            return Err(PrepError::feature_count(self.n_features_in, x.ncols()));
        }

        let missing = missing_rows_by_column(&select_columns(x, initial.kept_columns()));
        let mut data = initial.transform(x)?;

        for step in &self.steps {
            Self::apply_step(&mut data, step, &missing[step.feature])?;
        }

        Ok(data)
    }
}
