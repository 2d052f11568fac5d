//! Greedy sequential feature selection scored by cross-validation

use crate::error::{PrepError, Result};
use crate::feature_selection::{check_target, take_columns};
use crate::training::{
    cross_val_score, CVStrategy, CrossValidator, DecisionTreeClassifier, Estimator, KNNClassifier,
    KNNRegressor, LinearRegression, LogisticRegression, TaskType,
};
use crate::utils::{self, mask_indices};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Search direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Start empty, add one feature per step
    Forward,
    /// Start full, remove one feature per step
    Backward,
}

/// Model whose cross-validated score drives the search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProbeModel {
    LinearRegression(LinearRegression),
    KnnRegressor(KNNRegressor),
    KnnClassifier(KNNClassifier),
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTreeClassifier),
}

impl ProbeModel {
    fn as_estimator(&self) -> &dyn Estimator {
        match self {
            ProbeModel::LinearRegression(m) => m,
            ProbeModel::KnnRegressor(m) => m,
            ProbeModel::KnnClassifier(m) => m,
            ProbeModel::LogisticRegression(m) => m,
            ProbeModel::DecisionTree(m) => m,
        }
    }

    fn as_estimator_mut(&mut self) -> &mut dyn Estimator {
        match self {
            ProbeModel::LinearRegression(m) => m,
            ProbeModel::KnnRegressor(m) => m,
            ProbeModel::KnnClassifier(m) => m,
            ProbeModel::LogisticRegression(m) => m,
            ProbeModel::DecisionTree(m) => m,
        }
    }
}

impl Estimator for ProbeModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_estimator_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_estimator().predict(x)
    }

    fn task(&self) -> TaskType {
        self.as_estimator().task()
    }
}

/// Sequential feature selector.
///
/// Each step tries every remaining feature, scores the candidate subset with
/// the mean `cv`-fold score of the probe model, and commits the best one
/// (ties go to the lowest feature index). Without `tol` the search stops at
/// half the features; with `tol` it stops once the best improvement falls
/// below `tol`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialSelector {
    probe: ProbeModel,
    direction: Direction,
    cv: usize,
    tol: Option<f64>,
    n_jobs: Option<usize>,
    support: Option<Vec<bool>>,
}

impl SequentialSelector {
    pub fn new(probe: ProbeModel, direction: Direction) -> Self {
        Self {
            probe,
            direction,
            cv: 5,
            tol: None,
            n_jobs: None,
            support: None,
        }
    }

    /// Number of cross-validation folds
    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_tol(mut self, tol: Option<f64>) -> Self {
        self.tol = tol;
        self
    }

    /// Threads used to score candidates (`None` uses the current rayon pool)
    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn probe(&self) -> &ProbeModel {
        &self.probe
    }

    pub fn get_support(&self) -> Option<&[bool]> {
        self.support.as_deref()
    }

    pub fn selected_indices(&self) -> Vec<usize> {
        self.support.as_deref().map(mask_indices).unwrap_or_default()
    }

    fn cross_validator(&self) -> CrossValidator {
        let strategy = match self.probe.task() {
            TaskType::Regression => CVStrategy::KFold { n_splits: self.cv },
            TaskType::Classification => CVStrategy::StratifiedKFold { n_splits: self.cv },
        };
        CrossValidator::new(strategy)
    }

    /// Mean CV score of the probe on the columns selected by `mask`
    fn score_subset(&self, x: &Array2<f64>, y: &Array1<f64>, mask: &[bool], cv: &CrossValidator) -> Result<f64> {
        let x_subset = utils::take_columns(x, &mask_indices(mask));
        Ok(cross_val_score(&self.probe, &x_subset, y, cv)?.mean_score)
    }

    /// Best candidate feature to flip next, with its score
    fn best_candidate(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        current: &[bool],
        cv: &CrossValidator,
    ) -> Result<(usize, f64)> {
        let candidates: Vec<usize> = (0..current.len()).filter(|&j| !current[j]).collect();

        let score_candidate = |&j: &usize| -> Result<(usize, f64)> {
            let mut mask = current.to_vec();
            mask[j] = true;
            if self.direction == Direction::Backward {
                mask.iter_mut().for_each(|m| *m = !*m);
            }
            Ok((j, self.score_subset(x, y, &mask, cv)?))
        };

        let scored: Vec<(usize, f64)> = match self.n_jobs {
            Some(n_jobs) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n_jobs)
                    .build()
                    .map_err(|e| PrepError::ThreadPoolError(e.to_string()))?;
                pool.install(|| candidates.par_iter().map(score_candidate).collect::<Result<Vec<_>>>())?
            }
            None => candidates.par_iter().map(score_candidate).collect::<Result<Vec<_>>>()?,
        };

        let mut best: Option<(usize, f64)> = None;
        for (j, score) in scored {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
        }
        best.ok_or_else(|| PrepError::ComputationError("No candidate feature left".to_string()))
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_target(x, y)?;
        let n_features = x.ncols();

        if let Some(tol) = self.tol {
            if tol < 0.0 && self.direction == Direction::Forward {
                return Err(PrepError::InvalidParameter {
                    name: "tol".to_string(),
                    value: tol.to_string(),
                    reason: "must be non-negative for forward selection".to_string(),
                });
            }
        }

        let n_features_to_select = match self.tol {
            Some(_) => n_features.saturating_sub(1),
            None => n_features / 2,
        };
        let n_iterations = match self.direction {
            Direction::Forward => n_features_to_select,
            Direction::Backward => n_features - n_features_to_select,
        };

        let cv = self.cross_validator();
        // In backward mode the mask tracks removed features
        let mut current = vec![false; n_features];
        let mut old_score = f64::NEG_INFINITY;

        for step in 0..n_iterations {
            let (feature, score) = self.best_candidate(x, y, &current, &cv)?;
            if let Some(tol) = self.tol {
                if score - old_score < tol {
                    tracing::debug!(step, score, old_score, "Sequential selection stopped on tolerance");
                    break;
                }
            }
            tracing::trace!(step, feature, score, "Sequential selection step");
            old_score = score;
            current[feature] = true;
        }

        if self.direction == Direction::Backward {
            current.iter_mut().for_each(|m| *m = !*m);
        }

        self.support = Some(current);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let support = self.support.as_ref().ok_or(PrepError::NotFitted {
            adapter: "SequentialSelector",
        })?;
        take_columns(x, support)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }
}
