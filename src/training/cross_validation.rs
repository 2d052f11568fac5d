//! Cross-validation splitters and scoring

use crate::error::{PrepError, Result};
use crate::training::{check_target_len, unique_classes, Estimator};
use crate::utils::take_rows;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Contiguous folds over the sample order
    KFold { n_splits: usize },
    /// Folds preserving the class proportions of the target
    StratifiedKFold { n_splits: usize },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::KFold { n_splits: 5 }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter. Folds follow the sample order.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        match self.strategy {
            CVStrategy::KFold { n_splits } => Self::k_fold_split(n_samples, n_splits),
            CVStrategy::StratifiedKFold { n_splits } => {
                let y = y.ok_or_else(|| {
                    PrepError::InvalidArgument("StratifiedKFold requires a target array".to_string())
                })?;
                Self::stratified_k_fold_split(n_samples, y, n_splits)
            }
        }
    }

    fn check_splits(n_samples: usize, n_splits: usize) -> Result<()> {
        if n_splits < 2 {
            return Err(PrepError::InvalidParameter {
                name: "cv".to_string(),
                value: n_splits.to_string(),
                reason: "n_splits must be at least 2".to_string(),
            });
        }
        if n_samples < n_splits {
            return Err(PrepError::InvalidParameter {
                name: "cv".to_string(),
                value: n_splits.to_string(),
                reason: format!("n_samples ({}) must be >= n_splits ({})", n_samples, n_splits),
            });
        }
        Ok(())
    }

    fn k_fold_split(n_samples: usize, n_splits: usize) -> Result<Vec<CVSplit>> {
        Self::check_splits(n_samples, n_splits)?;

        let indices: Vec<usize> = (0..n_samples).collect();

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }

    /// Deals the samples of each class round-robin over the folds
    fn stratified_k_fold_split(n_samples: usize, y: &Array1<f64>, n_splits: usize) -> Result<Vec<CVSplit>> {
        Self::check_splits(n_samples, n_splits)?;
        if y.len() != n_samples {
            return Err(PrepError::InvalidArgument(format!(
                "target has {} entries for {} samples",
                y.len(),
                n_samples
            )));
        }

        let classes = unique_classes(y);
        let mut class_indices: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
        for (idx, v) in y.iter().enumerate() {
            if let Ok(k) = classes.binary_search_by(|c| c.total_cmp(v)) {
                class_indices[k].push(idx);
            }
        }

        // Keep dealing where the previous class stopped so fold sizes stay balanced
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut next_fold = 0;
        for indices in &class_indices {
            for &idx in indices {
                folds[next_fold].push(idx);
                next_fold = (next_fold + 1) % n_splits;
            }
        }
        for fold in folds.iter_mut() {
            fold.sort_unstable();
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len().max(1) as f64;
        let mean_score = scores.iter().sum::<f64>() / n_folds;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
        }
    }
}

/// Fit a fresh clone of `estimator` on every training fold and score it on
/// the matching test fold with [`Estimator::score`].
pub fn cross_val_score<E>(
    estimator: &E,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &CrossValidator,
) -> Result<CVResults>
where
    E: Estimator + Clone,
{
    check_target_len(x, y)?;
    let splits = cv.split(x.nrows(), Some(y))?;

    let mut scores = Vec::with_capacity(splits.len());
    for split in &splits {
        let x_train = take_rows(x, &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = take_rows(x, &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = estimator.clone();
        model.fit(&x_train, &y_train)?;
        scores.push(model.score(&x_test, &y_test)?);
    }

    Ok(CVResults::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LinearRegression;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5 });
        let splits = cv.split(100, None).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_uneven_sizes() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 3 });
        let splits = cv.split(10, None).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5 });
        let splits = cv.split(10, Some(&y)).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let classes: Vec<f64> = split.test_indices.iter().map(|&i| y[i]).collect();
            assert!(classes.contains(&0.0) && classes.contains(&1.0));
        }
    }

    #[test]
    fn test_stratified_requires_target() {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 2 });
        assert!(matches!(cv.split(4, None), Err(PrepError::InvalidArgument(_))));
    }

    #[test]
    fn test_too_few_samples() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5 });
        assert!(matches!(cv.split(3, None), Err(PrepError::InvalidParameter { .. })));
    }

    #[test]
    fn test_cross_val_score_linear() {
        let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 3.0 * v + 1.0);
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 3 });

        let results = cross_val_score(&LinearRegression::new(), &x, &y, &cv).unwrap();
        assert_eq!(results.scores.len(), 3);
        assert!((results.mean_score - 1.0).abs() < 1e-8);
        assert!(results.std_score < 1e-8);
    }
}
