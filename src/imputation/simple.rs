//! Univariate imputation with a per-column statistic

use crate::error::{PrepError, Result};
use crate::imputation::{is_missing, observed_columns, select_columns, Imputer, InitialStrategy};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Replaces missing entries of each column with a statistic of that column's
/// observed values, computed once at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleImputer {
    strategy: InitialStrategy,
    /// Fill value per kept column
    statistics: Option<Vec<f64>>,
    /// Columns with at least one observed value at fit time
    kept_columns: Vec<usize>,
    n_features_in: usize,
}

impl SimpleImputer {
    /// Create a new simple imputer
    pub fn new(strategy: InitialStrategy) -> Self {
        Self {
            strategy,
            statistics: None,
            kept_columns: Vec::new(),
            n_features_in: 0,
        }
    }

    /// Fitted fill values, one per kept column
    pub fn statistics(&self) -> Option<&[f64]> {
        self.statistics.as_deref()
    }

    pub fn strategy(&self) -> InitialStrategy {
        self.strategy
    }

    /// Input columns that survive into the output
    pub(crate) fn kept_columns(&self) -> &[usize] {
        &self.kept_columns
    }
}

impl Imputer for SimpleImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let kept = observed_columns(x);
        let statistics = kept
            .iter()
            .map(|&j| self.strategy.compute(x.column(j)).unwrap_or(f64::NAN))
            .collect();

        self.statistics = Some(statistics);
        self.kept_columns = kept;
        self.n_features_in = x.ncols();
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let statistics = self.statistics.as_ref().ok_or(PrepError::NotFitted {
            adapter: "SimpleImputer",
        })?;
        if x.ncols() != self.n_features_in {
            return Err(PrepError::feature_count(self.n_features_in, x.ncols()));
        }

        let mut result = select_columns(x, &self.kept_columns);
        for (mut col, &fill) in result.axis_iter_mut(Axis(1)).zip(statistics.iter()) {
            col.mapv_inplace(|v| if is_missing(v) { fill } else { v });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_simple_median() {
        let x = array![[1.0, f64::NAN], [3.0, 4.0], [5.0, 6.0]];
        let mut imputer = SimpleImputer::new(InitialStrategy::Median);
        let result = imputer.fit_transform(&x).unwrap();
        assert_eq!(result, array![[1.0, 4.0], [3.0, 4.0], [5.0, 6.0]]);
    }

    #[test]
    fn test_simple_mean_uses_fit_statistics() {
        let train = array![[1.0], [f64::NAN], [3.0]];
        let mut imputer = SimpleImputer::new(InitialStrategy::Mean);
        imputer.fit(&train).unwrap();

        let test = array![[f64::NAN], [10.0]];
        let result = imputer.transform(&test).unwrap();
        assert_eq!(result, array![[2.0], [10.0]]);
    }

    #[test]
    fn test_simple_drops_empty_columns() {
        let x = array![[1.0, f64::NAN, 2.0], [f64::NAN, f64::NAN, 4.0]];
        let mut imputer = SimpleImputer::new(InitialStrategy::MostFrequent);
        let result = imputer.fit_transform(&x).unwrap();
        assert_eq!(result.ncols(), 2);
        assert_eq!(result[[1, 0]], 1.0);
    }

    #[test]
    fn test_transform_rejects_other_width() {
        let mut imputer = SimpleImputer::new(InitialStrategy::Mean);
        imputer.fit(&array![[1.0, 2.0]]).unwrap();
        let err = imputer.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PrepError::ShapeError { .. }));
    }
}
