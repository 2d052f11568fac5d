//! Supervised feature selection
//!
//! - Univariate scores: F-test for regression, ANOVA F-test and mutual
//!   information for classification
//! - [`UnivariateSelector`]: score threshold rules (k-best, percentile, FPR, FDR)
//! - [`SequentialSelector`]: greedy forward/backward search scored by
//!   cross-validation of a probe model

mod scores;
mod sequential;
mod univariate;

pub use scores::{f_classif, f_regression, mutual_info_classif, r_regression};
pub use sequential::{Direction, ProbeModel, SequentialSelector};
pub use univariate::{ScoreFunction, SelectionRule, UnivariateSelector};

use crate::error::{PrepError, Result};
use crate::utils::{self, mask_indices};
use ndarray::{Array1, Array2};

/// Target must have one entry per sample
pub(crate) fn check_target(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if y.len() != x.nrows() {
        return Err(PrepError::InvalidArgument(format!(
            "target has {} entries but the data has {} samples",
            y.len(),
            x.nrows()
        )));
    }
    Ok(())
}

/// Columns of `x` whose mask entry is set, in original order
pub(crate) fn take_columns(x: &Array2<f64>, support: &[bool]) -> Result<Array2<f64>> {
    if x.ncols() != support.len() {
        return Err(PrepError::feature_count(support.len(), x.ncols()));
    }
    let indices = mask_indices(support);
    if indices.is_empty() {
        tracing::warn!("No features were selected; returning an empty matrix");
    }
    Ok(utils::take_columns(x, &indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_take_columns_keeps_order() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let out = take_columns(&x, &[true, false, true]).unwrap();
        assert_eq!(out, array![[1.0, 3.0], [4.0, 6.0]]);
    }

    #[test]
    fn test_take_no_columns() {
        let x = array![[1.0, 2.0], [4.0, 5.0]];
        let out = take_columns(&x, &[false, false]).unwrap();
        assert_eq!(out.dim(), (2, 0));
    }

    #[test]
    fn test_check_target_length() {
        let x = array![[1.0], [2.0]];
        assert!(matches!(
            check_target(&x, &array![1.0]),
            Err(PrepError::InvalidArgument(_))
        ));
    }
}
