//! Categorical encoding of numerically coded columns
//!
//! Every distinct `f64` value of a column is one category (`-0.0` and `0.0`
//! are the same category). Categories are learned per column at fit time and
//! kept in ascending order.

mod one_hot;

pub use one_hot::{IndicatorMatrix, OneHotEncoder};

use crate::error::{PrepError, Result};
use crate::imputation::is_missing;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which category (if any) a one-hot encoding leaves out per column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DropPolicy {
    /// Keep one indicator per category
    None,
    /// Drop the first (smallest) category of every column
    #[default]
    First,
}

impl DropPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropPolicy::None => "none",
            DropPolicy::First => "first",
        }
    }
}

impl FromStr for DropPolicy {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(DropPolicy::None),
            "first" => Ok(DropPolicy::First),
            other => Err(PrepError::InvalidConfiguration {
                adapter: "Encoder",
                name: other.to_string(),
            }),
        }
    }
}

/// Fold `-0.0` into `0.0` so both compare as one category
#[inline]
fn canonical(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Sorted distinct non-missing values of a column
pub(crate) fn sorted_categories(column: ArrayView1<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = column
        .iter()
        .filter(|v| !is_missing(**v))
        .map(|v| canonical(*v))
        .collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Position of `value` among sorted categories
#[inline]
pub(crate) fn category_index(categories: &[f64], value: f64) -> Option<usize> {
    let value = canonical(value);
    categories.binary_search_by(|c| c.total_cmp(&value)).ok()
}

/// Replaces every category by its index in the sorted category list.
///
/// Values unseen at fit time become `-1`; missing values stay NaN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    categories: Option<Vec<Vec<f64>>>,
}

impl OrdinalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learned categories per column
    pub fn categories(&self) -> Option<&[Vec<f64>]> {
        self.categories.as_deref()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let categories = x.columns().into_iter().map(sorted_categories).collect();
        self.categories = Some(categories);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let categories = self.categories.as_ref().ok_or(PrepError::NotFitted {
            adapter: "OrdinalEncoder",
        })?;
        if x.ncols() != categories.len() {
            return Err(PrepError::feature_count(categories.len(), x.ncols()));
        }

        let mut result = x.clone();
        for (mut col, cats) in result.columns_mut().into_iter().zip(categories.iter()) {
            col.mapv_inplace(|v| {
                if is_missing(v) {
                    v
                } else {
                    category_index(cats, v).map_or(-1.0, |i| i as f64)
                }
            });
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ordinal_sorted_codes() {
        let x = array![[30.0, 1.0], [10.0, 1.0], [20.0, 2.0], [10.0, 2.0]];
        let mut enc = OrdinalEncoder::new();
        let out = enc.fit_transform(&x).unwrap();
        assert_eq!(out, array![[2.0, 0.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_ordinal_unseen_and_missing() {
        let mut enc = OrdinalEncoder::new();
        enc.fit(&array![[1.0], [2.0]]).unwrap();
        let out = enc.transform(&array![[5.0], [f64::NAN], [2.0]]).unwrap();
        assert_eq!(out[[0, 0]], -1.0);
        assert!(out[[1, 0]].is_nan());
        assert_eq!(out[[2, 0]], 1.0);
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let cats = sorted_categories(array![0.0, -0.0, 1.0].view());
        assert_eq!(cats.len(), 2);
        assert_eq!(category_index(&cats, -0.0), Some(0));
    }

    #[test]
    fn test_drop_policy_parse() {
        assert_eq!("first".parse::<DropPolicy>().unwrap(), DropPolicy::First);
        assert_eq!("none".parse::<DropPolicy>().unwrap(), DropPolicy::None);
        assert!(matches!(
            "if_binary".parse::<DropPolicy>(),
            Err(PrepError::InvalidConfiguration { .. })
        ));
    }
}
