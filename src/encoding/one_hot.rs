//! One-hot encoding with a sparse indicator output

use crate::encoding::{category_index, sorted_categories, DropPolicy};
use crate::error::{PrepError, Result};
use crate::imputation::is_missing;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Sparse 0/1 matrix storing, per row, the columns set to one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorMatrix {
    n_cols: usize,
    rows: Vec<Vec<usize>>,
}

impl IndicatorMatrix {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.n_cols)
    }

    /// Number of stored ones
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Active column indices of a row, ascending
    pub fn row(&self, i: usize) -> &[usize] {
        &self.rows[i]
    }

    /// Dense `f64` copy
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::<f64>::zeros(self.shape());
        for (i, cols) in self.rows.iter().enumerate() {
            for &j in cols {
                dense[[i, j]] = 1.0;
            }
        }
        dense
    }
}

/// Categories learned for one input column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnCategories {
    /// Sorted observed values
    values: Vec<f64>,
    /// Whether NaN was seen (it becomes the last category)
    has_missing: bool,
    /// First output column of this input column
    offset: usize,
}

impl ColumnCategories {
    fn n_categories(&self) -> usize {
        self.values.len() + usize::from(self.has_missing)
    }
}

/// One indicator column per (input column, category) pair.
///
/// Categories are ordered ascending with NaN last. With [`DropPolicy::First`]
/// the first category of every column gets no indicator. A value unseen at fit
/// time produces no indicator for its column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop: DropPolicy,
    columns: Option<Vec<ColumnCategories>>,
    n_output_features: usize,
}

impl OneHotEncoder {
    pub fn new(drop: DropPolicy) -> Self {
        Self {
            drop,
            columns: None,
            n_output_features: 0,
        }
    }

    pub fn drop_policy(&self) -> DropPolicy {
        self.drop
    }

    /// Output width after fit
    pub fn n_output_features(&self) -> usize {
        self.n_output_features
    }

    fn n_dropped(&self) -> usize {
        match self.drop {
            DropPolicy::None => 0,
            DropPolicy::First => 1,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let dropped = self.n_dropped();
        let mut offset = 0;
        let mut columns = Vec::with_capacity(x.ncols());

        for col in x.columns() {
            let cats = ColumnCategories {
                values: sorted_categories(col),
                has_missing: col.iter().any(|v| is_missing(*v)),
                offset,
            };
            offset += cats.n_categories().saturating_sub(dropped);
            columns.push(cats);
        }

        self.columns = Some(columns);
        self.n_output_features = offset;
        Ok(self)
    }

    /// Category position of a value within its column, if known
    fn locate(cats: &ColumnCategories, v: f64) -> Option<usize> {
        if is_missing(v) {
            cats.has_missing.then_some(cats.values.len())
        } else {
            category_index(&cats.values, v)
        }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<IndicatorMatrix> {
        let columns = self.columns.as_ref().ok_or(PrepError::NotFitted {
            adapter: "OneHotEncoder",
        })?;
        if x.ncols() != columns.len() {
            return Err(PrepError::feature_count(columns.len(), x.ncols()));
        }

        let dropped = self.n_dropped();
        let rows = x
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(columns.iter())
                    .filter_map(|(&v, cats)| {
                        let idx = Self::locate(cats, v)?;
                        (idx >= dropped).then(|| cats.offset + idx - dropped)
                    })
                    .collect()
            })
            .collect();

        Ok(IndicatorMatrix {
            n_cols: self.n_output_features,
            rows,
        })
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<IndicatorMatrix> {
        self.fit(x)?;
        self.transform(x)
    }
}
