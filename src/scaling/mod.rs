//! Feature scaling implementations

use crate::error::{PrepError, Result};
use crate::imputation::is_missing;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column: `(x - center) / scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// mean or min
    pub center: f64,
    /// std or range
    pub scale: f64,
}

impl ScalerParams {
    fn new(center: f64, scale: f64) -> Self {
        Self {
            center,
            scale: if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale },
        }
    }
}

/// Per-column affine map shared by the scalers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ColumnAffine {
    params: Option<Vec<ScalerParams>>,
}

impl ColumnAffine {
    fn fit(&mut self, x: &Array2<f64>, compute: impl Fn(&[f64]) -> ScalerParams) {
        let params = x
            .columns()
            .into_iter()
            .map(|col| compute(&observed(col)))
            .collect();
        self.params = Some(params);
    }

    fn get(&self, adapter: &'static str, n_cols: usize) -> Result<&[ScalerParams]> {
        let params = self.params.as_deref().ok_or(PrepError::NotFitted { adapter })?;
        if n_cols != params.len() {
            return Err(PrepError::feature_count(params.len(), n_cols));
        }
        Ok(params)
    }

    fn transform(&self, adapter: &'static str, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.get(adapter, x.ncols())?;
        let mut result = x.clone();
        for (mut col, p) in result.columns_mut().into_iter().zip(params.iter()) {
            col.mapv_inplace(|v| (v - p.center) / p.scale);
        }
        Ok(result)
    }
}

fn observed(col: ArrayView1<f64>) -> Vec<f64> {
    col.iter().copied().filter(|v| !is_missing(*v)).collect()
}

/// Standard scaling (z-score normalization): `(x - mean) / std`.
///
/// Uses the population standard deviation. Missing values are ignored when
/// fitting and stay missing after transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    inner: ColumnAffine,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<&[ScalerParams]> {
        self.inner.params.as_deref()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.inner.fit(x, |values| {
            if values.is_empty() {
                return ScalerParams::new(0.0, 1.0);
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            ScalerParams::new(mean, var.sqrt())
        });
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner.transform("StandardScaler", x)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Min-Max scaling: `(x - min) / (max - min)`, unclamped at transform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    inner: ColumnAffine,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<&[ScalerParams]> {
        self.inner.params.as_deref()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.inner.fit(x, |values| {
            if values.is_empty() {
                return ScalerParams::new(0.0, 1.0);
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            ScalerParams::new(min, max - min)
        });
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner.transform("MinMaxScaler", x)
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
    fn test_standard_scaler() {
        let x = array![[1.0], [2.0], [3.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).unwrap();

        let std = (2.0f64 / 3.0).sqrt();
        assert!((out[[0, 0]] + 1.0 / std).abs() < 1e-12);
        assert!(out[[1, 0]].abs() < 1e-12);
        assert!((out.column(0).sum()).abs() < 1e-12);
    }

    #[test]
    fn test_standard_constant_column_and_nan() {
        let x = array![[5.0, 1.0], [5.0, f64::NAN], [5.0, 3.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(out[[0, 1]], -1.0);
        assert!(out[[1, 1]].is_nan());
        assert_eq!(out[[2, 1]], 1.0);
    }

    #[test]
    fn test_min_max_unclamped() {
        let mut scaler = MinMaxScaler::new();
        let out = scaler.fit_transform(&array![[2.0], [4.0], [6.0]]).unwrap();
        assert_eq!(out, array![[0.0], [0.5], [1.0]]);
        assert_eq!(scaler.transform(&array![[8.0]]).unwrap(), array![[1.5]]);
    }

    #[test]
    fn test_min_max_per_column() {
        let x = array![[1.0, -4.0], [7.0, 2.0], [3.0, 0.5]];
        let mut scaler = MinMaxScaler::new();
        let out = scaler.fit_transform(&x).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 1.0, 1.0 / 3.0]);
        assert_eq!(out.column(1).to_vec(), vec![0.0, 1.0, 0.75]);
    }

    #[test]
    fn test_unfitted() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(PrepError::NotFitted { adapter: "StandardScaler" })
        ));
    }
}
