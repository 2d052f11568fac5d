//! Numeric scaling adapter

use super::{Adapter, FittedSlot, ScalerConfig};
use crate::error::{PrepError, Result};
use crate::scaling::{MinMaxScaler, StandardScaler};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scaling methods known to [`Scaler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleMethod {
    /// Zero mean, unit variance
    #[default]
    Standard,
    /// Fit range mapped to `[0, 1]`
    MinMax,
}

impl fmt::Display for ScaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleMethod::Standard => "standard",
            ScaleMethod::MinMax => "min-max",
        })
    }
}

impl FromStr for ScaleMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(ScaleMethod::Standard),
            "min-max" => Ok(ScaleMethod::MinMax),
            other => Err(PrepError::InvalidConfiguration {
                adapter: Scaler::NAME,
                name: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedScaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    config: ScalerConfig,
    state: FittedSlot<FittedScaler>,
}

impl Scaler {
    pub fn new(config: ScalerConfig) -> Self {
        let state = FittedSlot::new(config.apply);
        Self { config, state }
    }

    pub fn config(&self) -> &ScalerConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&FittedScaler> {
        self.state.get()
    }
}

impl Default for Scaler {
    fn default() -> Self {
        Self::new(ScalerConfig::default())
    }
}

impl Adapter for Scaler {
    const NAME: &'static str = "Scaler";

    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let config = &self.config;
        self.state.refit(Self::NAME, &config.method, x, || {
            Ok(match config.method.parse::<ScaleMethod>()? {
                ScaleMethod::Standard => {
                    let mut scaler = StandardScaler::new();
                    scaler.fit(x)?;
                    FittedScaler::Standard(scaler)
                }
                ScaleMethod::MinMax => {
                    let mut scaler = MinMaxScaler::new();
                    scaler.fit(x)?;
                    FittedScaler::MinMax(scaler)
                }
            })
        })?;
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.state.apply(Self::NAME, x, |fitted| match fitted {
            FittedScaler::Standard(s) => s.transform(x),
            FittedScaler::MinMax(s) => s.transform(x),
        })
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn is_bypassed(&self) -> bool {
        self.state.is_bypass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_min_max() {
        let config = ScalerConfig::new().with_apply(true).with_method(ScaleMethod::MinMax);
        let mut scaler = Scaler::new(config);
        let out = scaler.fit_transform(&array![[2.0], [4.0], [6.0]], None).unwrap();
        assert_eq!(out, array![[0.0], [0.5], [1.0]]);
        assert_eq!(scaler.transform(&array![[8.0]]).unwrap(), array![[1.5]]);
    }

    #[test]
    fn test_standard_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 40.0]];
        let mut scaler = Scaler::new(ScalerConfig::new().with_apply(true));
        let out = scaler.fit_transform(&x, None).unwrap();
        assert!(matches!(scaler.fitted(), Some(FittedScaler::Standard(_))));
        for col in out.columns() {
            assert!(col.sum().abs() < 1e-12);
            assert!((col.mapv(|v| v * v).mean().unwrap() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unknown_method() {
        let mut scaler = Scaler::new(ScalerConfig::new().with_apply(true).with_method_name("robust"));
        assert!(matches!(
            scaler.fit(&array![[1.0]], None),
            Err(PrepError::InvalidConfiguration { adapter: "Scaler", .. })
        ));
    }
}
