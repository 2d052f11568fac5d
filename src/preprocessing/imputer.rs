//! Missing value imputation adapter

use super::{Adapter, FittedSlot, ImputerConfig};
use crate::error::{PrepError, Result};
use crate::imputation::{self, Imputer as _, InitialStrategy, IterativeImputer, KNNImputer, SimpleImputer};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Imputation methods known to [`Imputer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeMethod {
    /// Fill with a column statistic
    Simple(InitialStrategy),
    /// Mean of the nearest complete-enough rows
    Knn,
    /// Round-robin regression, starting from a column statistic
    Iterative(InitialStrategy),
}

impl Default for ImputeMethod {
    fn default() -> Self {
        ImputeMethod::Simple(InitialStrategy::Median)
    }
}

fn strategy_suffix(strategy: InitialStrategy) -> &'static str {
    match strategy {
        InitialStrategy::Mean => "mean",
        InitialStrategy::Median => "median",
        InitialStrategy::MostFrequent => "most_frequent",
    }
}

impl fmt::Display for ImputeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeMethod::Simple(s) => write!(f, "simple_{}", strategy_suffix(*s)),
            ImputeMethod::Knn => write!(f, "knn"),
            ImputeMethod::Iterative(s) => write!(f, "iterative_{}", strategy_suffix(*s)),
        }
    }
}

impl FromStr for ImputeMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        let strategy = |suffix: &str| match suffix {
            "mean" => Some(InitialStrategy::Mean),
            "median" => Some(InitialStrategy::Median),
            "most_frequent" => Some(InitialStrategy::MostFrequent),
            _ => None,
        };
        let parsed = if s == "knn" {
            Some(ImputeMethod::Knn)
        } else if let Some(rest) = s.strip_prefix("simple_") {
            strategy(rest).map(ImputeMethod::Simple)
        } else if let Some(rest) = s.strip_prefix("iterative_") {
            strategy(rest).map(ImputeMethod::Iterative)
        } else {
            None
        };
        parsed.ok_or_else(|| PrepError::InvalidConfiguration {
            adapter: Imputer::NAME,
            name: s.to_string(),
        })
    }
}

/// Estimator held by a fitted [`Imputer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedImputer {
    Simple(SimpleImputer),
    Knn(KNNImputer),
    Iterative(IterativeImputer),
}

impl FittedImputer {
    fn estimator(&self) -> &dyn imputation::Imputer {
        match self {
            FittedImputer::Simple(e) => e,
            FittedImputer::Knn(e) => e,
            FittedImputer::Iterative(e) => e,
        }
    }

    fn estimator_mut(&mut self) -> &mut dyn imputation::Imputer {
        match self {
            FittedImputer::Simple(e) => e,
            FittedImputer::Knn(e) => e,
            FittedImputer::Iterative(e) => e,
        }
    }
}

/// Fills missing (NaN) values. Applied by default.
///
/// Features with no observed value at fit time are dropped from the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    config: ImputerConfig,
    state: FittedSlot<FittedImputer>,
}

impl Imputer {
    pub fn new(config: ImputerConfig) -> Self {
        let state = FittedSlot::new(config.apply);
        Self { config, state }
    }

    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&FittedImputer> {
        self.state.get()
    }

    fn build(config: &ImputerConfig) -> Result<FittedImputer> {
        let estimator = match config.method.parse::<ImputeMethod>()? {
            ImputeMethod::Simple(strategy) => FittedImputer::Simple(SimpleImputer::new(strategy)),
            ImputeMethod::Knn => {
                if config.n_neighbors == 0 {
                    return Err(PrepError::invalid_parameter("n_neighbors", 0, "must be at least 1"));
                }
                FittedImputer::Knn(KNNImputer::new(config.n_neighbors))
            }
            ImputeMethod::Iterative(strategy) => {
                if config.n_nearest_features == Some(0) {
                    return Err(PrepError::invalid_parameter(
                        "n_nearest_features",
                        0,
                        "must be at least 1 when set",
                    ));
                }
                if !(config.tol >= 0.0) {
                    return Err(PrepError::invalid_parameter("tol", config.tol, "must be non-negative"));
                }
                FittedImputer::Iterative(
                    IterativeImputer::new(strategy)
                        .with_max_iter(config.max_iter)
                        .with_tolerance(config.tol)
                        .with_n_nearest_features(config.n_nearest_features)
                        .with_seed(config.random_state),
                )
            }
        };
        Ok(estimator)
    }
}

impl Default for Imputer {
    fn default() -> Self {
        Self::new(ImputerConfig::default())
    }
}

impl Adapter for Imputer {
    const NAME: &'static str = "Imputer";

    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let config = &self.config;
        self.state.refit(Self::NAME, &config.method, x, || {
            let mut fitted = Self::build(config)?;
            fitted.estimator_mut().fit(x)?;
            Ok(fitted)
        })?;
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.state.apply(Self::NAME, x, |fitted| fitted.estimator().transform(x))
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn is_bypassed(&self) -> bool {
        self.state.is_bypass()
    }
}
