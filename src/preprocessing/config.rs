//! Adapter configurations
//!
//! Method names are kept as strings so any name can be configured (and
//! deserialized); they are checked against the adapter's catalogue at fit
//! time. The typed `with_method` builders store the canonical name.

use super::{EncodeMethod, ImputeMethod, ScaleMethod, SelectionMethod};
use crate::discretization::BinningStrategy;
use crate::encoding::DropPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the [`super::Imputer`] adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerConfig {
    pub apply: bool,
    /// One of `simple_mean`, `simple_median`, `simple_most_frequent`, `knn`,
    /// `iterative_mean`, `iterative_median`, `iterative_most_frequent`
    pub method: String,
    /// Neighbours averaged by `knn`
    pub n_neighbors: usize,
    /// Predictor columns per feature for the iterative methods (`None` = all)
    pub n_nearest_features: Option<usize>,
    /// Imputation rounds for the iterative methods
    pub max_iter: usize,
    pub random_state: u64,
    /// Convergence tolerance for the iterative methods
    pub tol: f64,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            apply: true,
            method: ImputeMethod::default().to_string(),
            n_neighbors: 4,
            n_nearest_features: Some(4),
            max_iter: 25,
            random_state: 123,
            tol: 1e-3,
        }
    }
}

impl ImputerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_method(mut self, method: ImputeMethod) -> Self {
        self.method = method.to_string();
        self
    }

    /// Set the method by name; unknown names are rejected at fit time
    pub fn with_method_name(mut self, name: impl Into<String>) -> Self {
        self.method = name.into();
        self
    }

    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    pub fn with_n_nearest_features(mut self, n: Option<usize>) -> Self {
        self.n_nearest_features = n;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

/// Configuration for the [`super::Encoder`] adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub apply: bool,
    /// `ordinal` or `one-hot`
    pub method: String,
    /// `none` or `first`; only used by `one-hot`
    pub drop: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            apply: false,
            method: EncodeMethod::default().to_string(),
            drop: DropPolicy::default().as_str().to_string(),
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_method(mut self, method: EncodeMethod) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_method_name(mut self, name: impl Into<String>) -> Self {
        self.method = name.into();
        self
    }

    pub fn with_drop(mut self, drop: DropPolicy) -> Self {
        self.drop = drop.as_str().to_string();
        self
    }

    pub fn with_drop_name(mut self, name: impl Into<String>) -> Self {
        self.drop = name.into();
        self
    }
}

/// Configuration for the [`super::Scaler`] adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    pub apply: bool,
    /// `standard` or `min-max`
    pub method: String,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            apply: false,
            method: ScaleMethod::default().to_string(),
        }
    }
}

impl ScalerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_method(mut self, method: ScaleMethod) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_method_name(mut self, name: impl Into<String>) -> Self {
        self.method = name.into();
        self
    }
}

/// Configuration for the [`super::Discretizer`] adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretizerConfig {
    pub apply: bool,
    /// Bins per feature, at least 2
    pub n_bins: usize,
    /// `quantile`, `uniform` or `kmeans`
    pub strategy: String,
}

impl Default for DiscretizerConfig {
    fn default() -> Self {
        Self {
            apply: false,
            n_bins: 3,
            strategy: BinningStrategy::default().as_str().to_string(),
        }
    }
}

impl DiscretizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    pub fn with_strategy(mut self, strategy: BinningStrategy) -> Self {
        self.strategy = strategy.as_str().to_string();
        self
    }

    pub fn with_strategy_name(mut self, name: impl Into<String>) -> Self {
        self.strategy = name.into();
        self
    }
}

/// Configuration for the [`super::FeatureSelector`] adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSelectorConfig {
    pub apply: bool,
    /// `<rule>_<score>` for univariate selection (e.g. `KBest_f_reg`) or
    /// `<direction>_<probe>` for sequential selection (e.g. `forward_knn_class`)
    pub method: String,
    /// Cross-validation folds for sequential selection
    pub cv: usize,
    /// Features kept by `KBest`
    pub k: usize,
    /// Percent of features kept by `Percentile`
    pub percentile: f64,
    /// Neighbours of the KNN probe models
    pub n_neighbors: usize,
    /// Significance level for `Fdr` and `Fpr`
    pub alpha: f64,
    /// Threads scoring sequential candidates (`None` = current rayon pool)
    pub n_jobs: Option<usize>,
    /// Minimum score improvement per sequential step (`None` = select half)
    pub tol: Option<f64>,
}

impl Default for FeatureSelectorConfig {
    fn default() -> Self {
        Self {
            apply: false,
            method: SelectionMethod::default().to_string(),
            cv: 3,
            k: 5,
            percentile: 50.0,
            n_neighbors: 7,
            alpha: 0.05,
            n_jobs: None,
            tol: None,
        }
    }
}

impl FeatureSelectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_method(mut self, method: SelectionMethod) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_method_name(mut self, name: impl Into<String>) -> Self {
        self.method = name.into();
        self
    }

    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }

    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_tol(mut self, tol: Option<f64>) -> Self {
        self.tol = tol;
        self
    }
}

/// Configuration for the [`super::DimensionalityReducer`] adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    pub apply: bool,
    pub n_components: usize,
    pub random_state: u64,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            apply: false,
            n_components: 2,
            random_state: 123,
        }
    }
}

impl ReducerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let imputer = ImputerConfig::default();
        assert!(imputer.apply);
        assert_eq!(imputer.method, "simple_median");
        assert_eq!(imputer.n_neighbors, 4);
        assert_eq!(imputer.n_nearest_features, Some(4));
        assert_eq!(imputer.max_iter, 25);

        let encoder = EncoderConfig::default();
        assert!(!encoder.apply);
        assert_eq!(encoder.method, "ordinal");
        assert_eq!(encoder.drop, "first");

        assert_eq!(ScalerConfig::default().method, "standard");
        assert_eq!(DiscretizerConfig::default().strategy, "quantile");

        let selector = FeatureSelectorConfig::default();
        assert_eq!(selector.method, "Fdr_f_reg");
        assert_eq!((selector.cv, selector.k, selector.n_neighbors), (3, 5, 7));
        assert_eq!(selector.tol, None);

        let reducer = ReducerConfig::default();
        assert_eq!((reducer.n_components, reducer.random_state), (2, 123));
    }

    #[test]
    fn test_builder_stores_canonical_names() {
        let config = EncoderConfig::new()
            .with_apply(true)
            .with_method(EncodeMethod::OneHot)
            .with_drop(DropPolicy::None);
        assert_eq!(config.method, "one-hot");
        assert_eq!(config.drop, "none");

        let config = DiscretizerConfig::new().with_strategy(BinningStrategy::KMeans);
        assert_eq!(config.strategy, "kmeans");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ImputerConfig = serde_json::from_str(r#"{"method": "knn"}"#).unwrap();
        assert_eq!(config.method, "knn");
        assert!(config.apply);
        assert_eq!(config.random_state, 123);
    }
}
