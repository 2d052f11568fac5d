//! Dimensionality reduction adapter

use super::{Adapter, FittedSlot, ReducerConfig};
use crate::decomposition::Pca;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Projects the data onto its leading principal components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionalityReducer {
    config: ReducerConfig,
    state: FittedSlot<Pca>,
}

impl DimensionalityReducer {
    pub fn new(config: ReducerConfig) -> Self {
        let state = FittedSlot::new(config.apply);
        Self { config, state }
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&Pca> {
        self.state.get()
    }
}

impl Default for DimensionalityReducer {
    fn default() -> Self {
        Self::new(ReducerConfig::default())
    }
}

impl Adapter for DimensionalityReducer {
    const NAME: &'static str = "DimensionalityReducer";

    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let config = &self.config;
        self.state.refit(Self::NAME, "pca", x, || {
            let mut pca = Pca::new(config.n_components).with_seed(config.random_state);
            pca.fit(x)?;
            Ok(pca)
        })?;
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.state.apply(Self::NAME, x, |pca| pca.transform(x))
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
    use crate::error::PrepError;

    #[test]
    fn test_reduces_to_n_components() {
        let x = Array2::from_shape_fn((10, 4), |(i, j)| (i * (j + 1)) as f64 + ((i + j) % 3) as f64);
        let mut reducer = DimensionalityReducer::new(ReducerConfig::new().with_apply(true));
        let out = reducer.fit_transform(&x, None).unwrap();
        assert_eq!(out.dim(), (10, 2));
        assert!(reducer.fitted().unwrap().explained_variance_ratio().is_some());
    }

    #[test]
    fn test_too_many_components() {
        let x = Array2::from_elem((3, 2), 1.0);
        let config = ReducerConfig::new().with_apply(true).with_n_components(3);
        let mut reducer = DimensionalityReducer::new(config);
        assert!(matches!(reducer.fit(&x, None), Err(PrepError::InvalidParameter { .. })));
        assert!(!reducer.is_fitted());
    }
}
