//! Discretization adapter

use super::{Adapter, DiscretizerConfig, FittedSlot};
use crate::discretization::{BinningStrategy, KBinsDiscretizer};
use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Bins continuous features into ordinal bin indices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discretizer {
    config: DiscretizerConfig,
    state: FittedSlot<KBinsDiscretizer>,
}

impl Discretizer {
    pub fn new(config: DiscretizerConfig) -> Self {
        let state = FittedSlot::new(config.apply);
        Self { config, state }
    }

    pub fn config(&self) -> &DiscretizerConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&KBinsDiscretizer> {
        self.state.get()
    }
}

impl Default for Discretizer {
    fn default() -> Self {
        Self::new(DiscretizerConfig::default())
    }
}

impl Adapter for Discretizer {
    const NAME: &'static str = "Discretizer";

    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let config = &self.config;
        self.state.refit(Self::NAME, &config.strategy, x, || {
            let strategy: BinningStrategy = config.strategy.parse()?;
            if config.n_bins < 2 {
                return Err(PrepError::invalid_parameter("n_bins", config.n_bins, "must be at least 2"));
            }
            let mut discretizer = KBinsDiscretizer::new(config.n_bins, strategy);
            discretizer.fit(x)?;
            Ok(discretizer)
        })?;
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.state.apply(Self::NAME, x, |discretizer| discretizer.transform(x))
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
    fn test_uniform_bins() {
        let config = DiscretizerConfig::new()
            .with_apply(true)
            .with_strategy(BinningStrategy::Uniform);
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let out = Discretizer::new(config).fit_transform(&x, None).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_single_bin_rejected() {
        let config = DiscretizerConfig::new().with_apply(true).with_n_bins(1);
        let mut discretizer = Discretizer::new(config);
        assert!(matches!(
            discretizer.fit(&array![[0.0], [1.0]], None),
            Err(PrepError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_unknown_strategy() {
        let config = DiscretizerConfig::new().with_apply(true).with_strategy_name("entropy");
        assert!(matches!(
            Discretizer::new(config).fit(&array![[0.0], [1.0]], None),
            Err(PrepError::InvalidConfiguration { adapter: "Discretizer", .. })
        ));
    }
}
