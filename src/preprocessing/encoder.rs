//! Categorical encoding adapter

use super::{Adapter, EncoderConfig, FittedSlot};
use crate::encoding::{DropPolicy, OneHotEncoder, OrdinalEncoder};
use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encoding methods known to [`Encoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodeMethod {
    #[default]
    Ordinal,
    OneHot,
}

impl fmt::Display for EncodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodeMethod::Ordinal => "ordinal",
            EncodeMethod::OneHot => "one-hot",
        })
    }
}

impl FromStr for EncodeMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ordinal" => Ok(EncodeMethod::Ordinal),
            "one-hot" => Ok(EncodeMethod::OneHot),
            other => Err(PrepError::InvalidConfiguration {
                adapter: Encoder::NAME,
                name: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedEncoder {
    Ordinal(OrdinalEncoder),
    OneHot(OneHotEncoder),
}

/// Encodes numerically coded categorical columns.
///
/// One-hot output is densified, so every transform returns an `Array2<f64>`
/// whose width is the total number of indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encoder {
    config: EncoderConfig,
    state: FittedSlot<FittedEncoder>,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        let state = FittedSlot::new(config.apply);
        Self { config, state }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn fitted(&self) -> Option<&FittedEncoder> {
        self.state.get()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}

impl Adapter for Encoder {
    const NAME: &'static str = "Encoder";

    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        let config = &self.config;
        self.state.refit(Self::NAME, &config.method, x, || {
            Ok(match config.method.parse::<EncodeMethod>()? {
                EncodeMethod::Ordinal => {
                    let mut encoder = OrdinalEncoder::new();
                    encoder.fit(x)?;
                    FittedEncoder::Ordinal(encoder)
                }
                EncodeMethod::OneHot => {
                    let drop: DropPolicy = config.drop.parse()?;
                    let mut encoder = OneHotEncoder::new(drop);
                    encoder.fit(x)?;
                    tracing::debug!(n_output_features = encoder.n_output_features(), "One-hot categories learned");
                    FittedEncoder::OneHot(encoder)
                }
            })
        })?;
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.state.apply(Self::NAME, x, |fitted| match fitted {
            FittedEncoder::Ordinal(e) => e.transform(x),
            FittedEncoder::OneHot(e) => Ok(e.transform(x)?.to_dense()),
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

    fn categorical() -> Array2<f64> {
        array![[1.0, 10.0], [2.0, 20.0], [3.0, 10.0], [1.0, 30.0]]
    }

    #[test]
    fn test_one_hot_drop_first_width() {
        let config = EncoderConfig::new().with_apply(true).with_method(EncodeMethod::OneHot);
        let out = Encoder::new(config).fit_transform(&categorical(), None).unwrap();
        // (3 - 1) + (3 - 1)
        assert_eq!(out.dim(), (4, 4));
        assert_eq!(out.row(0).to_vec(), vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(out.row(3).to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_one_hot_without_drop() {
        let config = EncoderConfig::new()
            .with_apply(true)
            .with_method(EncodeMethod::OneHot)
            .with_drop(DropPolicy::None);
        let out = Encoder::new(config).fit_transform(&categorical(), None).unwrap();
        assert_eq!(out.ncols(), 6);
        assert!(out.rows().into_iter().all(|r| r.sum() == 2.0));
    }

    #[test]
    fn test_ordinal_unseen_is_minus_one() {
        let mut encoder = Encoder::new(EncoderConfig::new().with_apply(true));
        encoder.fit(&categorical(), None).unwrap();
        let out = encoder.transform(&array![[2.0, 99.0]]).unwrap();
        assert_eq!(out, array![[1.0, -1.0]]);
    }

    #[test]
    fn test_unknown_drop_rejected() {
        let config = EncoderConfig::new()
            .with_apply(true)
            .with_method(EncodeMethod::OneHot)
            .with_drop_name("if_binary");
        let mut encoder = Encoder::new(config);
        assert!(matches!(
            encoder.fit(&categorical(), None),
            Err(PrepError::InvalidConfiguration { adapter: "Encoder", .. })
        ));
        assert!(!encoder.is_fitted());
    }
}
