//! Preprocessing adapters
//!
//! Each adapter owns one preprocessing concern and picks, at fit time, one
//! strategy from a closed catalogue:
//! - [`Imputer`]: missing value imputation (simple, KNN, iterative)
//! - [`Encoder`]: ordinal or one-hot categorical encoding
//! - [`Scaler`]: standardization or min-max scaling
//! - [`Discretizer`]: k-bins discretization
//! - [`FeatureSelector`]: univariate or sequential supervised selection
//! - [`DimensionalityReducer`]: PCA
//!
//! All adapters share the [`Adapter`] contract. An adapter built with
//! `apply = false` is bypassed: `fit` does nothing and `transform` returns
//! its input unchanged. Adapters chain through [`Pipeline`].

mod config;
mod discretizer;
mod encoder;
mod feature_selection;
mod imputer;
mod pipeline;
mod reducer;
mod scaler;

pub use config::{
    DiscretizerConfig, EncoderConfig, FeatureSelectorConfig, ImputerConfig, ReducerConfig, ScalerConfig,
};
pub use discretizer::Discretizer;
pub use encoder::{EncodeMethod, Encoder, FittedEncoder};
pub use feature_selection::{FeatureSelector, FittedSelector, ProbeKind, RuleKind, SelectionMethod};
pub use imputer::{FittedImputer, ImputeMethod, Imputer};
pub use pipeline::{Pipeline, Step};
pub use reducer::DimensionalityReducer;
pub use scaler::{FittedScaler, ScaleMethod, Scaler};

use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Uniform fit/transform contract shared by every adapter
pub trait Adapter {
    /// Adapter name used in errors and logs
    const NAME: &'static str;

    /// Fit the selected strategy on `x` (and `y` for supervised adapters).
    /// A bypassed adapter returns immediately without validating anything.
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self>;

    /// Transform `x` with the fitted strategy, or return a copy of `x` when
    /// bypassed. Output is always dense.
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }

    fn is_fitted(&self) -> bool;

    fn is_bypassed(&self) -> bool;
}

/// Fitted state of an adapter.
///
/// `Bypass` is chosen at construction when `apply = false` and never changes.
/// Otherwise the slot starts `Unfitted` and holds exactly one estimator after
/// each successful fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedSlot<E> {
    Bypass,
    Unfitted,
    Fitted(E),
}

impl<E> FittedSlot<E> {
    pub fn new(apply: bool) -> Self {
        if apply {
            FittedSlot::Unfitted
        } else {
            FittedSlot::Bypass
        }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self, FittedSlot::Bypass)
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, FittedSlot::Fitted(_))
    }

    pub fn get(&self) -> Option<&E> {
        match self {
            FittedSlot::Fitted(e) => Some(e),
            _ => None,
        }
    }

    /// Replace the fitted estimator with the result of `build`.
    /// The previous estimator is dropped first, so a failure leaves the slot
    /// `Unfitted`. Bypassed slots are left alone.
    pub(crate) fn refit(
        &mut self,
        adapter: &'static str,
        method: &str,
        x: &Array2<f64>,
        build: impl FnOnce() -> Result<E>,
    ) -> Result<()> {
        if self.is_bypass() {
            tracing::trace!(adapter, "Adapter bypassed, skipping fit");
            return Ok(());
        }
        tracing::debug!(
            adapter,
            method,
            n_samples = x.nrows(),
            n_features = x.ncols(),
            "Fitting adapter"
        );

        *self = FittedSlot::Unfitted;
        let fitted = build()?;
        *self = FittedSlot::Fitted(fitted);
        Ok(())
    }

    /// Apply `f` to the fitted estimator; identity when bypassed
    pub(crate) fn apply(
        &self,
        adapter: &'static str,
        x: &Array2<f64>,
        f: impl FnOnce(&E) -> Result<Array2<f64>>,
    ) -> Result<Array2<f64>> {
        match self {
            FittedSlot::Bypass => {
                tracing::trace!(adapter, "Adapter bypassed, returning input");
                Ok(x.clone())
            }
            FittedSlot::Unfitted => Err(PrepError::NotFitted { adapter }),
            FittedSlot::Fitted(e) => f(e),
        }
    }
}
