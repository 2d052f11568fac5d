//! tabprep - configurable tabular preprocessing adapters
//!
//! Six adapters, each selecting one strategy from a closed catalogue at fit
//! time and sharing a uniform fit/transform contract:
//!
//! - [`preprocessing::Imputer`] - missing value imputation
//! - [`preprocessing::Encoder`] - categorical encoding
//! - [`preprocessing::Scaler`] - numeric scaling
//! - [`preprocessing::Discretizer`] - binning
//! - [`preprocessing::FeatureSelector`] - supervised feature selection
//! - [`preprocessing::DimensionalityReducer`] - PCA
//!
//! # Modules
//!
//! ## Adapters
//! - [`preprocessing`] - the [`preprocessing::Adapter`] trait, the adapters
//!   and [`preprocessing::Pipeline`]
//!
//! ## Estimators
//! - [`imputation`] - simple, KNN and iterative imputers
//! - [`encoding`] - ordinal and one-hot encoders
//! - [`scaling`] - standard and min-max scalers
//! - [`discretization`] - k-bins discretizer
//! - [`feature_selection`] - univariate tests and sequential search
//! - [`decomposition`] - PCA
//! - [`training`] - probe models and cross-validation
//!
//! Data is an `ndarray::Array2<f64>` with samples as rows; missing values are
//! `NaN`.

pub mod error;

pub mod preprocessing;

pub mod decomposition;
pub mod discretization;
pub mod encoding;
pub mod feature_selection;
pub mod imputation;
pub mod scaling;
pub mod training;

pub(crate) mod utils;

pub use error::{PrepError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{PrepError, Result};
    pub use crate::preprocessing::{
        Adapter, DimensionalityReducer, Discretizer, DiscretizerConfig, EncodeMethod, Encoder,
        EncoderConfig, FeatureSelector, FeatureSelectorConfig, ImputeMethod, Imputer, ImputerConfig,
        Pipeline, ReducerConfig, ScaleMethod, Scaler, ScalerConfig, SelectionMethod, Step,
    };
}
