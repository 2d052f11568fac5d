//! Ordered chain of preprocessing adapters

use super::{Adapter, DimensionalityReducer, Discretizer, Encoder, FeatureSelector, Imputer, Scaler};
use crate::error::{PrepError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Step {
    Imputer(Imputer),
    Encoder(Encoder),
    Scaler(Scaler),
    Discretizer(Discretizer),
    FeatureSelector(FeatureSelector),
    DimensionalityReducer(DimensionalityReducer),
}

impl Step {
    /// Name of the wrapped adapter
    pub fn name(&self) -> &'static str {
        match self {
            Step::Imputer(_) => Imputer::NAME,
            Step::Encoder(_) => Encoder::NAME,
            Step::Scaler(_) => Scaler::NAME,
            Step::Discretizer(_) => Discretizer::NAME,
            Step::FeatureSelector(_) => FeatureSelector::NAME,
            Step::DimensionalityReducer(_) => DimensionalityReducer::NAME,
        }
    }

    fn fit_transform(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array2<f64>> {
        match self {
            Step::Imputer(a) => a.fit_transform(x, y),
            Step::Encoder(a) => a.fit_transform(x, y),
            Step::Scaler(a) => a.fit_transform(x, y),
            Step::Discretizer(a) => a.fit_transform(x, y),
            Step::FeatureSelector(a) => a.fit_transform(x, y),
            Step::DimensionalityReducer(a) => a.fit_transform(x, y),
        }
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Step::Imputer(a) => a.transform(x),
            Step::Encoder(a) => a.transform(x),
            Step::Scaler(a) => a.transform(x),
            Step::Discretizer(a) => a.transform(x),
            Step::FeatureSelector(a) => a.transform(x),
            Step::DimensionalityReducer(a) => a.transform(x),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            Step::Imputer(a) => a.is_fitted(),
            Step::Encoder(a) => a.is_fitted(),
            Step::Scaler(a) => a.is_fitted(),
            Step::Discretizer(a) => a.is_fitted(),
            Step::FeatureSelector(a) => a.is_fitted(),
            Step::DimensionalityReducer(a) => a.is_fitted(),
        }
    }

    fn is_bypassed(&self) -> bool {
        match self {
            Step::Imputer(a) => a.is_bypassed(),
            Step::Encoder(a) => a.is_bypassed(),
            Step::Scaler(a) => a.is_bypassed(),
            Step::Discretizer(a) => a.is_bypassed(),
            Step::FeatureSelector(a) => a.is_bypassed(),
            Step::DimensionalityReducer(a) => a.is_bypassed(),
        }
    }

    fn wrap_error(&self, index: usize, source: PrepError) -> PrepError {
        PrepError::Step {
            index,
            adapter: self.name(),
            source: Box::new(source),
        }
    }
}

macro_rules! impl_from_adapter {
    ($($adapter:ident),*) => {
        $(
            impl From<$adapter> for Step {
                fn from(adapter: $adapter) -> Self {
                    Step::$adapter(adapter)
                }
            }
        )*
    };
}

impl_from_adapter!(Imputer, Encoder, Scaler, Discretizer, FeatureSelector, DimensionalityReducer);

/// Runs adapters in order, feeding each output to the next step.
///
/// The target passed to `fit` reaches every step unchanged, so supervised
/// steps must not follow a step that drops rows (none of the adapters do).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<Step>,
    /// Seconds spent in the last fit
    fit_time: Option<f64>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn with_step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn push(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }
}

impl Adapter for Pipeline {
    const NAME: &'static str = "Pipeline";

    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<&mut Self> {
        self.fit_transform(x, y)?;
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut current = x.clone();
        for (index, step) in self.steps.iter().enumerate() {
            current = step
                .transform(&current)
                .map_err(|e| step.wrap_error(index, e))?;
        }
        Ok(current)
    }

    fn fit_transform(&mut self, x: &Array2<f64>, y: Option<&Array1<f64>>) -> Result<Array2<f64>> {
        let start = Instant::now();
        self.fit_time = None;

        let mut current = x.clone();
        for (index, step) in self.steps.iter_mut().enumerate() {
            current = step
                .fit_transform(&current, y)
                .map_err(|e| step.wrap_error(index, e))?;
        }

        let elapsed = start.elapsed().as_secs_f64();
        self.fit_time = Some(elapsed);
        tracing::debug!(
            n_steps = self.steps.len(),
            output_features = current.ncols(),
            elapsed_secs = elapsed,
            "Pipeline fitted"
        );
        Ok(current)
    }

    /// True when every step is fitted or bypassed
    fn is_fitted(&self) -> bool {
        self.steps.iter().all(|s| s.is_fitted() || s.is_bypassed())
    }

    /// True when every step is bypassed
    fn is_bypassed(&self) -> bool {
        self.steps.iter().all(Step::is_bypassed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{ImputerConfig, ScaleMethod, ScalerConfig};
    use ndarray::array;

    #[test]
    fn test_impute_then_scale() {
        let x = array![[1.0, f64::NAN], [3.0, 4.0], [5.0, 6.0]];
        let mut pipeline = Pipeline::new()
            .with_step(Imputer::default())
            .with_step(Scaler::new(
                ScalerConfig::new().with_apply(true).with_method(ScaleMethod::MinMax),
            ));
        let out = pipeline.fit_transform(&x, None).unwrap();
        assert_eq!(out, array![[0.0, 0.0], [0.5, 0.0], [1.0, 1.0]]);
        assert!(pipeline.is_fitted());
        assert!(pipeline.fit_time().is_some());
        assert_eq!(pipeline.transform(&x).unwrap(), out);
    }

    #[test]
    fn test_error_carries_step_index() {
        let x = array![[1.0], [2.0]];
        let mut pipeline = Pipeline::new()
            .with_step(Imputer::default())
            .with_step(Scaler::new(ScalerConfig::new().with_apply(true).with_method_name("log")));
        match pipeline.fit(&x, None) {
            Err(PrepError::Step { index, adapter, source }) => {
                assert_eq!(index, 1);
                assert_eq!(adapter, "Scaler");
                assert!(matches!(*source, PrepError::InvalidConfiguration { .. }));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_transform_before_fit() {
        let pipeline = Pipeline::new().with_step(Imputer::new(ImputerConfig::default()));
        assert!(!pipeline.is_fitted());
        assert!(matches!(
            pipeline.transform(&array![[1.0]]),
            Err(PrepError::Step { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let x = array![[1.0, 2.0]];
        let mut pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.fit_transform(&x, None).unwrap(), x);
    }
}
