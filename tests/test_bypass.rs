//! Property test: a bypassed adapter is the identity, whatever its config says

use ndarray::Array2;
use proptest::prelude::*;
use tabprep::prelude::*;

fn matrix() -> impl Strategy<Value = Array2<f64>> {
    (1usize..8, 1usize..5).prop_flat_map(|(rows, cols)| {
        let cell = prop_oneof![4 => -1e6f64..1e6, 1 => Just(f64::NAN)];
        prop::collection::vec(cell, rows * cols)
            .prop_map(move |values| Array2::from_shape_vec((rows, cols), values).unwrap())
    })
}

/// Equal shape and bit-identical values, so NaN compares equal to NaN
fn identical(a: &Array2<f64>, b: &Array2<f64>) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn check_bypass<A: Adapter>(mut adapter: A, x: &Array2<f64>) -> std::result::Result<(), TestCaseError> {
    prop_assert!(adapter.is_bypassed());
    adapter.fit(x, None).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert!(!adapter.is_fitted());
    let out = adapter.transform(x).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert!(identical(&out, x));
    Ok(())
}

proptest! {
    #[test]
    fn bypass_is_identity(x in matrix(), method in "[A-Za-z_-]{0,16}") {
        check_bypass(Imputer::new(ImputerConfig::new().with_apply(false).with_method_name(method.clone())), &x)?;
        check_bypass(
            Encoder::new(EncoderConfig::new().with_method_name(method.clone()).with_drop_name(method.clone())),
            &x,
        )?;
        check_bypass(Scaler::new(ScalerConfig::new().with_method_name(method.clone())), &x)?;
        check_bypass(
            Discretizer::new(DiscretizerConfig::new().with_strategy_name(method.clone()).with_n_bins(0)),
            &x,
        )?;
        check_bypass(FeatureSelector::new(FeatureSelectorConfig::new().with_method_name(method)), &x)?;
        check_bypass(DimensionalityReducer::new(ReducerConfig::new().with_n_components(0)), &x)?;
    }

    #[test]
    fn bypassed_pipeline_is_identity(x in matrix()) {
        let mut pipeline = Pipeline::new()
            .with_step(Imputer::new(ImputerConfig::new().with_apply(false)))
            .with_step(Encoder::default())
            .with_step(Scaler::default())
            .with_step(Discretizer::default())
            .with_step(FeatureSelector::default())
            .with_step(DimensionalityReducer::default());
        prop_assert!(pipeline.is_bypassed());
        let out = pipeline.fit_transform(&x, None).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(identical(&out, &x));
    }
}
