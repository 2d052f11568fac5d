//! Integration test: all six adapters chained in one pipeline

use ndarray::{Array1, Array2};
use tabprep::prelude::*;

/// First column is categorical, the rest numeric with a few gaps
fn mixed_data() -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((40, 5), |(i, j)| match j {
        0 => (i % 3) as f64,
        1 => i as f64 * 0.25,
        2 if i % 9 == 4 => f64::NAN,
        2 => ((i * 7) % 11) as f64,
        3 => (i as f64).sqrt(),
        _ => ((i * 3) % 5) as f64 - 2.0,
    });
    let y = Array1::from_shape_fn(40, |i| i as f64 * 0.5 + (i % 3) as f64);
    (x, y)
}

fn full_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(Imputer::new(ImputerConfig::new().with_method(ImputeMethod::Knn)))
        .with_step(Encoder::default())
        .with_step(Scaler::new(ScalerConfig::new().with_apply(true)))
        .with_step(Discretizer::default())
        .with_step(FeatureSelector::new(
            FeatureSelectorConfig::new()
                .with_apply(true)
                .with_method_name("Percentile_f_reg")
                .with_percentile(80.0),
        ))
        .with_step(DimensionalityReducer::new(ReducerConfig::new().with_apply(true)))
}

#[test]
fn test_full_pipeline_fit_transform() {
    let (x, y) = mixed_data();
    let mut pipeline = full_pipeline();
    assert_eq!(pipeline.len(), 6);

    let out = pipeline.fit_transform(&x, Some(&y)).unwrap();
    assert_eq!(out.dim(), (40, 2));
    assert!(out.iter().all(|v| v.is_finite()));
    assert!(pipeline.is_fitted());

    let again = pipeline.transform(&x).unwrap();
    assert_eq!(again, out);
}

#[test]
fn test_pipeline_step_names() {
    let names: Vec<&str> = full_pipeline().steps().iter().map(Step::name).collect();
    assert_eq!(
        names,
        vec!["Imputer", "Encoder", "Scaler", "Discretizer", "FeatureSelector", "DimensionalityReducer"]
    );
}

#[test]
fn test_missing_target_reports_selector_step() {
    let (x, _) = mixed_data();
    let mut pipeline = full_pipeline();
    match pipeline.fit(&x, None) {
        Err(PrepError::Step { index, adapter, source }) => {
            assert_eq!(index, 4);
            assert_eq!(adapter, "FeatureSelector");
            assert!(matches!(*source, PrepError::InvalidArgument(_)));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_fitted_pipeline_round_trips_through_json() {
    let (x, y) = mixed_data();
    let mut pipeline = full_pipeline();
    let out = pipeline.fit_transform(&x, Some(&y)).unwrap();

    let json = serde_json::to_string(&pipeline).unwrap();
    let restored: Pipeline = serde_json::from_str(&json).unwrap();
    assert!(restored.is_fitted());
    assert_eq!(restored.transform(&x).unwrap(), out);
}
