//! Gain estimator tests

use pid_analyzer::analysis::StepMetrics;
use pid_analyzer::config::ForestConfig;
use pid_analyzer::estimator::{
    FeatureVector, GainEstimator, RandomForestRegressor, Regressor, MIN_TRAINING_RECORDS,
};
use pid_analyzer::experiment::{ExperimentResult, Gains};
use pid_analyzer::{Error, Result, Stage};

fn record(kp: f64, ki: f64, kd: f64, metrics: [f64; 4]) -> ExperimentResult {
    let [rise_time, settling_time, overshoot, steady_state_error] = metrics;
    ExperimentResult::new(
        37.0,
        Gains::new(kp, ki, kd),
        StepMetrics {
            rise_time,
            settling_time,
            overshoot,
            steady_state_error,
        },
    )
}

fn three_records() -> Vec<ExperimentResult> {
    vec![
        record(1.0, 0.05, 0.2, [40.0, 160.0, 0.0, 0.8]),
        record(2.5, 0.10, 0.5, [25.0, 110.0, 4.0, 0.3]),
        record(4.0, 0.20, 0.9, [15.0, 140.0, 12.0, 0.1]),
    ]
}

/// Returns the first feature, ignoring training
#[derive(Debug, Clone, Default)]
struct EchoRiseTime {
    fitted: bool,
}

impl Regressor for EchoRiseTime {
    fn fit(&mut self, _features: &[FeatureVector], _labels: &[f64]) -> Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn predict_one(&self, features: &FeatureVector) -> Result<f64> {
        assert!(self.fitted, "predict before fit");
        Ok(features[0])
    }
}

#[test]
fn test_fewer_than_three_records_is_insufficient_data() {
    let estimator = GainEstimator::new(ForestConfig::default()).unwrap();
    for n in 0..MIN_TRAINING_RECORDS {
        let err = estimator.recommend(&three_records()[..n]).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                needed: 3,
                available,
                ..
            } if available == n
        ));
        assert_eq!(err.stage(), Stage::Training);
    }
}

#[test]
fn test_three_records_give_finite_triple() {
    let rec = GainEstimator::new(ForestConfig::default())
        .unwrap()
        .recommend(&three_records())
        .unwrap();

    assert!(rec.kp.is_finite() && rec.ki.is_finite() && rec.kd.is_finite());
    assert_eq!(rec.records_used, 3);
    // Tree leaves are label means, so predictions stay within the label range
    assert!((1.0..=4.0).contains(&rec.kp));
    assert!((0.05..=0.20).contains(&rec.ki));
    assert!((0.2..=0.9).contains(&rec.kd));
}

#[test]
fn test_models_are_evaluated_at_mean_features() {
    let rec = GainEstimator::with_regressor(EchoRiseTime::default())
        .recommend(&three_records())
        .unwrap();
    let expected_rise = (40.0 + 25.0 + 15.0) / 3.0;
    assert!((rec.kp - expected_rise).abs() < 1e-12);
    assert!((rec.mean_features[2] - 16.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_recommend_is_repeatable() {
    let estimator = GainEstimator::new(ForestConfig::default()).unwrap();
    let records = three_records();
    let first = estimator.recommend(&records).unwrap();
    let second = estimator.recommend(&records).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_constant_features_are_training_error() {
    let metrics = [20.0, 100.0, 5.0, 0.2];
    let records = vec![
        record(1.0, 0.1, 0.1, metrics),
        record(2.0, 0.2, 0.2, metrics),
        record(3.0, 0.3, 0.3, metrics),
    ];
    let err = GainEstimator::new(ForestConfig::default())
        .unwrap()
        .recommend(&records)
        .unwrap_err();
    assert!(matches!(err, Error::Training(ref msg) if msg.contains("degenerate")));
}

#[test]
fn test_nan_metric_is_training_error() {
    let mut records = three_records();
    records.push(record(1.0, 0.1, 0.1, [f64::NAN, 1.0, 1.0, 1.0]));
    let err = GainEstimator::new(ForestConfig::default())
        .unwrap()
        .recommend(&records)
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Training);
}

#[test]
fn test_forest_seed_controls_output() {
    let features: Vec<FeatureVector> = (0_i32..20)
        .map(|i| {
            let x = f64::from(i);
            [x, 3.0 * x + 1.0, (x * 0.7).sin(), 0.1 * x]
        })
        .collect();
    let labels: Vec<f64> = (0_i32..20).map(|i| f64::from(i % 7)).collect();
    let query = [9.5, 29.5, 0.3, 0.95];

    let predict = |seed| {
        let config = ForestConfig {
            seed,
            n_trees: 25,
            ..ForestConfig::default()
        };
        let mut forest = RandomForestRegressor::new(config).unwrap();
        forest.fit(&features, &labels).unwrap();
        forest.predict_one(&query).unwrap()
    };

    assert_eq!(predict(7).to_bits(), predict(7).to_bits());
}

#[test]
fn test_forest_without_bootstrap_reproduces_training_labels() {
    let features: Vec<FeatureVector> = (0_i32..6).map(|i| [f64::from(i), 0.0, 0.0, 0.0]).collect();
    let labels = vec![1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
    let config = ForestConfig {
        bootstrap: false,
        n_trees: 3,
        ..ForestConfig::default()
    };
    let mut forest = RandomForestRegressor::new(config).unwrap();
    forest.fit(&features, &labels).unwrap();

    for (row, label) in features.iter().zip(&labels) {
        assert!((forest.predict_one(row).unwrap() - label).abs() < 1e-12);
    }
}

#[test]
fn test_unfitted_forest_cannot_predict() {
    let forest = RandomForestRegressor::default();
    assert!(!forest.is_fitted());
    assert!(matches!(forest.predict_one(&[1.0; 4]), Err(Error::Training(_))));
}

#[test]
fn test_invalid_forest_config_rejected() {
    let config = ForestConfig {
        n_trees: 0,
        ..ForestConfig::default()
    };
    assert!(matches!(RandomForestRegressor::new(config), Err(Error::Config(_))));
}

#[test]
fn test_recommendation_artifact_format() {
    let rec = GainEstimator::with_regressor(EchoRiseTime::default())
        .recommend(&three_records())
        .unwrap();
    let text = rec.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["Kp: 26.667", "Ki: 26.667", "Kd: 26.667"]);
}
