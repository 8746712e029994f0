//! Fit a regression model on a train split and score it on both splits

use super::dataset::Dataset;
use super::error::Result;
use super::linear::PremiumModel;
use super::model::{ModelSpec, Regressor};
use super::metrics::{mean_absolute_error, r2_score, root_mean_squared_error, TrainingMetrics};

/// Split `dataset`, fit `spec` on the train part and report train/test scores
pub fn fit_and_eval(
    dataset: &Dataset,
    spec: &ModelSpec,
    test_size: f64,
    seed: u64,
) -> Result<(Regressor, TrainingMetrics)> {
    let (train, test) = dataset.train_test_split(test_size, seed)?;
    log::info!(
        "Training on {} rows, holding out {} from {}",
        train.len(),
        test.len(),
        dataset.label
    );

    let model = Regressor::fit(spec, &train.features(), &train.targets())?;

    let train_actual = train.targets();
    let test_actual = test.targets();
    let train_pred = model.predict_many(&train.features())?;
    let test_pred = model.predict_many(&test.features())?;

    let metrics = TrainingMetrics {
        model: model.name().to_string(),
        train_mae: mean_absolute_error(&train_actual, &train_pred),
        test_mae: mean_absolute_error(&test_actual, &test_pred),
        train_rmse: root_mean_squared_error(&train_actual, &train_pred),
        test_rmse: root_mean_squared_error(&test_actual, &test_pred),
        train_r2: r2_score(&train_actual, &train_pred),
        test_r2: r2_score(&test_actual, &test_pred),
        n_train: train.len(),
        n_test: test.len(),
        dataset: dataset.label.clone(),
    };

    log::info!(
        "{}: test MAE {:.4}, test RMSE {:.4}, test R2 {:.4}",
        metrics.model,
        metrics.test_mae,
        metrics.test_rmse,
        metrics.test_r2
    );

    Ok((model, metrics))
}
