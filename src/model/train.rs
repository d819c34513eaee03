//! Fit a logistic classifier over a numeric feature CSV.

use std::path::Path;

use linfa::{dataset::DatasetBase, prelude::Fit};
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2};
use polars::prelude::{CsvReadOptions, DataFrame, DataType, SerReader};
use tracing::{info, warn};

use super::{LogisticModel, ModelError};

pub const DEFAULT_TARGET: &str = "isFraud";

fn training_err(err: impl std::fmt::Display) -> ModelError {
    ModelError::Training(err.to_string())
}

/// Read `csv_path` and fit a model predicting `target` from every other
/// numeric column. Missing feature values are treated as zero.
pub fn train_from_csv(
    csv_path: &Path,
    target: &str,
    max_iterations: u64,
) -> Result<LogisticModel, ModelError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(csv_path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(training_err)?;
    info!(path = %csv_path.display(), rows = df.height(), "loaded training data");
    train(&df, target, max_iterations)
}

pub fn train(df: &DataFrame, target: &str, max_iterations: u64) -> Result<LogisticModel, ModelError> {
    let labels: Vec<i64> = df
        .column(target)
        .and_then(|s| s.cast(&DataType::Int64))
        .map_err(training_err)?
        .i64()
        .map_err(training_err)?
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ModelError::Training(format!("target `{target}` has missing values")))?;

    let mut feature_names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for series in df.get_columns() {
        let name = series.name().to_string();
        if name == target {
            continue;
        }
        if !series.dtype().is_numeric() {
            warn!(column = %name, dtype = %series.dtype(), "skipping non-numeric column");
            continue;
        }
        let values: Vec<f64> = series
            .cast(&DataType::Float64)
            .map_err(training_err)?
            .f64()
            .map_err(training_err)?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        feature_names.push(name);
        columns.push(values);
    }
    if columns.is_empty() {
        return Err(ModelError::Training("no numeric feature columns".to_string()));
    }

    let rows = labels.len();
    let x = Array2::from_shape_fn((rows, columns.len()), |(r, c)| columns[c][r]);
    let y = Array1::from(labels);
    let dataset = DatasetBase::new(x, y);

    let fitted = LogisticRegression::default()
        .max_iterations(max_iterations)
        .fit(&dataset)
        .map_err(training_err)?;

    let model = LogisticModel {
        feature_names,
        coefficients: fitted.params().to_vec(),
        intercept: fitted.intercept(),
        positive_class: fitted.labels().pos.class,
        negative_class: fitted.labels().neg.class,
    };
    info!(features = model.coefficients.len(), "trained logistic model");
    Ok(model)
}
