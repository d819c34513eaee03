//! Calendar feature synthesis over the joined transaction tables.

use std::{fmt::Display, fs::File, path::PathBuf};

use chrono::{Datelike, NaiveDate, TimeDelta};
use indexmap::IndexMap;
use polars::prelude::*;
use tracing::{error, info, warn};

use crate::{config::Settings, data::table::read_csv, error::PipelineError, pipeline::list_csv};

pub const TRANSACTIONS: &str = "train_transaction";
pub const IDENTITY: &str = "train_identity";
pub const JOIN_KEY: &str = "TransactionID";
pub const TIME_INDEX: &str = "TransactionDT";
pub const FEATURE_FILE: &str = "train_transaction_features.csv";

/// Calendar breakdown of one timestamp. `weekday` counts from Monday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    pub month: u32,
    pub day: u32,
    pub weekday: u32,
    pub is_weekend: bool,
}

/// Interpret `seconds` as an offset from midnight of `reference`.
pub fn calendar_parts(seconds: f64, reference: NaiveDate) -> Option<CalendarParts> {
    if !seconds.is_finite() {
        return None;
    }
    let start = reference.and_hms_opt(0, 0, 0)?;
    let ts = start.checked_add_signed(TimeDelta::try_seconds(seconds.floor() as i64)?)?;
    let weekday = ts.weekday().num_days_from_monday();
    Some(CalendarParts {
        month: ts.month(),
        day: ts.day(),
        weekday,
        is_weekend: weekday >= 5,
    })
}

fn features_err(err: impl Display) -> PipelineError {
    PipelineError::Features(err.to_string())
}

/// Processed tables keyed by stem with the processed suffix removed.
fn load_processed(settings: &Settings) -> Result<IndexMap<String, DataFrame>, PipelineError> {
    let mut frames = IndexMap::new();
    for path in list_csv(&settings.processed_data_dir)? {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = stem
            .strip_suffix(settings.processed_suffix.as_str())
            .unwrap_or(&stem)
            .to_string();
        info!(file = %path.display(), "loading for feature engineering");
        match read_csv(&path) {
            Ok(df) => {
                frames.insert(name, df);
            }
            Err(err) => error!(file = %path.display(), error = %err, "failed to load"),
        }
    }
    Ok(frames)
}

/// Append month/day/weekday/weekend columns derived from `TransactionDT`.
pub fn add_calendar_features(df: &mut DataFrame, reference: NaiveDate) -> PolarsResult<()> {
    let seconds = df.column(TIME_INDEX)?.cast(&DataType::Float64)?;
    let parts: Vec<Option<CalendarParts>> = seconds
        .f64()?
        .into_iter()
        .map(|value| value.and_then(|s| calendar_parts(s, reference)))
        .collect();

    let months: Vec<Option<u32>> = parts.iter().map(|p| p.map(|p| p.month)).collect();
    let days: Vec<Option<u32>> = parts.iter().map(|p| p.map(|p| p.day)).collect();
    let weekdays: Vec<Option<u32>> = parts.iter().map(|p| p.map(|p| p.weekday)).collect();
    let weekends: Vec<Option<bool>> = parts.iter().map(|p| p.map(|p| p.is_weekend)).collect();

    df.with_column(Series::new(format!("MONTH({TIME_INDEX})").into(), months))?;
    df.with_column(Series::new(format!("DAY({TIME_INDEX})").into(), days))?;
    df.with_column(Series::new(format!("WEEKDAY({TIME_INDEX})").into(), weekdays))?;
    df.with_column(Series::new(format!("IS_WEEKEND({TIME_INDEX})").into(), weekends))?;
    Ok(())
}

/// Join transactions with identity (when present), derive calendar
/// features and write the matrix under the features directory.
pub fn build_feature_matrix(settings: &Settings) -> Result<PathBuf, PipelineError> {
    let mut frames = load_processed(settings)?;
    let Some(transactions) = frames.shift_remove(TRANSACTIONS) else {
        error!("{TRANSACTIONS} dataset is required for feature engineering");
        return Err(PipelineError::Features(format!(
            "{TRANSACTIONS} dataset not found in {}",
            settings.processed_data_dir.display()
        )));
    };

    let mut full = match frames.shift_remove(IDENTITY) {
        Some(identity) => {
            info!("merging identity features with transactions");
            transactions
                .left_join(&identity, [JOIN_KEY], [JOIN_KEY])
                .map_err(features_err)?
        }
        None => {
            warn!("{IDENTITY} dataset not found; proceeding with only transactions");
            transactions
        }
    };

    add_calendar_features(&mut full, settings.feature_reference_date).map_err(features_err)?;
    info!(columns = full.width(), rows = full.height(), "generated features");

    std::fs::create_dir_all(&settings.features_dir)
        .map_err(|e| PipelineError::io(&settings.features_dir, e))?;
    let out_path = settings.features_dir.join(FEATURE_FILE);
    let mut file = File::create(&out_path).map_err(|e| PipelineError::io(&out_path, e))?;
    CsvWriter::new(&mut file)
        .finish(&mut full)
        .map_err(features_err)?;
    info!(path = %out_path.display(), "feature matrix saved");
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 12, 1).unwrap()
    }

    #[test]
    fn one_day_after_reference_is_a_saturday() {
        let parts = calendar_parts(86_400.0, reference()).unwrap();
        assert_eq!(
            parts,
            CalendarParts {
                month: 12,
                day: 2,
                weekday: 5,
                is_weekend: true,
            }
        );
    }

    #[test]
    fn reference_day_itself_is_a_friday() {
        let parts = calendar_parts(0.0, reference()).unwrap();
        assert_eq!(parts.weekday, 4);
        assert!(!parts.is_weekend);
    }

    #[test]
    fn non_finite_offsets_have_no_calendar() {
        assert!(calendar_parts(f64::INFINITY, reference()).is_none());
    }

    #[test]
    fn calendar_columns_are_appended() {
        let mut df = DataFrame::new(vec![
            Series::new(JOIN_KEY.into(), vec![1i64, 2]),
            Series::new(TIME_INDEX.into(), vec![86_400i64, 40 * 86_400]),
        ])
        .unwrap();
        add_calendar_features(&mut df, reference()).unwrap();
        assert_eq!(df.width(), 6);
        let months = df.column("MONTH(TransactionDT)").unwrap().u32().unwrap();
        assert_eq!(months.get(0), Some(12));
        assert_eq!(months.get(1), Some(1));
    }
}
