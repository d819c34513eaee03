//! CSV load/store for raw and cleaned tables.

use std::{fs, path::Path};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::PipelineError;

/// Cell tokens treated as missing when loading, mirroring pandas' defaults.
/// Empty fields are always missing.
pub const MISSING_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

fn read_options() -> CsvReadOptions {
    let null_values = NullValues::AllColumns(MISSING_TOKENS.iter().map(|t| (*t).into()).collect());
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
}

/// Load a comma-separated file with a header row.
///
/// A column is numeric when every non-missing cell parses as a number,
/// otherwise it is text. Columns with no values at all load as `Float64`.
/// Ragged rows and files without a header are load failures.
pub fn read_csv(path: &Path) -> Result<DataFrame, PipelineError> {
    let len = fs::metadata(path)
        .map_err(|e| PipelineError::io(path, e))?
        .len();
    if len == 0 {
        return Err(PipelineError::EmptyInput(path.to_path_buf()));
    }

    let load_err = |source| PipelineError::Load {
        path: path.to_path_buf(),
        source,
    };
    let mut df = read_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(load_err)?;
    if df.width() == 0 {
        return Err(PipelineError::EmptyInput(path.to_path_buf()));
    }

    let blank: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|s| s.dtype() == &DataType::String && s.null_count() == s.len())
        .map(|s| s.name().to_string())
        .collect();
    for name in blank {
        let numeric = df
            .column(&name)
            .and_then(|s| s.cast(&DataType::Float64))
            .map_err(load_err)?;
        df.with_column(numeric).map_err(load_err)?;
    }

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded csv"
    );
    Ok(df)
}

/// Serialise a frame to CSV bytes: header row first, missing cells empty.
pub fn to_csv_bytes(df: &mut DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(df)?;
    Ok(buf)
}

/// Write a frame to `path`, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), PipelineError> {
    let bytes = to_csv_bytes(df).map_err(|source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_bytes(path, &bytes)
}

pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| PipelineError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}
