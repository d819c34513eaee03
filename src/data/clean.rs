//! Fixed cleaning pass applied to every raw dataset.

use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::debug;

/// Forward-fill, de-duplicate, then tag text columns as categorical.
///
/// Never adds rows and never changes the column set.
pub fn clean(raw: &DataFrame) -> PolarsResult<DataFrame> {
    let filled = forward_fill(raw)?;
    let mut table = drop_duplicates(&filled)?;
    let tagged = tag_categoricals(&mut table)?;
    debug!(
        rows_in = raw.height(),
        rows_out = table.height(),
        dropped = filled.height() - table.height(),
        categorical = tagged,
        "cleaned table"
    );
    Ok(table)
}

/// Replace each missing cell with the last non-missing value above it in
/// the same column. Leading gaps stay missing.
pub fn forward_fill(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.fill_null(FillNullStrategy::Forward(None))
}

/// Drop rows equal to an earlier row, keeping first occurrences in order.
/// Missing equals missing.
pub fn drop_duplicates(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.unique_stable(None, UniqueKeepStrategy::First, None)
}

/// Cast every text column that holds at least one value to `Categorical`.
/// Returns the number of columns tagged.
pub fn tag_categoricals(df: &mut DataFrame) -> PolarsResult<usize> {
    let textual: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|s| s.dtype() == &DataType::String && s.null_count() < s.len())
        .map(|s| s.name().to_string())
        .collect();
    for name in &textual {
        let tagged = df
            .column(name)?
            .cast(&DataType::Categorical(None, CategoricalOrdering::Lexical))?;
        df.with_column(tagged)?;
    }
    Ok(textual.len())
}

/// Sorted distinct non-missing values of a text or categorical column.
pub fn domain(series: &Series) -> PolarsResult<BTreeSet<String>> {
    let text = series.cast(&DataType::String)?;
    Ok(text.str()?.into_iter().flatten().map(str::to_string).collect())
}
