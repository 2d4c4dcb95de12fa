use std::collections::HashSet;

use hdw_common::{cell_text, column_names, filter_rows, has_column, row_key};
use polars::prelude::{DataFrame, PolarsResult};

/// Removes duplicate rows, keeping the first occurrence in input order.
///
/// Rows are compared on `key` when the column exists. Rows whose key is null,
/// and every row when the key column is absent, are compared on all columns.
/// Returns the deduplicated frame and the number of rows removed.
pub fn dedupe_by_key(df: &DataFrame, key: Option<&str>) -> PolarsResult<(DataFrame, usize)> {
    let key = key.filter(|name| has_column(df, name));
    let all_columns = column_names(df);
    let mut seen_keys = HashSet::new();
    let mut seen_rows = HashSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let unique = match key.and_then(|name| cell_text(df, name, idx)) {
            Some(value) => seen_keys.insert(value),
            None => seen_rows.insert(row_key(df, idx, &all_columns)),
        };
        keep.push(unique);
    }
    let removed = keep.iter().filter(|keep| !**keep).count();
    if removed == 0 {
        return Ok((df.clone(), 0));
    }
    Ok((filter_rows(df, &keep)?, removed))
}
