use std::cmp::Ordering;

use crate::models::{Row, SortColumn};

/// Sort key substituted for a missing numeric value: bottom when descending, top when ascending.
pub const MISSING_NUMBER: f64 = -999_999.0;

fn numeric_key(row: &Row, column: SortColumn) -> f64 {
    let value = match column {
        SortColumn::Sing => row.sing.map(|v| v as f64),
        SortColumn::Dance => row.dance.map(|v| v as f64),
        SortColumn::Rally => row.rally,
        SortColumn::Name => None,
    };
    value.unwrap_or(MISSING_NUMBER)
}

fn compare(a: &Row, b: &Row, column: SortColumn) -> Ordering {
    match column {
        // Case-sensitive; a missing name deserializes to "" and sorts first.
        SortColumn::Name => a.name.as_str().cmp(b.name.as_str()),
        _ => numeric_key(a, column).total_cmp(&numeric_key(b, column)),
    }
}

/// Stable sort by one column. Equal keys keep their input order in both directions.
pub fn sort_rows(rows: &[Row], column: SortColumn, descending: bool) -> Vec<Row> {
    let mut sorted = rows.to_vec();
    if descending {
        sorted.sort_by(|a, b| compare(b, a, column));
    } else {
        sorted.sort_by(|a, b| compare(a, b, column));
    }
    sorted
}

/// Number of pages needed for `total` rows; never less than 1.
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Rows on a 1-based page. Out-of-range pages yield an empty slice.
pub fn paginate(rows: &[Row], page: i64, page_size: usize) -> &[Row] {
    let page_size = page_size.max(1);
    if page < 1 {
        return &[];
    }
    let start = match usize::try_from(page - 1)
        .ok()
        .and_then(|p| p.checked_mul(page_size))
    {
        Some(start) if start < rows.len() => start,
        _ => return &[],
    };
    let end = (start + page_size).min(rows.len());
    &rows[start..end]
}
