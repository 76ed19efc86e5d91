use super::dates::{is_date_a, is_date_b};

static HEADER_COLUMNS: [&str; 4] = ["total", "used", "free", "available"];
static ROW_PREFIXES: [&str; 2] = ["Mem:", "Swap:"];

fn is_row(trimmed: &str) -> bool {
    ROW_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// The `free` column banner: every column name present, not a row.
pub fn is_header(trimmed: &str) -> bool {
    HEADER_COLUMNS.iter().all(|c| trimmed.contains(c)) && !is_row(trimmed)
}

pub fn is_data(trimmed: &str) -> bool {
    is_row(trimmed) && !is_date_a(trimmed) && !is_date_b(trimmed)
}
