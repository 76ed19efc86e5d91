use super::dates::{is_date_a, is_date_b};

// Substring match on purpose: vmstat column banners drift with alignment.
static HEADER_TOKENS: [&str; 5] = ["procs", "memory", "swap", "cpu", "r  b"];

pub fn is_header(trimmed: &str) -> bool {
    HEADER_TOKENS.iter().any(|token| trimmed.contains(token))
}

/// One or more whitespace separated unsigned integers and nothing else.
pub fn is_data(trimmed: &str) -> bool {
    is_numeric_row(trimmed) && !is_header(trimmed) && !is_date_a(trimmed) && !is_date_b(trimmed)
}

fn is_numeric_row(trimmed: &str) -> bool {
    let mut fields = trimmed.split_ascii_whitespace().peekable();
    fields.peek().is_some() && fields.all(|f| f.bytes().all(|b| b.is_ascii_digit()))
}
