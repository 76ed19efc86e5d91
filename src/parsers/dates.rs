//! Timestamp lines shared by both snapshot variants.

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII classes only: Unicode digits and letters are not timestamps.
const DATE_A_PATTERN: &str = r"^[0-9]{2}/[0-9]{2}/[0-9]{4}_[0-9]{2}:[0-9]{2}:[0-9]{2}$";
const DATE_B_PATTERN: &str =
    r"^(Mon|Tue|Wed|Thu|Fri|Sat|Sun)\s+[A-Za-z0-9_]+\s+[0-9]+\s+[0-9]{2}:[0-9]{2}:[0-9]{2}\s+-[0-9]{2}\s+[0-9]{4}$";

static DATE_A_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DATE_A_PATTERN).expect("failed to compile date-A regex"));
static DATE_B_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DATE_B_PATTERN).expect("failed to compile date-B regex"));

/// `dd/mm/yyyy_HH:MM:SS`, as written by the capture script.
pub fn is_date_a(trimmed: &str) -> bool {
    DATE_A_REGEX.is_match(trimmed)
}

/// `date` output with a negative numeric zone, e.g. `Tue Mar 4 09:15:00 -03 2025`.
pub fn is_date_b(trimmed: &str) -> bool {
    DATE_B_REGEX.is_match(trimmed)
}
