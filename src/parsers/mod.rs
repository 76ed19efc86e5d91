pub mod cpu;
pub mod dates;
pub mod memory;

use crate::config::Variant;
use memchr::memchr_iter;
use serde::Serialize;

/// What a single non-blank line of a snapshot log is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// `12/05/2024_14:30:00`
    DateA,
    /// `Mon Dec 5 14:30:00 -05 2024`
    DateB,
    Header,
    Data,
    Unknown,
}

/// A non-blank input line. `number` is its 1-based position once blank lines are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub number: usize,
    pub kind: LineKind,
}

pub fn classify(line: &str, variant: Variant) -> LineKind {
    let trimmed = line.trim();
    if dates::is_date_a(trimmed) {
        return LineKind::DateA;
    }
    if dates::is_date_b(trimmed) {
        return LineKind::DateB;
    }
    let (is_header, is_data): (fn(&str) -> bool, fn(&str) -> bool) = match variant {
        Variant::Cpu => (cpu::is_header, cpu::is_data),
        Variant::Memory => (memory::is_header, memory::is_data),
    };
    if is_header(trimmed) {
        LineKind::Header
    } else if is_data(trimmed) {
        LineKind::Data
    } else {
        LineKind::Unknown
    }
}

/// Split `input` on `\n`, drop blank lines and classify the rest.
///
/// Line text is borrowed from `input` untouched (a trailing `\r` survives);
/// only classification looks at the trimmed form. A leading byte-order mark
/// is not part of the first line.
pub fn split_lines(input: &str, variant: Variant) -> Vec<Line<'_>> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 40);
    let mut start = 0;
    for nl in memchr_iter(b'\n', bytes) {
        push_line(&input[start..nl], variant, &mut out);
        start = nl + 1;
    }
    if start < bytes.len() {
        push_line(&input[start..], variant, &mut out);
    }
    out
}

fn push_line<'a>(text: &'a str, variant: Variant, out: &mut Vec<Line<'a>>) {
    if text.trim().is_empty() {
        return;
    }
    out.push(Line {
        text,
        number: out.len() + 1,
        kind: classify(text, variant),
    });
}
