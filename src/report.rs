//! Change records and summary statistics produced by a correction run.

use crate::normalizer::segment::Block;
use crate::parsers::Line;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedLine {
    pub line: String,
    pub original_line: usize,
}

impl From<&Line<'_>> for MovedLine {
    fn from(l: &Line<'_>) -> Self {
        MovedLine {
            line: l.text.to_string(),
            original_line: l.number,
        }
    }
}

/// Data rows that left (`removed`) or joined (`added`) a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MovedLines {
    pub removed: Vec<MovedLine>,
    pub added: Vec<MovedLine>,
}

impl MovedLines {
    pub fn between(original: &[Line<'_>], assigned: &[Line<'_>]) -> Self {
        let kept = |pool: &[Line<'_>], l: &Line<'_>| pool.iter().any(|o| o.number == l.number);
        MovedLines {
            removed: original
                .iter()
                .filter(|l| !kept(assigned, *l))
                .map(MovedLine::from)
                .collect(),
            added: assigned
                .iter()
                .filter(|l| !kept(original, *l))
                .map(MovedLine::from)
                .collect(),
        }
    }
}

/// One deviation found in, or fixed on, the input layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    DataRedistribution {
        block_number: usize,
        start_line: usize,
        original_data_count: usize,
        final_data_count: usize,
        moved_lines: MovedLines,
    },
    InvalidStructure {
        block_number: usize,
        start_line: usize,
        actual_lines: usize,
        expected_lines: usize,
    },
    MissingDates {
        block_number: usize,
        start_line: usize,
    },
    MissingHeader {
        block_number: usize,
        start_line: usize,
    },
    InvalidDataCount {
        block_number: usize,
        start_line: usize,
        actual: usize,
        expected: usize,
    },
    BlocksRedistributed {
        original_blocks: usize,
        final_blocks: usize,
    },
}

impl Change {
    pub fn kind(&self) -> &'static str {
        match self {
            Change::DataRedistribution { .. } => "data_redistribution",
            Change::InvalidStructure { .. } => "invalid_structure",
            Change::MissingDates { .. } => "missing_dates",
            Change::MissingHeader { .. } => "missing_header",
            Change::InvalidDataCount { .. } => "invalid_data_count",
            Change::BlocksRedistributed { .. } => "blocks_redistributed",
        }
    }

    /// `None` for records about the document as a whole.
    pub fn block_number(&self) -> Option<usize> {
        match *self {
            Change::DataRedistribution { block_number, .. }
            | Change::InvalidStructure { block_number, .. }
            | Change::MissingDates { block_number, .. }
            | Change::MissingHeader { block_number, .. }
            | Change::InvalidDataCount { block_number, .. } => Some(block_number),
            Change::BlocksRedistributed { .. } => None,
        }
    }

    fn start_line(&self) -> Option<usize> {
        match *self {
            Change::DataRedistribution { start_line, .. }
            | Change::InvalidStructure { start_line, .. }
            | Change::MissingDates { start_line, .. }
            | Change::MissingHeader { start_line, .. }
            | Change::InvalidDataCount { start_line, .. } => Some(start_line),
            Change::BlocksRedistributed { .. } => None,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(block), Some(line)) = (self.block_number(), self.start_line()) {
            write!(f, "block {} (line {}): ", block, line)?;
        }
        match self {
            Change::DataRedistribution {
                original_data_count,
                final_data_count,
                moved_lines,
                ..
            } => write!(
                f,
                "data redistributed ({} -> {} data lines, {} out, {} in)",
                original_data_count,
                final_data_count,
                moved_lines.removed.len(),
                moved_lines.added.len()
            ),
            Change::InvalidStructure {
                actual_lines,
                expected_lines,
                ..
            } => write!(f, "invalid structure ({} lines, expected {})", actual_lines, expected_lines),
            Change::MissingDates { .. } => f.write_str("missing date lines"),
            Change::MissingHeader { .. } => f.write_str("missing header line"),
            Change::InvalidDataCount { actual, expected, .. } => {
                write!(f, "invalid data count ({} data lines, expected {})", actual, expected)
            }
            Change::BlocksRedistributed {
                original_blocks,
                final_blocks,
            } => write!(f, "blocks redistributed ({} -> {} blocks)", original_blocks, final_blocks),
        }
    }
}

/// Emit a `DataRedistribution` record when `assigned` is not exactly `original`.
pub fn data_change(block: &Block<'_>, original: &[Line<'_>], assigned: &[Line<'_>]) -> Option<Change> {
    if !has_data_moved(original, assigned) {
        return None;
    }
    Some(Change::DataRedistribution {
        block_number: block.number,
        start_line: block.start_line,
        original_data_count: original.len(),
        final_data_count: assigned.len(),
        moved_lines: MovedLines::between(original, assigned),
    })
}

/// Order-sensitive comparison by original position.
pub fn has_data_moved(original: &[Line<'_>], assigned: &[Line<'_>]) -> bool {
    original.len() != assigned.len()
        || original
            .iter()
            .zip(assigned)
            .any(|(o, a)| o.number != a.number)
}

/// Summary numbers of a run. Always derived, never tracked on the side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Non-blank input lines.
    pub total_lines: usize,
    pub corrected_lines: usize,
    /// Provisional blocks found in the input.
    pub total_blocks: usize,
    pub corrected_blocks: usize,
    /// Distinct blocks named by at least one change record.
    pub fixed_blocks: usize,
    /// Sum of `|original - final|` over data redistribution records.
    pub data_lines_redistributed: usize,
}

impl Stats {
    pub fn derive(
        total_lines: usize,
        corrected_lines: usize,
        original: &[Block<'_>],
        corrected: &[Block<'_>],
        changes: &[Change],
    ) -> Self {
        let fixed: BTreeSet<usize> = changes.iter().filter_map(Change::block_number).collect();
        let data_lines_redistributed = changes
            .iter()
            .map(|c| match *c {
                Change::DataRedistribution {
                    original_data_count,
                    final_data_count,
                    ..
                } => original_data_count.abs_diff(final_data_count),
                _ => 0,
            })
            .sum();
        Stats {
            total_lines,
            corrected_lines,
            total_blocks: original.len(),
            corrected_blocks: corrected.len(),
            fixed_blocks: fixed.len(),
            data_lines_redistributed,
        }
    }
}
