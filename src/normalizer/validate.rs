use super::segment::Block;
use crate::config::Layout;
use crate::report::Change;

/// Structural diagnostics for provisional blocks. Reports only; nothing is modified.
pub fn validate(blocks: &[Block<'_>], layout: &Layout) -> Vec<Change> {
    let mut changes = Vec::new();
    for block in blocks {
        let (block_number, start_line) = (block.number, block.start_line);
        if block.line_count() != layout.block_lines() {
            changes.push(Change::InvalidStructure {
                block_number,
                start_line,
                actual_lines: block.line_count(),
                expected_lines: layout.block_lines(),
            });
        }
        if block.dates.is_empty() {
            changes.push(Change::MissingDates { block_number, start_line });
        }
        if block.headers.is_empty() {
            changes.push(Change::MissingHeader { block_number, start_line });
        }
        if block.data.len() != layout.data {
            changes.push(Change::InvalidDataCount {
                block_number,
                start_line,
                actual: block.data.len(),
                expected: layout.data,
            });
        }
    }
    changes
}
