//! Block reconstruction engine shared by both snapshot variants.
//!
//! classify -> segment -> (backfill) -> (validate) -> redistribute -> render.
//! Everything here is a pure function of the input text.

pub mod redistribute;
pub mod render;
pub mod segment;
pub mod validate;

use crate::config::Variant;
use crate::parsers::split_lines;
use crate::report::{Change, Stats};
use serde::Serialize;

/// Result of correcting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correction {
    pub corrected_text: String,
    pub changes: Vec<Change>,
    pub stats: Stats,
}

impl Correction {
    /// True when the input already had the canonical layout.
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }
}

pub fn correct_cpu_variant(input: &str) -> Correction {
    correct(input, Variant::Cpu)
}

pub fn correct_memory_variant(input: &str) -> Correction {
    correct(input, Variant::Memory)
}

pub fn correct(input: &str, variant: Variant) -> Correction {
    let layout = variant.layout();
    let lines = split_lines(input, variant);

    let mut blocks = segment::segment(&lines);
    if layout.backfill_headers {
        segment::backfill_headers(&mut blocks);
    }

    let mut changes = if layout.validate {
        validate::validate(&blocks, layout)
    } else {
        Vec::new()
    };

    let (corrected, moved) = if layout.rebuild_from_pools {
        redistribute::rebuild_from_pools(&blocks, layout)
    } else {
        redistribute::redistribute_data(&blocks, layout.data)
    };
    changes.extend(moved);

    let rendered = render::render(&corrected, layout);
    let stats = Stats::derive(lines.len(), rendered.len(), &blocks, &corrected, &changes);

    Correction {
        corrected_text: rendered.join("\n"),
        changes,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::LineKind;

    const SCENARIO_A: &str = "01/01/2024_10:00:00\nprocs memory swap cpu\n1 2 3\n4 5 6\n\
                              01/01/2024_10:05:00\n7 8 9\n10 11 12\n13 14 15";

    const MESSY_CPU: &str = "\
procs -----------memory---------- ---swap-- -----io---- -system-- ------cpu-----
 r  b   swpd   free   buff  cache   si   so    bi    bo   in   cs us sy id wa st
 1  0 0 100 0 0 0 0 0 0 0 0 1 0 99 0 0
05/03/2024_08:00:00
Tue Mar 5 08:00:00 -03 2024
procs -----------memory---------- ---swap-- -----io---- -system-- ------cpu-----
 r  b   swpd   free   buff  cache   si   so    bi    bo   in   cs us sy id wa st
procs -----------memory---------- ---swap-- -----io---- -system-- ------cpu-----
 1  0 0 101 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 102 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 103 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 104 0 0 0 0 0 0 0 0 1 0 99 0 0

05/03/2024_08:01:00
Tue Mar 5 08:01:00 -03 2024
 1  0 0 105 0 0 0 0 0 0 0 0 1 0 99 0 0
05/03/2024_08:02:00
Tue Mar 5 08:02:00 -03 2024
procs -----------memory---------- ---swap-- -----io---- -system-- ------cpu-----
 r  b   swpd   free   buff  cache   si   so    bi    bo   in   cs us sy id wa st
 1  0 0 106 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 107 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 108 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 109 0 0 0 0 0 0 0 0 1 0 99 0 0
 1  0 0 110 0 0 0 0 0 0 0 0 1 0 99 0 0
";

    const CANONICAL_MEMORY: &str = "\
01/01/2024_10:00:00
Mon Jan 1 10:00:00 -05 2024
              total        used        free      shared  buff/cache   available
Mem:           7821        1534        4121         210        2165        5812
Swap:          2047           0        2047
01/01/2024_10:05:00
Mon Jan 1 10:05:00 -05 2024
              total        used        free      shared  buff/cache   available
Mem:           7821        1540        4115         210        2165        5806
Swap:          2047           0        2047";

    fn data_rows(text: &str) -> Vec<&str> {
        let mut rows: Vec<&str> = text
            .lines()
            .filter(|l| crate::parsers::classify(l, Variant::Cpu) == LineKind::Data)
            .collect();
        rows.sort_unstable();
        rows
    }

    #[test]
    fn scenario_a_rebalances_blocks() {
        let result = correct_cpu_variant(SCENARIO_A);
        assert_eq!(
            result.corrected_text,
            "01/01/2024_10:00:00\nprocs memory swap cpu\n1 2 3\n4 5 6\n7 8 9\n\
             01/01/2024_10:05:00\nprocs memory swap cpu\n10 11 12\n13 14 15"
        );
        let blocks: Vec<Option<usize>> = result.changes.iter().map(Change::block_number).collect();
        assert_eq!(blocks, vec![Some(1), Some(2)]);
        assert_eq!(result.stats.total_lines, 8);
        assert_eq!(result.stats.corrected_lines, 9);
        assert_eq!(result.stats.total_blocks, 2);
        assert_eq!(result.stats.fixed_blocks, 2);
        assert_eq!(result.stats.data_lines_redistributed, 2);
        match &result.changes[0] {
            Change::DataRedistribution { moved_lines, .. } => {
                assert_eq!(moved_lines.added.len(), 1);
                assert_eq!(moved_lines.added[0].line, "7 8 9");
                assert_eq!(moved_lines.added[0].original_line, 6);
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn cpu_output_is_a_fixed_point() {
        for input in [SCENARIO_A, MESSY_CPU] {
            let first = correct_cpu_variant(input);
            assert!(!first.is_clean());
            let second = correct_cpu_variant(&first.corrected_text);
            assert!(second.is_clean(), "{:?}", second.changes);
            assert_eq!(second.corrected_text, first.corrected_text);
        }
    }

    #[test]
    fn cpu_conserves_data_rows() {
        let result = correct_cpu_variant(MESSY_CPU);
        assert_eq!(data_rows(MESSY_CPU), data_rows(&result.corrected_text));
    }

    #[test]
    fn cpu_blocks_have_fixed_shape_and_unique_headers() {
        let result = correct_cpu_variant(MESSY_CPU);
        let lines = split_lines(&result.corrected_text, Variant::Cpu);
        let blocks = segment::segment(&lines);
        assert_eq!(blocks.len(), 4);
        for block in &blocks[..blocks.len() - 1] {
            assert_eq!(block.data.len(), 3);
        }
        for block in &blocks {
            let mut texts: Vec<&str> = block.headers.iter().map(|h| h.text).collect();
            let before = texts.len();
            texts.sort_unstable();
            texts.dedup();
            assert_eq!(texts.len(), before);
            assert!(block.headers.len() <= 2);
        }
        // the header-less block inherits its predecessor's banner
        assert_eq!(blocks[2].headers.len(), 2);
    }

    #[test]
    fn blank_lines_never_count() {
        let with_blanks = "\n01/01/2024_10:00:00\n\n  \nprocs\n1 2 3\n\n4 5 6\n7 8 9\n\n";
        let result = correct_cpu_variant(with_blanks);
        assert_eq!(result.stats.total_lines, 5);
        assert_eq!(result.corrected_text, "01/01/2024_10:00:00\nprocs\n1 2 3\n4 5 6\n7 8 9");
        assert!(result.is_clean());
    }

    #[test]
    fn adjacent_headers_after_a_date_share_a_block() {
        let input = "01/01/2024_10:00:00\nprocs ---memory---\n r  b swpd\n1 2 3\n4 5 6\n7 8 9";
        let result = correct_cpu_variant(input);
        assert_eq!(result.stats.total_blocks, 1);
        assert!(result.is_clean());
        assert_eq!(result.corrected_text, input);
    }

    #[test]
    fn canonical_memory_is_untouched() {
        let result = correct_memory_variant(CANONICAL_MEMORY);
        assert!(result.is_clean(), "{:?}", result.changes);
        assert_eq!(result.corrected_text, CANONICAL_MEMORY);
        assert_eq!(result.stats.total_blocks, 2);
        assert_eq!(result.stats.corrected_blocks, 2);
    }

    #[test]
    fn memory_diagnostics_and_rebuild() {
        let input = "\
01/01/2024_10:00:00
Mon Jan 1 10:00:00 -05 2024
total used free shared buff/cache available
Mem: 1
Swap: 1
Mem: 2
Swap: 2
01/01/2024_10:05:00
Mon Jan 1 10:05:00 -05 2024
total used free shared buff/cache available
";
        let result = correct_memory_variant(input);
        let kinds: Vec<&str> = result.changes.iter().map(Change::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "invalid_structure",
                "invalid_data_count",
                "invalid_structure",
                "invalid_data_count",
                "data_redistribution",
                "data_redistribution",
            ]
        );
        assert_eq!(
            result.corrected_text,
            "01/01/2024_10:00:00\nMon Jan 1 10:00:00 -05 2024\ntotal used free shared buff/cache available\nMem: 1\nSwap: 1\n\
             01/01/2024_10:05:00\nMon Jan 1 10:05:00 -05 2024\ntotal used free shared buff/cache available\nMem: 2\nSwap: 2"
        );
        let again = correct_memory_variant(&result.corrected_text);
        assert!(again.is_clean());
    }

    #[test]
    fn repeated_date_a_splits_a_memory_block() {
        let input = "01/01/2024_10:00:00\n01/01/2024_10:00:01\n\
                     total used free shared buff/cache available\nMem: 1\nSwap: 1";
        let result = correct_memory_variant(input);
        assert_eq!(result.stats.total_blocks, 2);
        assert!(result.changes.iter().any(|c| c.kind() == "missing_header"));
        assert!(!result.changes.iter().any(|c| c.kind() == "blocks_redistributed"));
    }

    #[test]
    fn byte_order_mark_keeps_the_first_timestamp() {
        let input = "\u{feff}01/01/2024_10:00:00\nTue Jan 2 10:00:00 -03 2024\nprocs\n1 2 3\n4 5 6\n7 8 9";
        let result = correct_cpu_variant(input);
        assert!(result.is_clean(), "{:?}", result.changes);
        assert_eq!(result.stats.total_blocks, 1);
        assert_eq!(result.corrected_text, &input[3..]);
        assert!(result.corrected_text.starts_with("01/01/2024_10:00:00\nTue Jan 2"));
    }

    #[test]
    fn rows_beyond_block_capacity_are_reported_as_removed() {
        let input = "01/01/2024_10:00:00\nprocs\n1\n2\n3\n4\n5\n6\n7";
        let result = correct_cpu_variant(input);
        assert_eq!(result.corrected_text, "01/01/2024_10:00:00\nprocs\n1\n2\n3");
        assert_eq!(result.stats.total_blocks, 1);
        assert_eq!(result.stats.data_lines_redistributed, 4);
        assert_eq!(result.changes.len(), 1);
        match &result.changes[0] {
            Change::DataRedistribution {
                original_data_count,
                final_data_count,
                moved_lines,
                ..
            } => {
                assert_eq!(*original_data_count, 7);
                assert_eq!(*final_data_count, 3);
                assert!(moved_lines.added.is_empty());
                let removed: Vec<(&str, usize)> = moved_lines
                    .removed
                    .iter()
                    .map(|m| (m.line.as_str(), m.original_line))
                    .collect();
                assert_eq!(removed, vec![("4", 6), ("5", 7), ("6", 8), ("7", 9)]);
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn garbage_is_dropped_not_rejected() {
        let result = correct_cpu_variant("hello\nworld\n\u{fffd}\n");
        assert_eq!(result.corrected_text, "");
        assert_eq!(result.stats.total_lines, 3);
        assert_eq!(result.stats.total_blocks, 0);
        assert!(result.is_clean());
    }
}
