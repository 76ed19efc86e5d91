use super::segment::Block;
use crate::config::Layout;
use crate::parsers::LineKind;

/// Lay corrected blocks back out as text lines: dates, headers, data.
pub fn render<'a>(blocks: &[Block<'a>], layout: &Layout) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(blocks.len() * layout.block_lines());
    for block in blocks {
        let mut dates = block.dates.clone();
        if layout.date_a_first {
            // stable: relative order inside each kind is kept
            dates.sort_by_key(|l| l.kind != LineKind::DateA);
        }
        out.extend(dates.iter().map(|l| l.text));

        let mut seen: Vec<&str> = Vec::with_capacity(block.headers.len());
        for header in &block.headers {
            if layout.dedup_headers {
                if seen.contains(&header.text) {
                    continue;
                }
                seen.push(header.text);
            }
            out.push(header.text);
        }

        out.extend(block.data.iter().map(|l| l.text));
    }
    out
}
