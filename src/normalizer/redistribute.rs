use super::segment::Block;
use crate::config::Layout;
use crate::parsers::{Line, LineKind};
use crate::report::{data_change, Change};

/// Re-chunk every data row of the document into `per_block` rows per block.
///
/// Rows are pooled in document order and handed out front to back, so a block
/// with a surplus feeds the blocks after it and the last blocks may come up
/// short. Dates and headers stay where they are.
pub fn redistribute_data<'a>(blocks: &[Block<'a>], per_block: usize) -> (Vec<Block<'a>>, Vec<Change>) {
    let mut pool = blocks.iter().flat_map(|b| b.data.iter().copied());
    let mut corrected = Vec::with_capacity(blocks.len());
    let mut changes = Vec::new();

    for block in blocks {
        let assigned: Vec<Line<'a>> = pool.by_ref().take(per_block).collect();
        if let Some(change) = data_change(block, &block.data, &assigned) {
            changes.push(change);
        }
        corrected.push(Block {
            data: assigned,
            ..block.clone()
        });
    }

    (corrected, changes)
}

/// Rebuild the document from per-kind pools, one fixed-shape block at a time.
///
/// Each new block takes up to `layout.date_a` Date-A lines, `layout.date_b`
/// Date-B lines, `layout.headers` headers and `layout.data` data rows, until
/// every pool is empty. The block count follows the content, not the input.
pub fn rebuild_from_pools<'a>(blocks: &[Block<'a>], layout: &Layout) -> (Vec<Block<'a>>, Vec<Change>) {
    let dates = || blocks.iter().flat_map(|b| b.dates.iter().copied());
    let mut date_a = dates().filter(|l| l.kind == LineKind::DateA);
    let mut date_b = dates().filter(|l| l.kind == LineKind::DateB);
    let mut headers = blocks.iter().flat_map(|b| b.headers.iter().copied());
    let mut data = blocks.iter().flat_map(|b| b.data.iter().copied());

    let mut rebuilt: Vec<Block<'a>> = Vec::new();
    loop {
        let mut block = Block::empty(rebuilt.len() + 1, 0);
        block.dates.extend(date_a.by_ref().take(layout.date_a));
        block.dates.extend(date_b.by_ref().take(layout.date_b));
        block.headers.extend(headers.by_ref().take(layout.headers));
        block.data.extend(data.by_ref().take(layout.data));
        if block.line_count() == 0 {
            break;
        }
        block.start_line = first_position(&block);
        rebuilt.push(block);
    }

    let mut changes = Vec::new();
    for i in 0..blocks.len().max(rebuilt.len()) {
        let (anchor, original, assigned) = match (blocks.get(i), rebuilt.get(i)) {
            (Some(o), Some(r)) => (o, o.data.as_slice(), r.data.as_slice()),
            (Some(o), None) => (o, o.data.as_slice(), &[][..]),
            (None, Some(r)) => (r, &[][..], r.data.as_slice()),
            (None, None) => unreachable!(),
        };
        if let Some(change) = data_change(anchor, original, assigned) {
            changes.push(change);
        }
    }
    if rebuilt.len() != blocks.len() {
        changes.push(Change::BlocksRedistributed {
            original_blocks: blocks.len(),
            final_blocks: rebuilt.len(),
        });
    }

    (rebuilt, changes)
}

fn first_position(block: &Block<'_>) -> usize {
    block
        .dates
        .iter()
        .chain(&block.headers)
        .chain(&block.data)
        .map(|l| l.number)
        .min()
        .unwrap_or(0)
}
