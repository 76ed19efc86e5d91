use crate::parsers::{Line, LineKind};

/// One snapshot: its timestamp lines, column headers and sample rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// 1-based sequence number.
    pub number: usize,
    /// Position of the line that opened the block.
    pub start_line: usize,
    pub dates: Vec<Line<'a>>,
    pub headers: Vec<Line<'a>>,
    pub data: Vec<Line<'a>>,
}

impl<'a> Block<'a> {
    fn open(number: usize, first: Line<'a>) -> Self {
        let mut block = Block {
            number,
            start_line: first.number,
            dates: Vec::new(),
            headers: Vec::new(),
            data: Vec::new(),
        };
        match first.kind {
            LineKind::DateA | LineKind::DateB => block.dates.push(first),
            LineKind::Header => block.headers.push(first),
            LineKind::Data => block.data.push(first),
            LineKind::Unknown => {}
        }
        block
    }

    pub fn empty(number: usize, start_line: usize) -> Self {
        Block {
            number,
            start_line,
            dates: Vec::new(),
            headers: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn has_header(&self, text: &str) -> bool {
        self.headers.iter().any(|h| h.text == text)
    }

    pub fn line_count(&self) -> usize {
        self.dates.len() + self.headers.len() + self.data.len()
    }
}

/// Group classified lines into provisional blocks.
///
/// A Date-A line always starts a block. Date-B, header and data lines join the
/// open block or open one themselves. A block's first header pulls in an
/// immediately following distinct header so split banners stay together.
pub fn segment<'a>(lines: &[Line<'a>]) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block<'a>> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        match line.kind {
            LineKind::DateA => {
                if let Some(done) = current.take() {
                    blocks.push(done);
                }
                current = Some(Block::open(blocks.len() + 1, line));
            }
            LineKind::DateB | LineKind::Data => match current.as_mut() {
                Some(block) if line.kind == LineKind::DateB => block.dates.push(line),
                Some(block) => block.data.push(line),
                None => current = Some(Block::open(blocks.len() + 1, line)),
            },
            LineKind::Header => {
                let block = current.get_or_insert_with(|| Block::empty(blocks.len() + 1, line.number));
                if !block.has_header(line.text) {
                    block.headers.push(line);
                    if block.headers.len() == 1 && take_second_header(block, lines.get(i + 1)) {
                        i += 1;
                    }
                }
            }
            LineKind::Unknown => {}
        }
        i += 1;
    }

    if let Some(done) = current {
        blocks.push(done);
    }
    blocks
}

fn take_second_header<'a>(block: &mut Block<'a>, next: Option<&Line<'a>>) -> bool {
    match next {
        Some(next) if next.kind == LineKind::Header && !block.has_header(next.text) => {
            block.headers.push(*next);
            true
        }
        _ => false,
    }
}

/// Give each header-less block a copy of its predecessor's headers.
///
/// Forward single pass, so a backfilled block passes its headers on.
pub fn backfill_headers(blocks: &mut [Block<'_>]) {
    for i in 1..blocks.len() {
        if blocks[i].headers.is_empty() && !blocks[i - 1].headers.is_empty() {
            let inherited = blocks[i - 1].headers.clone();
            blocks[i].headers = inherited;
        }
    }
}
