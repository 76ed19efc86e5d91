use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record shape of a snapshot log. Chosen by the caller, never guessed from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// `vmstat` style: procs/memory/swap/cpu columns.
    Cpu,
    /// `free` style: `Mem:` and `Swap:` rows.
    Memory,
}

/// Fixed shape of one corrected block plus the per-variant engine switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub date_a: usize,
    pub date_b: usize,
    pub headers: usize,
    pub data: usize,
    /// Copy the previous block's headers into a block that has none.
    pub backfill_headers: bool,
    /// Drop repeated header text when rendering a block.
    pub dedup_headers: bool,
    /// Emit structural diagnostics for every provisional block.
    pub validate: bool,
    /// Rebuild every block from per-kind pools instead of re-chunking data only.
    pub rebuild_from_pools: bool,
    /// Render Date-A lines ahead of Date-B lines.
    pub date_a_first: bool,
}

impl Layout {
    pub const fn dates(&self) -> usize {
        self.date_a + self.date_b
    }

    pub const fn block_lines(&self) -> usize {
        self.dates() + self.headers + self.data
    }
}

static CPU_LAYOUT: Layout = Layout {
    date_a: 1,
    date_b: 1,
    headers: 2,
    data: 3,
    backfill_headers: true,
    dedup_headers: true,
    validate: false,
    rebuild_from_pools: false,
    date_a_first: false,
};

static MEMORY_LAYOUT: Layout = Layout {
    date_a: 1,
    date_b: 1,
    headers: 1,
    data: 2,
    backfill_headers: false,
    dedup_headers: false,
    validate: true,
    rebuild_from_pools: true,
    date_a_first: true,
};

impl Variant {
    pub fn layout(self) -> &'static Layout {
        match self {
            Variant::Cpu => &CPU_LAYOUT,
            Variant::Memory => &MEMORY_LAYOUT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Cpu => "cpu",
            Variant::Memory => "memory",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
