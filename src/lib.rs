//! Re-segment vmstat/free snapshot logs into fixed-shape blocks and report what moved.

pub mod batch;
pub mod config;
pub mod normalizer;
pub mod output;
pub mod parsers;
pub mod report;

pub use config::Variant;
pub use normalizer::{correct, correct_cpu_variant, correct_memory_variant, Correction};
pub use report::{Change, Stats};
