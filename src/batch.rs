//! Folder scanning and batch correction around the pure engine.

use crate::config::Variant;
use crate::normalizer::{self, Correction};
use crate::report::{Change, Stats};
use anyhow::{anyhow, Context, Result};
use crossbeam::channel::Sender;
use memmap2::Mmap;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const CORRECTED_SUFFIX: &str = "_corrected";
static EXTENSIONS: [&str; 2] = ["txt", "log"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// 1-based index of the file about to be processed.
    pub current: usize,
    pub total: usize,
    pub file_name: String,
}

pub type ProgressTx = Sender<ProgressEvent>;

/// Where corrected text goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// `<stem>_corrected.<ext>` next to the input.
    Derived,
    ReplaceOriginal,
}

impl Destination {
    pub fn path_for(self, input: &Path) -> PathBuf {
        match self {
            Destination::Derived => corrected_path(input),
            Destination::ReplaceOriginal => input.to_path_buf(),
        }
    }
}

pub fn corrected_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, CORRECTED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, CORRECTED_SUFFIX),
    };
    input.with_file_name(name)
}

/// Map `path` and hand its text to `f`. The mapping is gone when this returns.
pub fn with_mapped_text<T>(path: &Path, f: impl FnOnce(&str) -> T) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(f(""));
    }
    // SAFETY: read-only mapping, dropped before anything writes to `path`.
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("failed to map {}", path.display()))?;
    let text = std::str::from_utf8(&mmap).with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    Ok(f(text))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_candidate(path: &Path) -> bool {
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
    let already_output = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(CORRECTED_SUFFIX));
    ext_ok && !already_output && path.is_file()
}

/// Snapshot logs directly inside `dir`, sorted by name.
pub fn candidate_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read folder {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if is_candidate(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub total_blocks: usize,
    pub issues: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub total: usize,
    pub needs_correction: Vec<ScannedFile>,
    pub already_correct: Vec<ScannedFile>,
    pub has_errors: Vec<ScannedFile>,
}

impl ScanReport {
    /// Files a batch run should touch.
    pub fn selection(&self, only_needed: bool) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.needs_correction.iter().map(|f| f.path.clone()).collect();
        if !only_needed {
            files.extend(self.already_correct.iter().map(|f| f.path.clone()));
        }
        files
    }
}

/// Run the engine over `path` without writing anything.
pub fn analyze_file(path: &Path, variant: Variant) -> Result<Analysis> {
    let correction = with_mapped_text(path, |text| normalizer::correct(text, variant))?;
    if correction.stats.total_blocks == 0 {
        return Err(anyhow!("no {} snapshot blocks found", variant));
    }
    Ok(Analysis {
        total_blocks: correction.stats.total_blocks,
        issues: correction.changes.len(),
    })
}

pub fn scan_folder(dir: &Path, variant: Variant) -> Result<ScanReport> {
    let files = candidate_files(dir)?;
    let mut report = ScanReport {
        total: files.len(),
        ..ScanReport::default()
    };

    for path in files {
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let mut scanned = ScannedFile {
            name: file_name(&path),
            path: path.clone(),
            size,
            analysis: None,
            error: None,
        };
        match analyze_file(&path, variant) {
            Ok(analysis) if analysis.issues > 0 => {
                debug!(file = %scanned.name, issues = analysis.issues, "needs correction");
                scanned.analysis = Some(analysis);
                report.needs_correction.push(scanned);
            }
            Ok(analysis) => {
                debug!(file = %scanned.name, "already correct");
                scanned.analysis = Some(analysis);
                report.already_correct.push(scanned);
            }
            Err(e) => {
                warn!(file = %scanned.name, error = %e, "cannot analyze");
                scanned.error = Some(format!("{:#}", e));
                report.has_errors.push(scanned);
            }
        }
    }

    info!(
        total = report.total,
        needs_correction = report.needs_correction.len(),
        already_correct = report.already_correct.len(),
        errors = report.has_errors.len(),
        "scan finished"
    );
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub original_file: String,
    pub corrected_file: String,
    pub bytes: u64,
    pub changes: Vec<Change>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total_files: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Files left untouched because the run was cancelled.
    pub skipped_count: usize,
    pub processed: Vec<FileOutcome>,
    pub errors: Vec<FileFailure>,
}

impl BatchReport {
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_files as f64 * 100.0
    }
}

/// Correct one file and write the result to `destination`.
pub fn process_file(path: &Path, variant: Variant, destination: Destination) -> Result<FileOutcome> {
    let (bytes, correction): (u64, Correction) =
        with_mapped_text(path, |text| (text.len() as u64, normalizer::correct(text, variant)))?;
    let target = destination.path_for(path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, &correction.corrected_text)
        .with_context(|| format!("failed to write {}", target.display()))?;

    info!(
        file = %path.display(),
        output = %target.display(),
        changes = correction.changes.len(),
        blocks = correction.stats.corrected_blocks,
        "corrected"
    );
    Ok(FileOutcome {
        original_file: file_name(path),
        corrected_file: file_name(&target),
        bytes,
        changes: correction.changes,
        stats: correction.stats,
    })
}

/// Correct `files` in order, reporting progress and stopping early on `cancel`.
///
/// Per-file failures are collected, never propagated.
pub fn process_batch(
    files: &[PathBuf],
    variant: Variant,
    destination: Destination,
    progress: Option<&ProgressTx>,
    cancel: &AtomicBool,
) -> BatchReport {
    let total = files.len();
    let started = AtomicUsize::new(0);

    let run = |path: &PathBuf| -> Option<Result<FileOutcome>> {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        let current = started.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(tx) = progress {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(ProgressEvent {
                current,
                total,
                file_name: file_name(path),
            });
        }
        Some(process_file(path, variant, destination))
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Option<Result<FileOutcome>>> = files.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Option<Result<FileOutcome>>> = files.iter().map(run).collect();

    let mut report = BatchReport {
        total_files: total,
        ..BatchReport::default()
    };
    for (path, result) in files.iter().zip(results) {
        match result {
            Some(Ok(outcome)) => report.processed.push(outcome),
            Some(Err(e)) => {
                warn!(file = %path.display(), error = %e, "correction failed");
                report.errors.push(FileFailure {
                    file_name: file_name(path),
                    error: format!("{:#}", e),
                });
            }
            None => report.skipped_count += 1,
        }
    }
    report.success_count = report.processed.len();
    report.error_count = report.errors.len();
    if report.skipped_count > 0 {
        warn!(skipped = report.skipped_count, "batch cancelled");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use tempfile::tempdir;

    const NEEDS_FIX: &str = "01/01/2024_10:00:00\nprocs\n1 2 3\n4 5 6\n\
                             01/01/2024_10:05:00\n7 8 9\n10 11 12\n13 14 15\n";
    const CLEAN: &str = "01/01/2024_10:00:00\nprocs\n1 2 3\n4 5 6\n7 8 9";

    #[test]
    fn derived_names() {
        assert_eq!(
            corrected_path(Path::new("/tmp/vm/host1.txt")),
            PathBuf::from("/tmp/vm/host1_corrected.txt")
        );
        assert_eq!(
            corrected_path(Path::new("host1")),
            PathBuf::from("host1_corrected")
        );
        assert_eq!(
            Destination::ReplaceOriginal.path_for(Path::new("a.log")),
            PathBuf::from("a.log")
        );
    }

    #[test]
    fn scan_sorts_files_into_categories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), NEEDS_FIX).unwrap();
        fs::write(dir.path().join("b.log"), CLEAN).unwrap();
        fs::write(dir.path().join("c.txt"), "nothing useful\n").unwrap();
        fs::write(dir.path().join("d.txt"), [0xffu8, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("e.csv"), NEEDS_FIX).unwrap();
        fs::write(dir.path().join("a_corrected.txt"), CLEAN).unwrap();

        let report = scan_folder(dir.path(), Variant::Cpu).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.needs_correction.len(), 1);
        assert_eq!(report.needs_correction[0].name, "a.txt");
        assert_eq!(report.needs_correction[0].analysis.unwrap().issues, 2);
        assert_eq!(report.already_correct.len(), 1);
        assert_eq!(report.already_correct[0].name, "b.log");
        let errors: Vec<&str> = report.has_errors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(errors, vec!["c.txt", "d.txt"]);
        assert!(report.has_errors[1].error.as_deref().unwrap().contains("UTF-8"));

        assert_eq!(report.selection(true).len(), 1);
        assert_eq!(report.selection(false).len(), 2);
    }

    #[test]
    fn batch_writes_derived_files_and_reports_progress() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, NEEDS_FIX).unwrap();
        fs::write(&b, CLEAN).unwrap();
        let missing = dir.path().join("missing.txt");

        let (tx, rx) = unbounded();
        let cancel = AtomicBool::new(false);
        let files = vec![a.clone(), missing, b.clone()];
        let report = process_batch(&files, Variant::Cpu, Destination::Derived, Some(&tx), &cancel);
        drop(tx);

        assert_eq!(report.total_files, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors[0].file_name, "missing.txt");
        assert_eq!(report.processed[0].corrected_file, "a_corrected.txt");
        assert_eq!(report.processed[0].changes.len(), 2);
        assert!(report.processed[1].changes.is_empty());

        let fixed = fs::read_to_string(dir.path().join("a_corrected.txt")).unwrap();
        assert!(fixed.starts_with("01/01/2024_10:00:00\nprocs\n1 2 3\n4 5 6\n7 8 9\n"));
        assert_eq!(fs::read_to_string(&a).unwrap(), NEEDS_FIX);

        let events: Vec<ProgressEvent> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.total == 3));
        let mut seen: Vec<usize> = events.iter().map(|e| e.current).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn replace_original_overwrites_input() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, NEEDS_FIX).unwrap();
        let outcome = process_file(&a, Variant::Cpu, Destination::ReplaceOriginal).unwrap();
        assert_eq!(outcome.corrected_file, "a.txt");
        let rewritten = fs::read_to_string(&a).unwrap();
        assert!(normalizer::correct_cpu_variant(&rewritten).is_clean());
    }

    #[test]
    fn cancelled_batch_skips_everything() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, NEEDS_FIX).unwrap();
        let cancel = AtomicBool::new(true);
        let report = process_batch(&[a], Variant::Cpu, Destination::Derived, None, &cancel);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.success_count, 0);
        assert!(!dir.path().join("a_corrected.txt").exists());
    }

    #[test]
    fn empty_file_maps_to_empty_text() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "").unwrap();
        let len = with_mapped_text(&empty, str::len).unwrap();
        assert_eq!(len, 0);
        assert!(analyze_file(&empty, Variant::Memory).is_err());
    }
}
