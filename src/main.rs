use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam::channel::unbounded;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use vmnorm::batch::{self, BatchReport, Destination, ProgressEvent};
use vmnorm::{normalizer, output, Variant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Correct a single log file
    Fix {
        #[arg(long, value_enum)]
        variant: Variant,

        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Overwrite the input instead of writing <stem>_corrected.<ext>
        #[arg(long, conflicts_with = "stdout")]
        replace: bool,

        /// Print the corrected text instead of writing a file
        #[arg(long)]
        stdout: bool,

        /// Where to write the change report: stdout, json, jsonl or a .json/.jsonl/.csv/.tsv path
        #[arg(long)]
        report: Option<String>,
    },
    /// Classify the logs of a folder without changing anything
    Scan {
        #[arg(long, value_enum)]
        variant: Variant,

        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(long, default_value = "stdout")]
        report: String,
    },
    /// Correct every log of a folder
    Batch {
        #[arg(long, value_enum)]
        variant: Variant,

        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Skip files that are already in canonical shape
        #[arg(long)]
        only_needed: bool,

        /// Overwrite the inputs instead of writing <stem>_corrected.<ext>
        #[arg(long)]
        replace: bool,

        #[arg(long, default_value = "stdout")]
        report: String,

        /// Also write a plain-text summary report to this path
        #[arg(long)]
        summary: Option<PathBuf>,

        #[arg(long)]
        benchmark: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match args.command {
        Command::Fix {
            variant,
            file,
            replace,
            stdout,
            report,
        } => run_fix(variant, &file, replace, stdout, report.as_deref()),
        Command::Scan {
            variant,
            dir,
            report,
        } => {
            let scan = batch::scan_folder(&dir, variant)?;
            output::write(&report, &output::scan_rows(&scan))
        }
        Command::Batch {
            variant,
            dir,
            only_needed,
            replace,
            report,
            summary,
            benchmark,
        } => run_batch(
            variant,
            &dir,
            only_needed,
            replace,
            &report,
            summary.as_deref(),
            benchmark,
        ),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vmnorm={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_fix(
    variant: Variant,
    file: &Path,
    replace: bool,
    stdout: bool,
    report: Option<&str>,
) -> Result<()> {
    if stdout {
        let correction = batch::with_mapped_text(file, |text| normalizer::correct(text, variant))?;
        let mut out = io::stdout().lock();
        writeln!(out, "{}", correction.corrected_text)?;
        for change in &correction.changes {
            info!("{}", change);
        }
        return Ok(());
    }

    let destination = if replace {
        Destination::ReplaceOriginal
    } else {
        Destination::Derived
    };
    let outcome = batch::process_file(file, variant, destination)?;
    for change in &outcome.changes {
        info!("{}", change);
    }
    if let Some(report) = report {
        let single = BatchReport {
            total_files: 1,
            success_count: 1,
            processed: vec![outcome],
            ..BatchReport::default()
        };
        output::write(report, &output::batch_rows(&single))?;
    }
    Ok(())
}

fn run_batch(
    variant: Variant,
    dir: &Path,
    only_needed: bool,
    replace: bool,
    report: &str,
    summary: Option<&Path>,
    benchmark: bool,
) -> Result<()> {
    let start_time = Instant::now();

    let scan = batch::scan_folder(dir, variant)?;
    let files = scan.selection(only_needed);
    if files.is_empty() {
        warn!(folder = %dir.display(), "no files to process");
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("failed to install Ctrl-C handler")?;
    }

    // progress is logged from its own thread so workers never block on it
    let (tx, rx) = unbounded::<ProgressEvent>();
    let progress_handle = std::thread::spawn(move || {
        for event in rx {
            info!(
                "[{}/{}] processing {}",
                event.current, event.total, event.file_name
            );
        }
    });

    let destination = if replace {
        Destination::ReplaceOriginal
    } else {
        Destination::Derived
    };
    let result = batch::process_batch(&files, variant, destination, Some(&tx), &cancel);

    drop(tx);
    if progress_handle.join().is_err() {
        warn!("progress thread panicked");
    }

    output::write(report, &output::batch_rows(&result))?;
    if let Some(path) = summary {
        output::create_parent_dirs(&path.to_string_lossy())?;
        std::fs::write(path, output::text_report(&result, variant, dir))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }

    if benchmark {
        print_benchmark_results(&result, start_time.elapsed());
    }
    Ok(())
}

fn print_benchmark_results(report: &BatchReport, duration: Duration) {
    let total_bytes: u64 = report.processed.iter().map(|o| o.bytes).sum();
    let total_lines: usize = report.processed.iter().map(|o| o.stats.total_lines).sum();
    let total_blocks: usize = report.processed.iter().map(|o| o.stats.total_blocks).sum();

    let duration_secs = duration.as_secs_f64();
    let size_mb = total_bytes as f64 / (1024.0 * 1024.0);

    eprintln!("\n=== BENCHMARK RESULTS ===");
    eprintln!("Files: {} ({} failed)", report.total_files, report.error_count);
    eprintln!("Input size: {:.2} MB", size_mb);
    eprintln!("Total lines: {}", total_lines);
    eprintln!("Blocks: {}", total_blocks);
    eprintln!("Processing time: {:.3}s", duration_secs);
    eprintln!("Throughput: {:.2} MB/s", size_mb / duration_secs);
    eprintln!("Throughput: {:.0} lines/s", total_lines as f64 / duration_secs);
    eprintln!("Success rate: {:.1}%", report.success_rate());
}
