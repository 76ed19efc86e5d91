use crate::batch::{BatchReport, ScanReport};
use crate::config::Variant;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One line of a machine-readable run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub file: String,
    pub status: String,
    pub output: Option<String>,
    pub blocks: Option<usize>,
    pub changes: Option<usize>,
    pub total_lines: Option<usize>,
    pub corrected_lines: Option<usize>,
    pub data_lines_redistributed: Option<usize>,
    pub error: Option<String>,
}

impl ReportRow {
    fn empty(file: &str, status: &str) -> Self {
        ReportRow {
            file: file.to_string(),
            status: status.to_string(),
            output: None,
            blocks: None,
            changes: None,
            total_lines: None,
            corrected_lines: None,
            data_lines_redistributed: None,
            error: None,
        }
    }
}

pub fn batch_rows(report: &BatchReport) -> Vec<ReportRow> {
    let mut rows = Vec::with_capacity(report.processed.len() + report.errors.len());
    for outcome in &report.processed {
        let status = if outcome.changes.is_empty() {
            "unchanged"
        } else {
            "corrected"
        };
        rows.push(ReportRow {
            output: Some(outcome.corrected_file.clone()),
            blocks: Some(outcome.stats.corrected_blocks),
            changes: Some(outcome.changes.len()),
            total_lines: Some(outcome.stats.total_lines),
            corrected_lines: Some(outcome.stats.corrected_lines),
            data_lines_redistributed: Some(outcome.stats.data_lines_redistributed),
            ..ReportRow::empty(&outcome.original_file, status)
        });
    }
    for failure in &report.errors {
        rows.push(ReportRow {
            error: Some(failure.error.clone()),
            ..ReportRow::empty(&failure.file_name, "error")
        });
    }
    rows
}

pub fn scan_rows(report: &ScanReport) -> Vec<ReportRow> {
    let groups = [
        ("needs_correction", &report.needs_correction),
        ("already_correct", &report.already_correct),
        ("error", &report.has_errors),
    ];
    groups
        .iter()
        .flat_map(|(status, files)| {
            files.iter().map(move |f| ReportRow {
                blocks: f.analysis.map(|a| a.total_blocks),
                changes: f.analysis.map(|a| a.issues),
                error: f.error.clone(),
                ..ReportRow::empty(&f.name, status)
            })
        })
        .collect()
}

pub enum Writer {
    Human(Box<dyn Write>),
    Json(Box<dyn Write>, bool), // bool tracks if the next entry is the first
    Jsonl(Box<dyn Write>),
    Csv(Box<dyn Write>, bool), // bool tracks if we've written headers
    Tsv(Box<dyn Write>, bool),
}

const COLUMNS: [&str; 9] = [
    "file",
    "status",
    "output",
    "blocks",
    "changes",
    "total_lines",
    "corrected_lines",
    "data_lines_redistributed",
    "error",
];

impl Writer {
    pub fn write_batch(&mut self, rows: &[ReportRow]) -> Result<()> {
        match self {
            Writer::Human(writer) => {
                for row in rows {
                    match (&row.error, row.changes) {
                        (Some(error), _) => writeln!(writer, "{}: error: {}", row.file, error)?,
                        (None, Some(changes)) => writeln!(
                            writer,
                            "{}: {} ({} change(s), {} block(s))",
                            row.file,
                            row.status,
                            changes,
                            row.blocks.unwrap_or(0)
                        )?,
                        (None, None) => writeln!(writer, "{}: {}", row.file, row.status)?,
                    }
                }
            }
            Writer::Json(writer, is_first) => {
                for row in rows {
                    if *is_first {
                        write!(writer, "[")?;
                        *is_first = false;
                    } else {
                        write!(writer, ",")?;
                    }
                    let serialized = serde_json::to_string_pretty(row)?;
                    write!(writer, "\n{}", serialized)?;
                }
            }
            Writer::Jsonl(writer) => {
                for row in rows {
                    let serialized = serde_json::to_string(row)?;
                    writeln!(writer, "{}", serialized)?;
                }
            }
            Writer::Csv(writer, headers_written) => {
                if !*headers_written {
                    writeln!(writer, "{}", COLUMNS.join(","))?;
                    *headers_written = true;
                }
                for row in rows {
                    let fields: Vec<String> = cells(row).iter().map(|c| escape_csv_field(c)).collect();
                    writeln!(writer, "{}", fields.join(","))?;
                }
            }
            Writer::Tsv(writer, headers_written) => {
                if !*headers_written {
                    writeln!(writer, "{}", COLUMNS.join("\t"))?;
                    *headers_written = true;
                }
                for row in rows {
                    let fields: Vec<String> = cells(row).iter().map(|c| escape_tsv_field(c)).collect();
                    writeln!(writer, "{}", fields.join("\t"))?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        match self {
            Writer::Json(ref mut writer, is_first) => {
                if is_first {
                    write!(writer, "[")?;
                }
                writeln!(writer, "\n]")?;
                writer.flush()?;
            }
            Writer::Jsonl(ref mut writer)
            | Writer::Csv(ref mut writer, _)
            | Writer::Tsv(ref mut writer, _)
            | Writer::Human(ref mut writer) => {
                writer.flush()?;
            }
        }
        Ok(())
    }
}

fn cells(row: &ReportRow) -> [String; 9] {
    let num = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_default();
    [
        row.file.clone(),
        row.status.clone(),
        row.output.clone().unwrap_or_default(),
        num(row.blocks),
        num(row.changes),
        num(row.total_lines),
        num(row.corrected_lines),
        num(row.data_lines_redistributed),
        row.error.clone().unwrap_or_default(),
    ]
}

fn file_sink(path: &str) -> Result<Box<dyn Write>> {
    create_parent_dirs(path)?;
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

pub fn create_writer(output_arg: &str) -> Result<Writer> {
    match output_arg {
        "stdout" => Ok(Writer::Human(Box::new(io::stdout()))),
        "json" => Ok(Writer::Json(Box::new(io::stdout()), true)),
        "jsonl" => Ok(Writer::Jsonl(Box::new(io::stdout()))),
        path if path.ends_with(".json") => Ok(Writer::Json(file_sink(path)?, true)),
        path if path.ends_with(".jsonl") || path.ends_with(".ndjson") => {
            Ok(Writer::Jsonl(file_sink(path)?))
        }
        path if path.ends_with(".csv") => Ok(Writer::Csv(file_sink(path)?, false)),
        path if path.ends_with(".tsv") => Ok(Writer::Tsv(file_sink(path)?, false)),
        path => {
            // Default to JSON file if it looks like a path
            if path.contains('/') || path.contains('\\') || path.contains('.') {
                Ok(Writer::Json(file_sink(path)?, true))
            } else {
                Err(anyhow!(
                    "Unknown report format: {}. Use 'stdout', 'json', 'jsonl' or a file path",
                    output_arg
                ))
            }
        }
    }
}

pub fn create_parent_dirs(file_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(file_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn escape_tsv_field(field: &str) -> String {
    field
        .replace('\t', " ")
        .replace('\n', " ")
        .replace('\r', " ")
}

pub fn write(output_arg: &str, rows: &[ReportRow]) -> Result<()> {
    let mut writer = create_writer(output_arg)?;
    writer.write_batch(rows)?;
    writer.finish()
}

/// Plain-text summary of a batch run, suitable for archiving next to the logs.
pub fn text_report(report: &BatchReport, variant: Variant, folder: &Path) -> String {
    let mut out = String::new();
    let rule = |c: char, n: usize| c.to_string().repeat(n);

    out.push_str(&format!(
        "SNAPSHOT LOG CORRECTION REPORT - {}\n",
        variant.as_str().to_uppercase()
    ));
    out.push_str(&format!(
        "Generated: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Folder: {}\n", folder.display()));
    out.push_str(&format!("{}\n\n", rule('=', 60)));

    out.push_str("SUMMARY:\n");
    out.push_str(&format!("- Total files: {}\n", report.total_files));
    out.push_str(&format!("- Corrected successfully: {}\n", report.success_count));
    out.push_str(&format!("- With errors: {}\n", report.error_count));
    if report.skipped_count > 0 {
        out.push_str(&format!("- Skipped (cancelled): {}\n", report.skipped_count));
    }
    out.push_str(&format!("- Success rate: {:.1}%\n\n", report.success_rate()));

    if !report.processed.is_empty() {
        out.push_str("PROCESSED FILES:\n");
        out.push_str(&format!("{}\n", rule('-', 40)));
        for outcome in &report.processed {
            out.push_str(&format!(
                "* {} -> {}\n",
                outcome.original_file, outcome.corrected_file
            ));
            out.push_str(&format!(
                "  Blocks: {}, changes applied: {}\n",
                outcome.stats.total_blocks,
                outcome.changes.len()
            ));
            for change in &outcome.changes {
                out.push_str(&format!("    - {}\n", change));
            }
            out.push('\n');
        }
    }

    if !report.errors.is_empty() {
        out.push_str("FILES WITH ERRORS:\n");
        out.push_str(&format!("{}\n", rule('-', 20)));
        for failure in &report.errors {
            out.push_str(&format!("* {}: {}\n", failure.file_name, failure.error));
        }
        out.push('\n');
    }

    out
}
