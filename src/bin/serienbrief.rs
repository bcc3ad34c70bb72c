//! Serienbrief CLI tool
//!
//! Generates print files from template PDFs and a CSV table of recipients.

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use glob::glob;
use log::info;
use std::path::PathBuf;
use std::process;

use serienbrief::layout::StampLayout;
use serienbrief::pipeline::{run, OutputMode, RunOptions};
use serienbrief::record::ColumnNames;
use serienbrief::selection::Selection;

/// Serienbrief Generator - mail-merge letters as print-ready PDFs
///
/// Stamps each recipient's name and department onto the selected template
/// PDFs and pads every recipient to an even page count for duplex printing.
#[derive(Parser)]
#[command(name = "serienbrief")]
#[command(author, version, about, long_about)]
#[command(group(
    ArgGroup::new("templates")
        .required(true)
        .args(["pdf_base_path", "pdfs"]),
))]
#[command(after_help = "EXAMPLES:
    # One file per recipient, templates chosen by pdf_<name> version columns
    serienbrief --csv-file names.csv --pdf-base-path resources --output letters/

    # One merged print file
    serienbrief --csv-file names.csv --pdf-base-path resources --merge --output print.pdf

    # Templates chosen by flag columns named after each file
    serienbrief --csv-file names.csv --pdfs \"brief.pdf,anmeldung.pdf\" --merge --output print.pdf")]
struct Cli {
    /// Path of the CSV file containing the names
    #[arg(long, value_name = "PATH")]
    csv_file: PathBuf,

    /// Base path of the versioned PDF files (e.g. "resources/"), selected by
    /// pdf_<name> columns holding the version number
    #[arg(long, value_name = "PATH")]
    pdf_base_path: Option<PathBuf>,

    /// Template PDFs, comma separated; each is selected by a column named
    /// after the file. Supports glob patterns like "templates/*.pdf"
    #[arg(long, value_name = "PATH,PATH,...", value_delimiter = ',')]
    pdfs: Vec<String>,

    /// Merge all letters into a single document
    #[arg(long)]
    merge: bool,

    /// Output file (with --merge) or directory for individual PDFs
    #[arg(long, value_name = "PATH")]
    output: PathBuf,

    /// Blank PDF used to pad documents to an even page count
    #[arg(long, value_name = "PATH", default_value = "empty.pdf")]
    empty_pdf: PathBuf,

    /// Column prefix marking template version columns
    #[arg(long, default_value = "pdf_")]
    prefix: String,

    /// Column holding the name
    #[arg(long, default_value = "Vorname")]
    name_column: String,

    /// Column holding the preferred name, used when filled
    #[arg(long, default_value = "Ceviname")]
    alt_name_column: String,

    /// Column holding the department
    #[arg(long, default_value = "Abteilung")]
    department_column: String,
}

fn main() {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = cmd_generate(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Expand glob patterns in template paths, keeping the given order
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            continue;
        }

        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            let entries =
                glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Generate the letters
fn cmd_generate(cli: Cli) -> anyhow::Result<()> {
    if !cli.csv_file.exists() {
        bail!("CSV file not found: {}", cli.csv_file.display());
    }

    let selection = match cli.pdf_base_path {
        Some(base_path) => Selection::Count {
            base_path,
            prefix: cli.prefix,
        },
        None => Selection::Flags {
            candidates: expand_globs(cli.pdfs)?,
        },
    };

    let output = if cli.merge {
        OutputMode::Merged { path: cli.output }
    } else {
        OutputMode::PerRecipient { directory: cli.output }
    };

    let options = RunOptions {
        csv_path: cli.csv_file,
        selection,
        output,
        filler_path: cli.empty_pdf,
        columns: ColumnNames {
            name: cli.name_column,
            alternate_name: cli.alt_name_column,
            department: cli.department_column,
        },
        layout: StampLayout::default(),
    };

    let summary = run(&options).context("Letter generation failed")?;

    info!(
        "Done: {} recipient(s), {} template(s) stamped, {} skipped, {} blank page(s), \
         {} file(s) / {} page(s) written",
        summary.recipients,
        summary.templates_stamped,
        summary.templates_skipped,
        summary.padding_pages,
        summary.files_written,
        summary.pages_written,
    );

    Ok(())
}
