//! The letter generation run
//!
//! For each recipient, in table order: select templates, stamp each one,
//! append it to the merge accumulator and pad to an even page count. After
//! the recipient, pad once more, then either write the recipient's own file
//! or keep collecting for a single merged output.

use std::fs;
use std::path::{Path, PathBuf};
use log::{info, warn};

use crate::error::{Error, Result};
use crate::layout::StampLayout;
use crate::pdf::{annotate_document, MergeAccumulator, PadOutcome};
use crate::record::{load_recipients, ColumnNames, RecipientRecord};
use crate::selection::{Selection, TemplateSelector};

/// Where generated letters go
#[derive(Debug, Clone)]
pub enum OutputMode {
    /// One PDF per recipient inside `directory` (created if missing)
    PerRecipient { directory: PathBuf },
    /// All recipients in one PDF at `path`
    Merged { path: PathBuf },
}

/// Options for a letter generation run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Recipient table
    pub csv_path: PathBuf,
    /// How templates are chosen per recipient
    pub selection: Selection,
    pub output: OutputMode,
    /// Blank page used for duplex padding
    pub filler_path: PathBuf,
    pub columns: ColumnNames,
    pub layout: StampLayout,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("names.csv"),
            selection: Selection::default(),
            output: OutputMode::PerRecipient {
                directory: PathBuf::from("output"),
            },
            filler_path: PathBuf::from("empty.pdf"),
            columns: ColumnNames::default(),
            layout: StampLayout::default(),
        }
    }
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub recipients: usize,
    pub templates_stamped: usize,
    /// Selected templates whose file did not exist
    pub templates_skipped: usize,
    pub padding_pages: usize,
    pub files_written: usize,
    pub pages_written: usize,
}

/// Output file name for one recipient: `<name>_<department>.pdf`
///
/// Path separators in the name become `_`; in the department `/` becomes
/// `_` and spaces are removed.
pub fn output_file_name(name: &str, department: Option<&str>) -> String {
    let name = name.replace(['/', '\\'], "_");
    let department = department
        .unwrap_or_default()
        .replace(['/', '\\'], "_")
        .replace(' ', "");
    format!("{}_{}.pdf", name, department)
}

/// Generate the letters described by `options`
pub fn run(options: &RunOptions) -> Result<RunSummary> {
    let recipients = load_recipients(&options.csv_path, &options.columns)?;
    info!(
        "Loaded {} recipient(s) from {}",
        recipients.len(),
        options.csv_path.display()
    );

    generate(&recipients, options)
}

/// Generate letters for already loaded recipients
pub fn generate(recipients: &[RecipientRecord], options: &RunOptions) -> Result<RunSummary> {
    if let Selection::Flags { candidates } = &options.selection {
        if candidates.is_empty() {
            return Err(Error::InvalidOptions("No template PDFs given".to_string()));
        }
    }

    if let OutputMode::PerRecipient { directory } = &options.output {
        if !directory.exists() {
            fs::create_dir_all(directory)?;
        }
    }

    let selector = options.selection.selector();
    let mut merged = MergeAccumulator::new(&options.filler_path);
    let mut summary = RunSummary::default();

    for recipient in recipients {
        stamp_recipient(recipient, selector.as_ref(), options, &mut merged, &mut summary)?;
        summary.recipients += 1;

        if let OutputMode::PerRecipient { directory } = &options.output {
            let file_name = output_file_name(&recipient.name, recipient.department.as_deref());
            let path = directory.join(file_name);
            if path.exists() {
                warn!(
                    "{} already exists and is overwritten (row {})",
                    path.display(),
                    recipient.index + 1
                );
            }

            let pages = merged.flush(&path)?;
            info!("Wrote {} ({} pages)", path.display(), pages);

            summary.files_written += 1;
            summary.pages_written += pages;
        }
    }

    if let OutputMode::Merged { path } = &options.output {
        write_merged(&mut merged, path, &mut summary)?;
    }

    Ok(summary)
}

/// Stamp every selected template for one recipient onto the accumulator
fn stamp_recipient(
    recipient: &RecipientRecord,
    selector: &dyn TemplateSelector,
    options: &RunOptions,
    merged: &mut MergeAccumulator,
    summary: &mut RunSummary,
) -> Result<()> {
    let items = options
        .layout
        .items_for(&recipient.name, recipient.department.as_deref());

    for candidate in selector.select(recipient) {
        if !candidate.path.exists() {
            warn!(
                "PDF file not found: {} (row {}, column '{}'). Skipping.",
                candidate.path.display(),
                recipient.index + 1,
                candidate.key
            );
            summary.templates_skipped += 1;
            continue;
        }

        let doc = annotate_document(&candidate.path, &items)?;
        merged.append_document(doc);
        summary.templates_stamped += 1;

        pad(merged, summary)?;
    }

    // Covers recipients where nothing was appended above
    pad(merged, summary)
}

fn pad(merged: &mut MergeAccumulator, summary: &mut RunSummary) -> Result<()> {
    if merged.pad_to_even()? == PadOutcome::Padded {
        summary.padding_pages += 1;
    }
    Ok(())
}

fn write_merged(
    merged: &mut MergeAccumulator,
    path: &Path,
    summary: &mut RunSummary,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let pages = merged.flush(path)?;
    info!("Wrote merged document {} ({} pages)", path.display(), pages);

    summary.files_written += 1;
    summary.pages_written += pages;
    Ok(())
}
