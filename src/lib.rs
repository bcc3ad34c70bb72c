//! Serienbrief Library
//!
//! Generates personalized print-ready letters from template PDFs.
//! This library provides functionality to:
//! - Load recipients from a CSV table
//! - Select the templates each recipient gets (version columns or flag columns)
//! - Stamp the recipient's name and department onto every template page
//! - Merge the stamped documents, padding each stack to an even page count
//!
//! # Example
//!
//! ```no_run
//! use serienbrief::pipeline::{run, OutputMode, RunOptions};
//! use serienbrief::selection::Selection;
//! use std::path::PathBuf;
//!
//! let options = RunOptions {
//!     csv_path: PathBuf::from("names.csv"),
//!     selection: Selection::Count {
//!         base_path: PathBuf::from("resources"),
//!         prefix: "pdf_".to_string(),
//!     },
//!     output: OutputMode::Merged { path: PathBuf::from("print.pdf") },
//!     ..Default::default()
//! };
//!
//! let summary = run(&options).expect("Failed to generate letters");
//! println!("{} pages written", summary.pages_written);
//! ```

pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod record;
pub mod selection;

// Re-export commonly used items
pub use error::{Error, Result};
