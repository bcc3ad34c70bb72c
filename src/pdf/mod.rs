//! PDF manipulation module

pub mod annotate;
pub mod inspect;
pub mod merge;

// Re-export commonly used items
pub use annotate::{annotate, annotate_document};
pub use inspect::count_pages;
pub use merge::{MergeAccumulator, PadOutcome};
