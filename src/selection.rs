//! Template selection policies
//!
//! A policy turns one recipient row into the ordered list of templates to
//! stamp for that recipient. The order it returns is the page order of the
//! generated document.

use std::path::{Path, PathBuf};

use crate::record::RecipientRecord;

/// A template chosen for a recipient
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCandidate {
    /// Column that selected the template
    pub key: String,
    /// Template file; may not exist
    pub path: PathBuf,
}

/// Picks the templates a recipient receives
pub trait TemplateSelector {
    fn select(&self, record: &RecipientRecord) -> Vec<TemplateCandidate>;
}

/// Version columns: `pdf_<name> = N` selects `<base_path>/<name>_N.pdf`
#[derive(Debug, Clone)]
pub struct CountSelector {
    pub base_path: PathBuf,
    pub prefix: String,
}

impl CountSelector {
    pub fn new(base_path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            prefix: prefix.into(),
        }
    }
}

impl TemplateSelector for CountSelector {
    fn select(&self, record: &RecipientRecord) -> Vec<TemplateCandidate> {
        record
            .cells()
            .filter_map(|(column, value)| {
                let base_name = column.strip_prefix(self.prefix.as_str())?;
                let version = value.as_number()?.trunc() as i64;

                Some(TemplateCandidate {
                    key: column.to_string(),
                    path: self.base_path.join(format!("{}_{}.pdf", base_name, version)),
                })
            })
            .collect()
    }
}

/// Flag columns: a fixed template list, each included when the column named
/// after its file stem is truthy
#[derive(Debug, Clone)]
pub struct FlagSelector {
    pub candidates: Vec<PathBuf>,
}

impl FlagSelector {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

/// Column name a template is selected by: its file name without extension
pub fn template_identifier(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl TemplateSelector for FlagSelector {
    fn select(&self, record: &RecipientRecord) -> Vec<TemplateCandidate> {
        self.candidates
            .iter()
            .filter_map(|path| {
                let key = template_identifier(path);
                if record.get(&key).is_truthy() {
                    Some(TemplateCandidate {
                        key,
                        path: path.clone(),
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Which selection policy a run uses
#[derive(Debug, Clone)]
pub enum Selection {
    /// Version number columns resolved under a base directory
    Count { base_path: PathBuf, prefix: String },
    /// Boolean columns over a fixed template list
    Flags { candidates: Vec<PathBuf> },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Count {
            base_path: PathBuf::from("."),
            prefix: "pdf_".to_string(),
        }
    }
}

impl Selection {
    pub fn selector(&self) -> Box<dyn TemplateSelector> {
        match self {
            Selection::Count { base_path, prefix } => {
                Box::new(CountSelector::new(base_path.clone(), prefix.clone()))
            }
            Selection::Flags { candidates } => Box::new(FlagSelector::new(candidates.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CellValue;

    fn record(cells: &[(&str, &str)]) -> RecipientRecord {
        let cells = cells
            .iter()
            .map(|(column, raw)| (column.to_string(), CellValue::parse(raw)))
            .collect();
        RecipientRecord::new(0, "Anna", None, cells)
    }

    #[test]
    fn test_count_selection_resolves_versions() {
        let selector = CountSelector::new("resources", "pdf_");
        let row = record(&[("Vorname", "Anna"), ("pdf_brief", "2"), ("pdf_anmeldung", "1.0")]);

        let selected = selector.select(&row);

        assert_eq!(
            selected,
            vec![
                TemplateCandidate {
                    key: "pdf_brief".to_string(),
                    path: PathBuf::from("resources").join("brief_2.pdf"),
                },
                TemplateCandidate {
                    key: "pdf_anmeldung".to_string(),
                    path: PathBuf::from("resources").join("anmeldung_1.pdf"),
                },
            ]
        );
    }

    #[test]
    fn test_count_selection_skips_non_numeric_cells() {
        let selector = CountSelector::new("resources", "pdf_");
        let row = record(&[("pdf_a", ""), ("pdf_b", "nan"), ("pdf_c", "ja"), ("other", "3")]);

        assert!(selector.select(&row).is_empty());
    }

    #[test]
    fn test_flag_selection_keeps_candidate_order() {
        let selector = FlagSelector::new(vec![
            PathBuf::from("templates/zweitens.pdf"),
            PathBuf::from("templates/erstens.pdf"),
            PathBuf::from("templates/drittens.pdf"),
        ]);
        let row = record(&[("erstens", "True"), ("zweitens", "1"), ("drittens", "False")]);

        let keys: Vec<String> = selector.select(&row).into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["zweitens", "erstens"]);
    }

    #[test]
    fn test_flag_selection_without_column() {
        let selector = FlagSelector::new(vec![PathBuf::from("brief.pdf")]);
        let row = record(&[("Vorname", "Anna")]);

        assert!(selector.select(&row).is_empty());
    }

    #[test]
    fn test_template_identifier() {
        assert_eq!(template_identifier(Path::new("a/b/brief.pdf")), "brief");
        assert_eq!(template_identifier(Path::new("brief")), "brief");
    }
}
