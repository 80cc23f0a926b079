use crate::config::{LabelsConfig, Validatable};
use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Failed to read labels file: {0}")]
    Io(#[from] io::Error),
    #[error("Labels file contains no labels")]
    Empty,
    #[error("Duplicate label `{0}`")]
    Duplicate(String),
}

/// Ordered class names; position `i` names output dimension `i` of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(LabelError::Duplicate(label.clone()));
            }
        }
        Ok(Self { labels })
    }

    pub fn from_config(labels_cfg: &LabelsConfig) -> Result<Self, LabelError> {
        let labels = load_labels(&labels_cfg.get_path())?;
        Self::new(labels)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// One label per line. Blank lines and `#` comments are skipped.
pub fn load_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if label.is_empty() || label.starts_with('#') {
            continue;
        }
        labels.push(label.to_string());
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_labels_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "# binary table").unwrap();
        writeln!(file, "Normal").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  Pneumonia  ").unwrap();

        let cfg = LabelsConfig {
            labels_file: "labels.txt".to_string(),
            labels_dir: dir.path().to_path_buf(),
        };
        let table = LabelTable::from_config(&cfg).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some("Normal"));
        assert_eq!(table.get(1), Some("Pneumonia"));
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn test_rejects_empty_and_duplicate_tables() {
        assert!(matches!(LabelTable::new(vec![]), Err(LabelError::Empty)));
        assert!(matches!(
            LabelTable::new(vec!["COVID".into(), "COVID".into()]),
            Err(LabelError::Duplicate(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let cfg = LabelsConfig {
            labels_file: "missing.txt".to_string(),
            labels_dir: "./nowhere".into(),
        };
        assert!(matches!(
            LabelTable::from_config(&cfg),
            Err(LabelError::Io(_))
        ));
    }
}
