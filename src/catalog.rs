use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::{self, file_stem};
use crate::stats::{QuestionSpec, StatsError, validate_options};

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog has no question groups")]
    Empty,
    #[error("question group '{0}' has no questions")]
    EmptyGroup(String),
    #[error("question group '{0}' is listed twice")]
    DuplicateGroup(String),
    #[error("question {0} is listed twice in one group")]
    DuplicateQuestion(String),
    #[error("group name '{0}' cannot be used as a file name")]
    BadGroupName(String),
    #[error(transparent)]
    Options(#[from] StatsError),
    #[error(transparent)]
    FileNames(#[from] output::OutputError),
}

/// One question of a group: WVS variable code and its display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub code: String,
    pub label: String,
}

/// Questions sharing one answer scale; charted together on one series figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionGroup {
    /// Slug used for the series file name, e.g. `confidence`.
    pub name: String,
    pub title: String,
    pub options: Vec<i64>,
    #[serde(default)]
    pub reverse: bool,
    pub questions: Vec<QuestionEntry>,
}

impl QuestionGroup {
    /// Expand into one [`QuestionSpec`] per question.
    pub fn specs(&self) -> Vec<QuestionSpec> {
        self.questions
            .iter()
            .map(|q| QuestionSpec {
                code: q.code.clone(),
                label: q.label.clone(),
                valid_options: self.options.clone(),
                reverse: self.reverse,
            })
            .collect()
    }
}

/// The full set of question groups charted by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub groups: Vec<QuestionGroup>,
}

impl Catalog {
    /// Check the catalog before any work is done.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.groups.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut names = BTreeSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(CatalogError::DuplicateGroup(group.name.clone()));
            }
            if group.name.is_empty() || file_stem(&group.name) != group.name {
                return Err(CatalogError::BadGroupName(group.name.clone()));
            }
            if group.questions.is_empty() {
                return Err(CatalogError::EmptyGroup(group.name.clone()));
            }
            validate_options(&group.name, &group.options)?;
            let mut codes = BTreeSet::new();
            for q in &group.questions {
                if !codes.insert(q.code.as_str()) {
                    return Err(CatalogError::DuplicateQuestion(q.code.clone()));
                }
            }
        }
        output::check_unique_stems(self.labels())?;
        Ok(())
    }

    /// Every question label across all groups.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.questions.iter().map(|q| q.label.as_str()))
    }

    /// Every question code across all groups, for load projection.
    pub fn columns(&self) -> BTreeSet<String> {
        self.groups
            .iter()
            .flat_map(|g| g.questions.iter().map(|q| q.code.clone()))
            .collect()
    }

    pub fn question_count(&self) -> usize {
        self.groups.iter().map(|g| g.questions.len()).sum()
    }
}

/// Read a catalog from a JSON array of groups.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&text)
        .with_context(|| format!("parsing catalog {}", path.display()))?;
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

/// "Could you please mention any that you would not like to have as
/// neighbors?" 1 = mentioned.
const NEIGHBOURS: &[(&str, &str)] = &[
    ("A124_02", "Neighbours: People of a different race"),
    ("A124_03", "Neighbours: Heavy drinkers"),
    ("A124_04", "Neighbours: Emotionally unstable people"),
    ("A124_05", "Neighbours: Muslims"),
    ("A124_06", "Neighbours: Immigrants/foreign workers"),
    ("A124_07", "Neighbours: People who have AIDS"),
    ("A124_08", "Neighbours: Drug addicts"),
    ("A124_09", "Neighbours: Homosexuals"),
    ("A124_12", "Neighbours: People of a different religion"),
];

/// "How much confidence do you have in them?" 1 = a great deal,
/// 4 = none at all.
const CONFIDENCE: &[(&str, &str)] = &[
    ("E069_01", "Confidence: Churches"),
    ("E069_02", "Confidence: Armed Forces"),
    ("E069_04", "Confidence: The Press"),
    ("E069_05", "Confidence: Labour Unions"),
    ("E069_06", "Confidence: The Police"),
    ("E069_07", "Confidence: Parliament"),
    ("E069_08", "Confidence: The Civil Services"),
    ("E069_10", "Confidence: Television"),
    ("E069_11", "Confidence: The Government"),
    ("E069_12", "Confidence: The Political Parties"),
    ("E069_13", "Confidence: Major Companies"),
    ("E069_14", "Confidence: The Environmental Protection Movement"),
    ("E069_15", "Confidence: The Women´s Movement"),
    ("E069_17", "Confidence: Justice System/Courts"),
    ("E069_18", "Confidence: The European Union"),
    ("E069_20", "Confidence: The United Nations"),
    ("E069_21", "Confidence: The Arab League"),
    ("E069_24", "Confidence: The NAFTA"),
    ("E069_29", "Confidence: The APEC"),
];

/// "How important is it in your life?" 1 = very important,
/// 4 = not at all important.
const IMPORTANCE: &[(&str, &str)] = &[
    ("A001", "Important in life: Family"),
    ("A002", "Important in life: Friends"),
    ("A003", "Important in life: Leisure time"),
    ("A004", "Important in life: Politics"),
    ("A005", "Important in life: Work"),
    ("A006", "Important in life: Religion"),
];

fn group(name: &str, title: &str, options: &[i64], reverse: bool, table: &[(&str, &str)]) -> QuestionGroup {
    QuestionGroup {
        name: name.to_string(),
        title: title.to_string(),
        options: options.to_vec(),
        reverse,
        questions: table
            .iter()
            .map(|&(code, label)| QuestionEntry {
                code: code.to_string(),
                label: label.to_string(),
            })
            .collect(),
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            groups: vec![
                group("neighbours", "Would not like to have as neighbours", &[0, 1], false, NEIGHBOURS),
                group("confidence", "Confidence in organizations", &[1, 2, 3, 4], true, CONFIDENCE),
                group("importance", "Important in life", &[1, 2, 3, 4], true, IMPORTANCE),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::default();
        assert_eq!(catalog.validate(), Ok(()));
        assert_eq!(catalog.groups.len(), 3);
        assert_eq!(catalog.question_count(), 9 + 19 + 6);
        assert!(catalog.columns().contains("E069_29"));
    }

    #[test]
    fn test_builtin_stems_unique() {
        let catalog = Catalog::default();
        let stems: BTreeSet<String> = catalog.labels().map(file_stem).collect();
        assert_eq!(stems.len(), catalog.question_count());
    }

    #[test]
    fn test_specs_inherit_group_scale() {
        let catalog = Catalog::default();
        let confidence = &catalog.groups[1];
        let specs = confidence.specs();
        assert_eq!(specs.len(), 19);
        assert!(specs.iter().all(|s| s.reverse && s.valid_options == vec![1, 2, 3, 4]));
        let neighbours = catalog.groups[0].specs();
        assert!(neighbours.iter().all(|s| !s.reverse && s.valid_options == vec![0, 1]));
    }

    #[test]
    fn test_validate_rejects_bad_catalogs() {
        assert_eq!(Catalog { groups: vec![] }.validate(), Err(CatalogError::Empty));

        let mut catalog = Catalog::default();
        catalog.groups[2].questions.clear();
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::EmptyGroup("importance".to_string()))
        );

        let mut catalog = Catalog::default();
        catalog.groups[1].name = "neighbours".to_string();
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::DuplicateGroup("neighbours".to_string()))
        );

        let mut catalog = Catalog::default();
        catalog.groups[0].options = vec![0, 0];
        assert!(matches!(catalog.validate(), Err(CatalogError::Options(_))));

        let mut catalog = Catalog::default();
        catalog.groups[0].name = "Neighbours: all".to_string();
        assert!(matches!(catalog.validate(), Err(CatalogError::BadGroupName(_))));
    }

    #[test]
    fn test_validate_rejects_colliding_labels() {
        let mut catalog = Catalog::default();
        catalog.groups[2].questions.push(QuestionEntry {
            code: "A007".to_string(),
            label: "important in life family".to_string(),
        });
        assert!(matches!(catalog.validate(), Err(CatalogError::FileNames(_))));
    }

    #[test]
    fn test_load_catalog_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"name": "trust", "title": "Trust", "options": [1, 2],
                 "questions": [{"code": "A165", "label": "Most people can be trusted"}]}]"#,
        )
        .unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.groups.len(), 1);
        assert!(!catalog.groups[0].reverse);
        assert_eq!(catalog.validate(), Ok(()));
    }
}
