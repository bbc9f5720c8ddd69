use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::chart::ImageFormat;

/// Joins the words of a label in a file name.
const JOIN: char = '_';

#[derive(Debug, Error, PartialEq)]
pub enum OutputError {
    #[error("labels '{first}' and '{second}' both map to file name '{stem}'")]
    StemCollision {
        first: String,
        second: String,
        stem: String,
    },
}

/// File-name stem for a question label: lowercased, colons dropped, spaces
/// and path separators replaced by `_`.
///
/// `"Neighbours: Immigrants/foreign workers"` → `neighbours_immigrants_foreign_workers`
pub fn file_stem(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .filter(|&c| c != ':')
        .map(|c| match c {
            ' ' | '/' | '\\' => JOIN,
            other => other,
        })
        .collect()
}

/// Fail if two distinct labels would write to the same file.
pub fn check_unique_stems<'a, I>(labels: I) -> Result<(), OutputError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for label in labels {
        let stem = file_stem(label);
        match seen.get(&stem) {
            Some(&first) if first != label => {
                return Err(OutputError::StemCollision {
                    first: first.to_string(),
                    second: label.to_string(),
                    stem,
                });
            }
            Some(_) => {}
            None => {
                seen.insert(stem, label);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output layout
// ---------------------------------------------------------------------------

/// Where charts go: `<root>/series` for line overlays, `<root>/bar` for
/// per-question distributions.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    format: ImageFormat,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn series_dir(&self) -> PathBuf {
        self.root.join("series")
    }

    pub fn bar_dir(&self) -> PathBuf {
        self.root.join("bar")
    }

    /// Create both output directories. Existing directories are fine.
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.series_dir(), self.bar_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }

    /// `<root>/series/<group>_series.<ext>`
    pub fn series_path(&self, group: &str) -> PathBuf {
        self.series_dir()
            .join(format!("{group}_series.{}", self.format.extension()))
    }

    /// `<root>/bar/<stem>_bar.<ext>`
    pub fn bar_path(&self, label: &str) -> PathBuf {
        self.bar_dir()
            .join(format!("{}_bar.{}", file_stem(label), self.format.extension()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
