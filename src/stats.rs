use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::{CellValue, SurveyDataset};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Sparse response-code histogram. Keys include out-of-domain codes such as
/// the negative "don't know" / "not asked" sentinels.
pub type OptionCounts = BTreeMap<i64, u64>;

/// Year → aggregate, ordered chronologically.
pub type QuestionSeries = BTreeMap<CellValue, YearAggregate>;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("dataset has no '{0}' year column")]
    MissingYearColumn(String),
    #[error("row {row} has no value in year column '{column}'")]
    MissingYear { column: String, row: usize },
    #[error("question {0} has no valid options")]
    NoValidOptions(String),
    #[error("question {code} lists option {option} more than once")]
    DuplicateOption { code: String, option: i64 },
}

/// One survey question and the response domain that counts towards its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub code: String,
    pub label: String,
    pub valid_options: Vec<i64>,
    /// Higher raw codes mean *less* of the attribute.
    #[serde(default)]
    pub reverse: bool,
}

/// Counts and derived score for one question in one survey year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearAggregate {
    pub year: CellValue,
    pub counts: OptionCounts,
    /// Count-weighted mean of in-domain codes; NaN when there are none.
    pub average: f64,
    /// `average`, flipped onto a "higher is stronger" scale for reversed
    /// questions.
    pub strength: f64,
}

impl YearAggregate {
    /// Whether any in-domain response contributed to the score.
    pub fn has_data(&self) -> bool {
        !self.average.is_nan()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Check an option list: non-empty, no repeats.
pub fn validate_options(code: &str, valid_options: &[i64]) -> Result<(), StatsError> {
    if valid_options.is_empty() {
        return Err(StatsError::NoValidOptions(code.to_string()));
    }
    let mut seen = BTreeSet::new();
    for &option in valid_options {
        if !seen.insert(option) {
            return Err(StatsError::DuplicateOption {
                code: code.to_string(),
                option,
            });
        }
    }
    Ok(())
}

/// Aggregate one question per survey year.
///
/// Every distinct year in the dataset gets an entry, whether or not anyone
/// answered the question that year. A missing question column is not an
/// error: every year then has empty counts and a NaN score.
pub fn aggregate(
    dataset: &SurveyDataset,
    year_column: &str,
    question_code: &str,
    valid_options: &[i64],
    reverse: bool,
) -> Result<QuestionSeries, StatsError> {
    validate_options(question_code, valid_options)?;
    let year_idx = dataset
        .column(year_column)
        .ok_or_else(|| StatsError::MissingYearColumn(year_column.to_string()))?;
    let question_idx = dataset.column(question_code);

    let mut counts_by_year: BTreeMap<CellValue, OptionCounts> = BTreeMap::new();
    for (row, respondent) in dataset.records.iter().enumerate() {
        let year = respondent.get(year_idx);
        if year.is_null() {
            return Err(StatsError::MissingYear {
                column: year_column.to_string(),
                row,
            });
        }
        let counts = counts_by_year.entry(year.normalized()).or_default();
        if let Some(code) = question_idx.and_then(|idx| respondent.get(idx).as_code()) {
            *counts.entry(code).or_insert(0) += 1;
        }
    }

    let domain: BTreeSet<i64> = valid_options.iter().copied().collect();
    // Non-empty, checked above.
    let max_option = valid_options.iter().copied().max().unwrap_or_default() as f64;

    let series = counts_by_year
        .into_iter()
        .map(|(year, counts)| {
            let average = weighted_average(&counts, &domain);
            let strength = if reverse {
                max_option - average
            } else {
                average
            };
            let aggregate = YearAggregate {
                year: year.clone(),
                counts,
                average,
                strength,
            };
            (year, aggregate)
        })
        .collect();
    Ok(series)
}

/// [`aggregate`] driven by a [`QuestionSpec`].
pub fn aggregate_question(
    dataset: &SurveyDataset,
    year_column: &str,
    question: &QuestionSpec,
) -> Result<QuestionSeries, StatsError> {
    aggregate(
        dataset,
        year_column,
        &question.code,
        &question.valid_options,
        question.reverse,
    )
}

/// Mean of the in-domain codes weighted by their counts; NaN if none.
fn weighted_average(counts: &OptionCounts, domain: &BTreeSet<i64>) -> f64 {
    let (sum, total) = counts
        .iter()
        .filter(|(code, _)| domain.contains(code))
        .fold((0.0_f64, 0u64), |(sum, total), (&code, &n)| {
            (sum + code as f64 * n as f64, total + n)
        });
    if total == 0 {
        f64::NAN
    } else {
        sum / total as f64
    }
}
