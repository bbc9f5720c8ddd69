use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Result, bail};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the survey table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes found in survey exports.
/// Used as a `BTreeMap` key (years), so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can key maps by CellValue --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        use std::cmp::Ordering;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            // Numbers compare by value; ties keep integers first so the order stays total.
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw text cell the way pandas does on `read_csv`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "True" || s == "False" || s == "true" || s == "false" {
            return CellValue::Bool(s.eq_ignore_ascii_case("true"));
        }
        CellValue::Text(s.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null) || matches!(self, CellValue::Float(f) if f.is_nan())
    }

    /// Interpret the cell as a categorical response code.
    ///
    /// Floats qualify only when integral (`3.0` is code 3); nulls, text and
    /// fractional values are not responses.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Collapse integral floats into integers so `1990` and `1990.0` key the
    /// same bucket.
    pub fn normalized(&self) -> CellValue {
        match self {
            CellValue::Float(f) if f.is_nan() => CellValue::Null,
            CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                CellValue::Integer(*f as i64)
            }
            other => other.clone(),
        }
    }

    /// Whether the cell equals a raw text value, comparing through the
    /// same type guessing used at load time.
    pub fn matches_text(&self, raw: &str) -> bool {
        self.normalized() == CellValue::parse(raw).normalized()
    }
}

// ---------------------------------------------------------------------------
// Respondent – one row of the survey table
// ---------------------------------------------------------------------------

/// A single respondent record; values are aligned with the dataset's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Respondent {
    pub values: Vec<CellValue>,
}

impl Respondent {
    /// Value at a column index; short rows read as null.
    pub fn get(&self, idx: usize) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.values.get(idx).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// SurveyDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table with a column-name index.
#[derive(Debug, Clone, Default)]
pub struct SurveyDataset {
    /// Ordered column names as they appeared in the source header.
    pub column_names: Vec<String>,
    /// All respondents (rows).
    pub records: Vec<Respondent>,
    column_index: BTreeMap<String, usize>,
}

impl SurveyDataset {
    /// Build a dataset from column names and row-major values.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut column_index = BTreeMap::new();
        for (i, name) in column_names.iter().enumerate() {
            if column_index.insert(name.clone(), i).is_some() {
                bail!("duplicate column '{name}'");
            }
        }
        let width = column_names.len();
        let mut records = Vec::with_capacity(rows.len());
        for (row_no, values) in rows.into_iter().enumerate() {
            if values.len() > width {
                bail!(
                    "row {row_no} has {} values but there are only {width} columns",
                    values.len()
                );
            }
            records.push(Respondent { values });
        }
        Ok(SurveyDataset {
            column_names,
            records,
            column_index,
        })
    }

    /// Index of a column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    /// Sorted set of distinct (normalized) values in a column.
    pub fn distinct(&self, name: &str) -> BTreeSet<CellValue> {
        match self.column(name) {
            Some(idx) => self
                .records
                .iter()
                .map(|r| r.get(idx).normalized())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Keep only the rows accepted by `keep`; columns are unchanged.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Respondent) -> bool,
    {
        self.records.retain(|r| keep(r));
    }

    /// Number of respondents.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
