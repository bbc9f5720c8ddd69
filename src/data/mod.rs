/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file (projected columns) → SurveyDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SurveyDataset │  Vec<Respondent>, column index
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  keep one country's respondents
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
