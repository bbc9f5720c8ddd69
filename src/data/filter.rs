use std::path::Path;

use anyhow::{Context, Result};

use super::model::{CellValue, SurveyDataset};

// ---------------------------------------------------------------------------
// In-memory row filter
// ---------------------------------------------------------------------------

/// Keep only respondents whose `column` equals `value`.
///
/// Returns the number of rows kept. A dataset without `column` keeps nothing,
/// since no row can match.
pub fn retain_matching(dataset: &mut SurveyDataset, column: &str, value: &str) -> usize {
    match dataset.column(column) {
        Some(idx) => dataset.retain(|r| r.get(idx).matches_text(value)),
        None => {
            log::warn!("Column '{column}' not loaded; no respondent matches '{value}'");
            dataset.retain(|_| false);
        }
    }
    dataset.len()
}

// ---------------------------------------------------------------------------
// Streaming country extraction
// ---------------------------------------------------------------------------

/// Result of a one-off subset extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub rows_read: usize,
    pub rows_written: usize,
}

/// Copy the rows of `source` whose `column` equals `value` into `dest`,
/// header included.
///
/// The multi-country export is several gigabytes, so rows are streamed one
/// at a time rather than loaded into a [`SurveyDataset`].
pub fn extract_country(
    source: &Path,
    dest: &Path,
    column: &str,
    value: &str,
) -> Result<ExtractSummary> {
    let mut reader = csv::Reader::from_path(source)
        .with_context(|| format!("opening {}", source.display()))?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let idx = headers
        .iter()
        .position(|h| h == column)
        .with_context(|| format!("{} has no '{column}' column", source.display()))?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(dest)
        .with_context(|| format!("creating {}", dest.display()))?;
    writer.write_record(&headers).context("writing CSV header")?;

    let mut summary = ExtractSummary {
        rows_read: 0,
        rows_written: 0,
    };
    let mut record = csv::StringRecord::new();
    while reader
        .read_record(&mut record)
        .with_context(|| format!("CSV row {}", summary.rows_read))?
    {
        summary.rows_read += 1;
        if record
            .get(idx)
            .is_some_and(|cell| CellValue::parse(cell).matches_text(value))
        {
            writer.write_record(&record).context("writing CSV row")?;
            summary.rows_written += 1;
        }
    }
    writer.flush().context("flushing output")?;

    log::info!(
        "Extracted {} of {} rows where {column} = {value} into {}",
        summary.rows_written,
        summary.rows_read,
        dest.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_country_keeps_header_and_matches() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wvs.csv");
        std::fs::write(
            &source,
            "COUNTRY_ALPHA,S020,A001\nUSA,1990,1\nDEU,1990,2\nUSA,1995,3\n",
        )
        .unwrap();
        let dest = dir.path().join("out").join("us.csv");

        let summary = extract_country(&source, &dest, "COUNTRY_ALPHA", "USA").unwrap();
        assert_eq!(
            summary,
            ExtractSummary {
                rows_read: 3,
                rows_written: 2
            }
        );
        let written = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(written, "COUNTRY_ALPHA,S020,A001\nUSA,1990,1\nUSA,1995,3\n");
    }

    #[test]
    fn test_extract_and_retain_agree_on_numeric_codes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wvs.csv");
        std::fs::write(&source, "S003,S020\n840.0,1990\n 840,1995\n276,1990\n").unwrap();
        let dest = dir.path().join("us.csv");

        let summary = extract_country(&source, &dest, "S003", "840").unwrap();
        assert_eq!(summary.rows_written, 2);

        let mut ds = crate::data::loader::load_file(&source, &Default::default()).unwrap();
        assert_eq!(retain_matching(&mut ds, "S003", "840"), summary.rows_written);
    }

    #[test]
    fn test_extract_country_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wvs.csv");
        std::fs::write(&source, "S020,A001\n1990,1\n").unwrap();
        let err = extract_country(&source, &dir.path().join("us.csv"), "COUNTRY_ALPHA", "USA")
            .unwrap_err();
        assert!(format!("{err:#}").contains("COUNTRY_ALPHA"));
    }

    #[test]
    fn test_retain_matching() {
        let mut ds = SurveyDataset::from_rows(
            vec!["COUNTRY_ALPHA".to_string(), "S020".to_string()],
            vec![
                vec![CellValue::Text("USA".to_string()), CellValue::Integer(1990)],
                vec![CellValue::Text("DEU".to_string()), CellValue::Integer(1990)],
            ],
        )
        .unwrap();
        assert_eq!(retain_matching(&mut ds, "COUNTRY_ALPHA", "USA"), 1);
        assert_eq!(ds.records[0].get(0), &CellValue::Text("USA".to_string()));
    }

    #[test]
    fn test_retain_matching_numeric_codes() {
        let mut ds = SurveyDataset::from_rows(
            vec!["S003".to_string()],
            vec![vec![CellValue::Float(840.0)], vec![CellValue::Integer(276)]],
        )
        .unwrap();
        assert_eq!(retain_matching(&mut ds, "S003", "840"), 1);
    }
}
