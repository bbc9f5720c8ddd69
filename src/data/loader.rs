use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, SurveyDataset};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Which columns to materialize. Survey exports carry well over a thousand
/// columns, so callers normally project down to the handful they chart.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// `None` keeps every column. Requested columns missing from the file are
    /// skipped silently; the aggregator decides whether that matters.
    pub columns: Option<BTreeSet<String>>,
}

impl LoadOptions {
    pub fn project<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LoadOptions {
            columns: Some(columns.into_iter().map(Into::into).collect()),
        }
    }

    fn wants(&self, column: &str) -> bool {
        self.columns.as_ref().map_or(true, |set| set.contains(column))
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a survey dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one respondent per row (the WVS ascii export)
/// * `.json`    – `[{ "S020": 1990, "A001": 1, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<SurveyDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path, options),
        "json" => load_json(path, options),
        "parquet" | "pq" => load_parquet(path, options),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} respondents, {} columns from {}",
        dataset.len(),
        dataset.column_names.len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one respondent per row.
/// Cells are typed by [`CellValue::parse`]; empty cells are null.
fn load_csv(path: &Path, options: &LoadOptions) -> Result<SurveyDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();

    let kept: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| options.wants(h))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    let mut row_no = 0usize;
    while reader
        .read_record(&mut record)
        .with_context(|| format!("CSV row {row_no}"))?
    {
        let values: Vec<CellValue> = kept
            .iter()
            .map(|(idx, _)| CellValue::parse(record.get(*idx).unwrap_or("")))
            .collect();
        rows.push(values);
        row_no += 1;
    }

    let names: Vec<String> = kept.into_iter().map(|(_, name)| name).collect();
    SurveyDataset::from_rows(names, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "S020": 1990, "COUNTRY_ALPHA": "USA", "A001": 1, "A002": null },
///   ...
/// ]
/// ```
///
/// Keys missing from a record read as null.
fn load_json(path: &Path, options: &LoadOptions) -> Result<SurveyDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut objects = Vec::with_capacity(records.len());
    let mut names: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if options.wants(key) && seen.insert(key.clone()) {
                names.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows: Vec<Vec<CellValue>> = objects
        .into_iter()
        .map(|obj| {
            names
                .iter()
                .map(|name| obj.get(name).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    SurveyDataset::from_rows(names, rows)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::parse(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Only the requested root columns are
/// decoded.
fn load_parquet(path: &Path, options: &LoadOptions) -> Result<SurveyDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let (roots, names): (Vec<usize>, Vec<String>) = builder
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| options.wants(f.name()))
        .map(|(i, f)| (i, f.name().clone()))
        .unzip();
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
    let reader = builder
        .with_projection(mask)
        .build()
        .context("building parquet reader")?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        // Batches share the file schema; map by name in case of reordering.
        let positions: BTreeMap<&str, usize> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().as_str(), i))
            .collect();

        for row in 0..batch.num_rows() {
            let values: Vec<CellValue> = names
                .iter()
                .map(|name| match positions.get(name.as_str()) {
                    Some(&col) => extract_cell(batch.column(col), row),
                    None => CellValue::Null,
                })
                .collect();
            rows.push(values);
        }
    }

    SurveyDataset::from_rows(names, rows)
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| CellValue::parse(s.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::LargeUtf8 => CellValue::parse(col.as_string::<i64>().value(row)),
        DataType::Int8 => any
            .downcast_ref::<Int8Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64))
            .unwrap_or(CellValue::Null),
        DataType::Int16 => any
            .downcast_ref::<Int16Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64))
            .unwrap_or(CellValue::Null),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64))
            .unwrap_or(CellValue::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64))
            .unwrap_or(CellValue::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row)))
            .unwrap_or(CellValue::Null),
        other => {
            log::debug!("Unsupported parquet column type {other:?}, reading as null");
            CellValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(ext)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv_types_and_nulls() {
        let file = write_temp(
            ".csv",
            "COUNTRY_ALPHA,S020,A001\nUSA,1990,1\nUSA,1990,\nUSA,1995,-2\n",
        );
        let ds = load_file(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.column_names, vec!["COUNTRY_ALPHA", "S020", "A001"]);
        let a001 = ds.column("A001").unwrap();
        assert_eq!(ds.records[0].get(a001), &CellValue::Integer(1));
        assert_eq!(ds.records[1].get(a001), &CellValue::Null);
        assert_eq!(ds.records[2].get(a001), &CellValue::Integer(-2));
    }

    #[test]
    fn test_load_csv_projection() {
        let file = write_temp(".csv", "COUNTRY_ALPHA,S020,A001,A002\nUSA,1990,1,2\n");
        let options = LoadOptions::project(["S020", "A002", "E069_01"]);
        let ds = load_file(file.path(), &options).unwrap();
        assert_eq!(ds.column_names, vec!["S020", "A002"]);
        assert_eq!(ds.records[0].values, vec![CellValue::Integer(1990), CellValue::Integer(2)]);
    }

    #[test]
    fn test_load_json_records() {
        let file = write_temp(
            ".json",
            r#"[{"S020": 1990, "A001": 1}, {"S020": 1995.0, "A002": 4}]"#,
        );
        let ds = load_file(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.column_names, vec!["A001", "S020", "A002"]);
        let a002 = ds.column("A002").unwrap();
        assert_eq!(ds.records[0].get(a002), &CellValue::Null);
        assert_eq!(ds.records[1].get(a002), &CellValue::Integer(4));
    }

    #[test]
    fn test_load_json_rejects_non_array() {
        let file = write_temp(".json", r#"{"S020": 1990}"#);
        assert!(load_file(file.path(), &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".xlsx", "");
        let err = load_file(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn test_load_parquet_projection() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("COUNTRY_ALPHA", DataType::Utf8, false),
            Field::new("S020", DataType::Int64, false),
            Field::new("A001", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["USA", "USA"])),
                Arc::new(Int64Array::from(vec![1990, 1995])),
                Arc::new(Float64Array::from(vec![Some(2.0), None])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(std::fs::File::create(file.path()).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(file.path(), &LoadOptions::project(["S020", "A001"])).unwrap();
        assert_eq!(ds.column_names, vec!["S020", "A001"]);
        assert_eq!(ds.records[0].values, vec![CellValue::Integer(1990), CellValue::Float(2.0)]);
        assert_eq!(ds.records[1].values, vec![CellValue::Integer(1995), CellValue::Null]);
    }
}
