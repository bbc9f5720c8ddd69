use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Int64Array, Int64Builder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Pick an index according to relative `weights`.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= w;
        }
        weights.len() - 1
    }
}

/// How a synthetic question answers: scale codes plus WVS missing codes.
struct QuestionModel {
    code: &'static str,
    options: &'static [i64],
    /// Answer weights at the first wave; they drift linearly to `last`.
    first: &'static [f64],
    last: &'static [f64],
    /// Waves where the question was not asked (column left empty).
    not_asked: &'static [i64],
}

const WAVES: [i64; 7] = [1982, 1990, 1995, 1999, 2006, 2011, 2017];
/// WVS sentinels: -1 don't know, -2 no answer.
const MISSING_CODES: [i64; 2] = [-1, -2];

const QUESTIONS: &[QuestionModel] = &[
    QuestionModel {
        code: "A001",
        options: &[1, 2, 3, 4],
        first: &[0.9, 0.08, 0.015, 0.005],
        last: &[0.88, 0.1, 0.015, 0.005],
        not_asked: &[],
    },
    QuestionModel {
        code: "A006",
        options: &[1, 2, 3, 4],
        first: &[0.55, 0.25, 0.12, 0.08],
        last: &[0.38, 0.25, 0.2, 0.17],
        not_asked: &[1982],
    },
    QuestionModel {
        code: "A124_05",
        options: &[0, 1],
        first: &[0.9, 0.1],
        last: &[0.87, 0.13],
        not_asked: &[1982, 1990, 1995],
    },
    QuestionModel {
        code: "E069_01",
        options: &[1, 2, 3, 4],
        first: &[0.4, 0.35, 0.2, 0.05],
        last: &[0.2, 0.3, 0.35, 0.15],
        not_asked: &[],
    },
    QuestionModel {
        code: "E069_18",
        options: &[1, 2, 3, 4],
        first: &[0.05, 0.3, 0.45, 0.2],
        last: &[0.05, 0.25, 0.45, 0.25],
        not_asked: &[1982, 1990, 1995, 1999, 2006, 2011],
    },
];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let respondents_per_wave = 400;
    let countries = ["USA", "USA", "USA", "CAN"];

    let mut all_country: Vec<&str> = Vec::new();
    let mut all_year: Vec<i64> = Vec::new();
    let mut answers: Vec<Int64Builder> = QUESTIONS.iter().map(|_| Int64Builder::new()).collect();

    for (wave_idx, &year) in WAVES.iter().enumerate() {
        let t = wave_idx as f64 / (WAVES.len() - 1) as f64;
        for _ in 0..respondents_per_wave {
            all_country.push(countries[rng.weighted(&[1.0; 4])]);
            all_year.push(year);

            for (q, builder) in QUESTIONS.iter().zip(answers.iter_mut()) {
                if q.not_asked.contains(&year) {
                    builder.append_null();
                    continue;
                }
                if rng.next_f64() < 0.03 {
                    builder.append_value(MISSING_CODES[rng.weighted(&[1.0, 1.0])]);
                    continue;
                }
                let weights: Vec<f64> = q
                    .first
                    .iter()
                    .zip(q.last)
                    .map(|(a, b)| a + (b - a) * t)
                    .collect();
                builder.append_value(q.options[rng.weighted(&weights)]);
            }
        }
    }

    let mut fields = vec![
        Field::new("COUNTRY_ALPHA", DataType::Utf8, false),
        Field::new("S020", DataType::Int64, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(all_country)),
        Arc::new(Int64Array::from(all_year)),
    ];
    for (q, mut builder) in QUESTIONS.iter().zip(answers) {
        fields.push(Field::new(q.code, DataType::Int64, true));
        columns.push(Arc::new(builder.finish()));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    // Write Parquet
    let parquet_path = "sample_survey.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    // Write CSV (same rows, empty cells for nulls)
    let csv_path = "sample_survey.csv";
    write_csv(csv_path, &batch)?;

    println!(
        "Wrote {} respondents over {} waves to {parquet_path} and {csv_path}",
        batch.num_rows(),
        WAVES.len()
    );
    Ok(())
}

fn write_csv(path: &str, batch: &RecordBatch) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV output")?;
    let schema = batch.schema();
    writer
        .write_record(schema.fields().iter().map(|f| f.name().as_str()))
        .context("writing CSV header")?;

    let countries = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .context("country column is not text")?;
    let ints: Vec<&Int64Array> = batch.columns()[1..]
        .iter()
        .map(|col| {
            col.as_any()
                .downcast_ref::<Int64Array>()
                .context("expected an integer column")
        })
        .collect::<Result<_>>()?;

    for row in 0..batch.num_rows() {
        let mut record = vec![countries.value(row).to_string()];
        for col in &ints {
            record.push(if col.is_null(row) {
                String::new()
            } else {
                col.value(row).to_string()
            });
        }
        writer.write_record(&record).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}
