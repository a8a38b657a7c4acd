use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Decimal128Type, Decimal256Type, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataError;
use super::model::{CellValue, Dataset};

type Record = Vec<(String, CellValue)>;

// ---------------------------------------------------------------------------
// Data source contract
// ---------------------------------------------------------------------------

/// Anything that can produce the session's dataset.
pub trait DataSource {
    /// Load the full table. Fails with [`DataError::Unavailable`] if the
    /// source cannot be read or holds no rows.
    fn load(&self) -> Result<Dataset, DataError>;
}

/// A table stored in a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl DataSource for FileSource {
    fn load(&self) -> Result<Dataset, DataError> {
        let dataset = load_file(&self.path)
            .map_err(|e| DataError::unavailable(format!("{}: {e:#}", self.path.display())))?;

        if dataset.is_empty() {
            return Err(DataError::unavailable(format!(
                "{}: no rows found",
                self.path.display()
            )));
        }
        log::info!(
            "Loaded {} rows with columns {:?} from {}",
            dataset.len(),
            dataset.columns(),
            self.path.display()
        );
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per field (recommended)
/// * `.json`    – `[{ "state": "...", "price": 450.0, ... }, ...]`
/// * `.csv`     – header row, one column per field
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (records-oriented, as `df.to_json(orient='records')`
/// writes it):
///
/// ```json
/// [
///   { "state": "APSRTC", "route_name": "Vijayawada to Hyderabad", "price": 450.0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut rows: Vec<Record> = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        rows.push(
            obj.iter()
                .map(|(key, val)| (key.clone(), json_to_cell(val)))
                .collect(),
        );
    }

    Ok(Dataset::from_records(rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::from(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one row per bus.
/// Cell types are guessed per cell; empty cells are null.
fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows: Vec<Record> = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(name, value)| (name.clone(), guess_cell_type(value)))
                .collect(),
        );
    }

    Ok(Dataset::from_records(rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::from(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding the route table.
///
/// Every column becomes a dataset column. Strings, bools, integers, floats
/// and decimals map to their cell types; any other type (times, dates,
/// timestamps, ...) is kept as its display text.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let options = FormatOptions::default();
    let mut rows: Vec<Record> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| {
                let formatter = ArrayFormatter::try_new(array.as_ref(), &options)
                    .with_context(|| format!("formatting column '{}'", field.name()))?;
                Ok((field.name().clone(), array.as_ref(), formatter))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .map(|(name, array, formatter)| {
                        (name.clone(), extract_cell_value(*array, formatter, row))
                    })
                    .collect(),
            );
        }
    }

    Ok(Dataset::from_records(rows))
}

// -- Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell_value(col: &dyn Array, formatter: &ArrayFormatter<'_>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::Boolean => col.as_boolean_opt().map(|a| CellValue::Bool(a.value(row))),
        DataType::Int8 => col
            .as_primitive_opt::<Int8Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::Int16 => col
            .as_primitive_opt::<Int16Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::UInt8 => col
            .as_primitive_opt::<UInt8Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::UInt16 => col
            .as_primitive_opt::<UInt16Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::UInt32 => col
            .as_primitive_opt::<UInt32Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::UInt64 => col.as_primitive_opt::<UInt64Type>().map(|a| {
            let v = a.value(row);
            i64::try_from(v).map_or(CellValue::Float(v as f64), CellValue::Integer)
        }),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::from(f64::from(a.value(row)))),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::from(a.value(row))),
        DataType::Decimal128(_, _) => col
            .as_primitive_opt::<Decimal128Type>()
            .and_then(|a| a.value_as_string(row).parse::<f64>().ok())
            .map(CellValue::from),
        DataType::Decimal256(_, _) => col
            .as_primitive_opt::<Decimal256Type>()
            .and_then(|a| a.value_as_string(row).parse::<f64>().ok())
            .map(CellValue::from),
        _ => None,
    };
    cell.unwrap_or_else(|| CellValue::String(formatter.value(row).to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{
        ArrayRef, Decimal128Array, Float64Array, Int32Array, StringArray,
        Time64MicrosecondArray, UInt16Array,
    };
    use arrow::datatypes::{Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::filter::{apply, FilterChain, FilterStep, StepOutcome};

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn csv_headers_are_normalized_and_cells_typed() {
        let file = temp_file(
            ".csv",
            " State ,Route_Name,Star_Rating,Price,Seats_Available\n\
             APSRTC,Vijayawada to Hyderabad,4.2,450,12\n\
             KERALA RTC,Kochi to Bangalore,,1200.5,\n",
        );

        let ds = FileSource::new(file.path()).load().unwrap();
        assert_eq!(
            ds.columns(),
            ["state", "route_name", "star_rating", "price", "seats_available"]
        );
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, "state"), &CellValue::from("APSRTC"));
        assert_eq!(ds.value(0, "price"), &CellValue::Integer(450));
        assert_eq!(ds.value(1, "price"), &CellValue::Float(1200.5));
        assert!(ds.value(1, "star_rating").is_null());
        assert!(ds.value(1, "seats_available").is_null());
    }

    #[test]
    fn json_records_load() {
        let file = temp_file(
            ".json",
            r#"[
                {"State": "TSRTC", "price": 300, "star_rating": 3.9, "busname": null},
                {"State": "HRTC", "price": 850.5, "star_rating": 4.4, "busname": "Himsuta"}
            ]"#,
        );

        let ds = FileSource::new(file.path()).load().unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, "state"), &CellValue::from("TSRTC"));
        assert_eq!(ds.value(0, "price"), &CellValue::Integer(300));
        assert_eq!(ds.value(1, "price"), &CellValue::Float(850.5));
        assert!(ds.value(0, "busname").is_null());
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let file = temp_file(".json", r#"{"state": "TSRTC"}"#);
        let err = FileSource::new(file.path()).load().unwrap_err();
        assert!(matches!(err, DataError::Unavailable { .. }));
        assert!(err.to_string().contains("Expected top-level JSON array"));
    }

    fn parquet_file(fields: Vec<Field>, columns: Vec<ArrayRef>) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        file
    }

    #[test]
    fn parquet_columns_map_to_cells() {
        let file = parquet_file(
            vec![
                Field::new("State", DataType::Utf8, false),
                Field::new("price", DataType::Float64, true),
                Field::new("seats_available", DataType::Int32, true),
            ],
            vec![
                Arc::new(StringArray::from(vec!["APSRTC", "WBTC"])),
                Arc::new(Float64Array::from(vec![Some(499.0), None])),
                Arc::new(Int32Array::from(vec![Some(20), Some(3)])),
            ],
        );

        let ds = FileSource::new(file.path()).load().unwrap();
        assert_eq!(ds.columns(), ["state", "price", "seats_available"]);
        assert_eq!(ds.value(1, "state"), &CellValue::from("WBTC"));
        assert_eq!(ds.value(0, "price"), &CellValue::Float(499.0));
        assert!(ds.value(1, "price").is_null());
        assert_eq!(ds.value(1, "seats_available"), &CellValue::Integer(3));
    }

    #[test]
    fn parquet_decimal_and_time_columns_keep_their_values() {
        const HOUR_US: i64 = 3_600_000_000;
        let prices = Decimal128Array::from(vec![45_000_i128, 120_050])
            .with_precision_and_scale(10, 2)
            .unwrap();
        let file = parquet_file(
            vec![
                Field::new("departing_time", DataType::Time64(TimeUnit::Microsecond), false),
                Field::new("price", DataType::Decimal128(10, 2), false),
                Field::new("seats_available", DataType::UInt16, false),
            ],
            vec![
                Arc::new(Time64MicrosecondArray::from(vec![21 * HOUR_US, 6 * HOUR_US])),
                Arc::new(prices),
                Arc::new(UInt16Array::from(vec![12_u16, 40])),
            ],
        );

        let ds = FileSource::new(file.path()).load().unwrap();
        assert_eq!(ds.value(0, "departing_time"), &CellValue::from("21:00:00"));
        assert_eq!(ds.value(1, "departing_time"), &CellValue::from("06:00:00"));
        assert_eq!(ds.value(0, "price"), &CellValue::Float(450.0));
        assert_eq!(ds.value(1, "price"), &CellValue::Float(1200.5));
        assert_eq!(ds.value(1, "seats_available"), &CellValue::Integer(40));

        let chain = FilterChain::new(vec![
            FilterStep::exact("departing_time"),
            FilterStep::range("price"),
        ]);
        let out = apply(&ds, &chain).unwrap();
        assert_eq!(
            out.steps,
            vec![
                StepOutcome::Values(
                    [CellValue::from("06:00:00"), CellValue::from("21:00:00")]
                        .into_iter()
                        .collect()
                ),
                StepOutcome::Range { min: 450.0, max: 1200.5 },
            ]
        );
    }

    #[test]
    fn csv_nan_cells_load_as_missing() {
        let file = temp_file(".csv", "state,star_rating\nAPSRTC,NaN\nTSRTC,4.0\n");

        let ds = FileSource::new(file.path()).load().unwrap();
        assert_eq!(ds.value(0, "star_rating"), &CellValue::Null);

        let chain = FilterChain::new(vec![FilterStep::exact("star_rating")]);
        let out = apply(&ds, &chain).unwrap();
        assert_eq!(
            out.steps,
            vec![StepOutcome::Values([CellValue::Float(4.0)].into_iter().collect())]
        );
    }

    #[test]
    fn header_only_csv_is_unavailable() {
        let file = temp_file(".csv", "state,route_name\n");
        let err = FileSource::new(file.path()).load().unwrap_err();
        assert!(matches!(err, DataError::Unavailable { .. }));
        assert!(err.to_string().contains("no rows found"));
    }

    #[test]
    fn unknown_extension_is_unavailable() {
        let file = temp_file(".xlsx", "not really a spreadsheet");
        let err = FileSource::new(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension: .xlsx"));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = FileSource::new("/nonexistent/bus_routes.csv").load().unwrap_err();
        assert!(matches!(err, DataError::Unavailable { .. }));
    }
}
