use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::{CellValue, Dataset};

/// Write the rows at `indices` as CSV: a header with every dataset column,
/// then one record per index in the given order. Null cells are empty.
pub fn write_csv<W: Write>(dataset: &Dataset, indices: &[usize], writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(dataset.columns())
        .context("writing CSV header")?;

    for &i in indices {
        let record: Vec<String> = dataset
            .columns()
            .iter()
            .map(|col| cell_to_field(dataset.value(i, col)))
            .collect();
        out.write_record(&record)
            .with_context(|| format!("writing CSV row {i}"))?;
    }

    out.flush().context("flushing CSV output")?;
    Ok(())
}

/// [`write_csv`] into a file at `path`, replacing it if it exists.
pub fn export_csv(dataset: &Dataset, indices: &[usize], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(dataset, indices, file)?;
    log::info!("Exported {} rows to {}", indices.len(), path.display());
    Ok(())
}

fn cell_to_field(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            vec![
                ("state", CellValue::from("APSRTC")),
                ("price", CellValue::Float(450.5)),
                ("seats_available", CellValue::Integer(12)),
            ],
            vec![
                ("state", CellValue::from("KERALA RTC")),
                ("price", CellValue::Null),
                ("seats_available", CellValue::Integer(3)),
            ],
            vec![
                ("state", CellValue::from("HRTC, Shimla")),
                ("price", CellValue::Float(999.0)),
                ("seats_available", CellValue::Integer(40)),
            ],
        ])
    }

    #[test]
    fn writes_header_and_selected_rows_in_order() {
        let mut buf = Vec::new();
        write_csv(&sample(), &[2, 1], &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "state,price,seats_available\n\"HRTC, Shimla\",999,40\nKERALA RTC,,3\n"
        );
    }

    #[test]
    fn empty_selection_writes_header_only() {
        let mut buf = Vec::new();
        write_csv(&sample(), &[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "state,price,seats_available\n");
    }

    #[test]
    fn export_csv_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.csv");

        export_csv(&sample(), &[0], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "state,price,seats_available\nAPSRTC,450.5,12\n");
    }
}
