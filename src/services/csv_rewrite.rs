use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::models::request::Product;
use crate::services::csv_ingest::{parse_serial, row_tokens, CsvError};

/// Header of the column appended to the rewritten CSV.
pub const OUTPUT_COLUMN: &str = "Output Image Urls";

/// Serial number -> comma-joined output URLs.
pub type OutputUrlMap = HashMap<i64, String>;

/// Collect the output URLs of processed products, keyed by serial number.
///
/// Products without a serial number cannot be matched to a row and are skipped.
pub fn output_url_map(products: &[Product]) -> OutputUrlMap {
    products
        .iter()
        .filter_map(|p| Some((p.serial_number?, p.output_urls.join(","))))
        .collect()
}

/// Append the output URL column to the CSV at `path`, overwriting it.
///
/// Rows are matched by the serial number in their first token; rows with no
/// entry in `urls` get an empty cell. Short rows are padded with empty fields
/// up to the header width so the URLs land under the new column. Rows wider
/// than the header keep every field and get the cell after their last one.
/// Returns the number of data rows written.
pub fn append_output_urls(path: &Path, urls: &OutputUrlMap) -> Result<usize, CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut headers = reader.headers()?.clone();
    let width = headers.len();
    headers.push_field(OUTPUT_COLUMN);

    let mut rows = Vec::new();
    for record in reader.records() {
        let mut record = record?;
        let serial = parse_serial(row_tokens(&record).first().copied());
        let cell = serial
            .and_then(|s| urls.get(&s))
            .map(String::as_str)
            .unwrap_or("");
        while record.len() < width {
            record.push_field("");
        }
        record.push_field(cell);
        rows.push(record);
    }
    drop(reader);

    let tmp_path = path.with_extension("csv.tmp");
    write_rows(&tmp_path, &headers, &rows)?;
    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), rows = rows.len(), "Rewrote CSV with output URLs");
    Ok(rows.len())
}

fn write_rows(path: &Path, headers: &StringRecord, rows: &[StringRecord]) -> Result<(), CsvError> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_writer(File::create(path)?);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
