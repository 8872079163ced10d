//! Parsing of uploaded product CSVs.
//!
//! Rows are read positionally: the first three comma-separated tokens of a
//! row are the serial number, product name and image URL. The header line is
//! skipped without being checked.

use csv::{ReaderBuilder, StringRecord};
use std::io::Read;

use crate::models::request::Product;

/// Split a record into its comma-separated tokens.
///
/// A quoted field such as `"1,Widget,http://img/a.png"` is split again, so a
/// single-column row and a three-column row yield the same tokens.
pub(crate) fn row_tokens(record: &StringRecord) -> Vec<&str> {
    record.iter().flat_map(|field| field.split(',')).collect()
}

pub(crate) fn parse_serial(token: Option<&str>) -> Option<i64> {
    token.and_then(|t| t.trim().parse().ok())
}

/// Parse every data row into a [`Product`], in file order.
///
/// Short rows produce products with missing fields rather than an error.
pub fn parse_products<R: Read>(reader: R) -> Result<Vec<Product>, CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut products = Vec::new();
    for record in reader.records() {
        let record = record?;
        let tokens = row_tokens(&record);

        products.push(Product {
            serial_number: parse_serial(tokens.first().copied()),
            product_name: tokens.get(1).map(|s| s.to_string()),
            input_urls: tokens.get(2).map(|s| s.to_string()).into_iter().collect(),
            output_urls: Vec::new(),
            succeeded: false,
        });
    }

    tracing::debug!(count = products.len(), "Parsed products from CSV");
    Ok(products)
}

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
