//! CSV decoding into normalized product records
//!
//! Header lookup is case-insensitive. TITLE is the only required column;
//! recognized optional columns are DESCRIPTION, PRICE, SKU, TAGS, SECTION,
//! QUANTITY, LISTING_ID, IMAGE1..IMAGE10 and a comma-separated PHOTOS
//! fallback. Rows lacking a title are carried through so the reconciler can
//! count them as skipped in row order.

use crate::models::ProductRecord;
use crate::services::price_parser::parse_price;
use crate::services::tag_tokenizer::parse_tag_list;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Maximum number of indexed image-URL columns recognized
pub const MAX_IMAGE_COLUMNS: usize = 10;

/// Structural CSV failures; these abort the whole run
#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV file has no TITLE column")]
    MissingTitleColumn,

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to open CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// Read and normalize all rows of a marketplace CSV export.
///
/// Reads the full row set up front, which is what enables pre-classification
/// batching in the controller.
pub fn read_products(path: &Path) -> Result<Vec<ProductRecord>, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let columns = column_index(reader.headers()?);
    if !columns.contains_key("title") {
        return Err(CsvImportError::MissingTitleColumn);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(record_from_row(&row, &columns));
    }

    tracing::debug!(rows = records.len(), "CSV decoded");
    Ok(records)
}

/// Lowercased header name -> column index
fn column_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_lowercase(), idx))
        .collect()
}

fn record_from_row(row: &csv::StringRecord, columns: &HashMap<String, usize>) -> ProductRecord {
    ProductRecord {
        title: field(row, columns, "title").to_string(),
        description: field(row, columns, "description").to_string(),
        price: parse_price(field(row, columns, "price")),
        sku: optional_field(row, columns, "sku"),
        tags: parse_tag_list(field(row, columns, "tags")),
        image_urls: collect_image_urls(row, columns),
        taxonomy_path: optional_field(row, columns, "section"),
        quantity: field(row, columns, "quantity").parse::<i64>().ok(),
        listing_ref: optional_field(row, columns, "listing_id"),
    }
}

fn field<'r>(row: &'r csv::StringRecord, columns: &HashMap<String, usize>, name: &str) -> &'r str {
    columns
        .get(name)
        .and_then(|&idx| row.get(idx))
        .unwrap_or("")
        .trim()
}

fn optional_field(
    row: &csv::StringRecord,
    columns: &HashMap<String, usize>,
    name: &str,
) -> Option<String> {
    let value = field(row, columns, name);
    (!value.is_empty()).then(|| value.to_string())
}

/// Image URLs from IMAGE1..IMAGE10, falling back to the PHOTOS column when
/// no indexed column yields anything. Only syntactically valid http(s) URLs
/// are accepted; order is preserved.
fn collect_image_urls(row: &csv::StringRecord, columns: &HashMap<String, usize>) -> Vec<String> {
    let mut urls = Vec::new();

    for i in 1..=MAX_IMAGE_COLUMNS {
        let name = format!("image{}", i);
        if let Some(&idx) = columns.get(&name) {
            if let Some(value) = row.get(idx) {
                push_valid_url(&mut urls, value);
            }
        }
    }

    if urls.is_empty() {
        if let Some(&idx) = columns.get("photos") {
            if let Some(value) = row.get(idx) {
                for part in value.split(',') {
                    push_valid_url(&mut urls, part);
                }
            }
        }
    }

    urls
}

fn push_valid_url(urls: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            urls.push(trimmed.to_string());
        }
        _ => {
            tracing::debug!(url = trimmed, "Rejected invalid image URL");
        }
    }
}
