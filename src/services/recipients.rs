//! Recipient table parsing
//!
//! Uploaded recipient lists arrive as CSV. The header row names the
//! placeholders; every following record becomes one `RecipientRow`.

use anyhow::{Context, Result};

use crate::types::{RecipientRow, EMAIL_KEY};

/// Pick `;` when the header line uses it and has no commas (spreadsheet exports).
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

fn normalize_header(header: &str) -> String {
    let header = header.trim().trim_start_matches('\u{feff}').trim();
    if header.eq_ignore_ascii_case(EMAIL_KEY) {
        EMAIL_KEY.to_string()
    } else {
        header.to_string()
    }
}

/// Parse CSV content into recipient rows, in file order.
///
/// Short records simply lack the trailing keys; those placeholders then go
/// through the fallback policy. Records with only blank cells are skipped.
pub fn parse_recipients_csv(content: &str) -> Result<Vec<RecipientRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid CSV record {}", line + 1))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row: RecipientRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
