use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::{Repair, ValidationWarning};
use crate::error::AppError;
use crate::normalize::timestamps::normalize_timestamp;
use crate::repo::upsert_repairs;
use crate::validate::validate_repair;

/// Positional layout of the bank export. The first row is a header and is never read as data.
pub const COLUMNS: [&str; 8] = [
    "case_id",
    "atm_id",
    "reason",
    "start_time",
    "end_time",
    "serial_number",
    "bank_name",
    "channel",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairCsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairImportSummary {
    /// Data rows read (header excluded).
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub warnings: Vec<ValidationWarning>,
}

fn reader(csv_text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes())
}

fn cell(row: &csv::StringRecord, idx: usize) -> Option<&str> {
    row.get(idx).map(str::trim).filter(|v| !v.is_empty())
}

pub fn preview_repair_csv(csv_text: &str, max_rows: usize) -> Result<RepairCsvPreview, AppError> {
    let mut rdr = reader(csv_text);

    let headers = rdr
        .headers()
        .map_err(|e| {
            AppError::new("INGEST_CSV_HEADERS_FAILED", "Failed to read CSV headers")
                .with_details(e.to_string())
        })?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for result in rdr.records().take(max_rows) {
        let row = result.map_err(|e| {
            AppError::new("INGEST_CSV_PARSE_FAILED", "Failed to parse CSV row")
                .with_details(e.to_string())
        })?;
        rows.push(row.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }

    Ok(RepairCsvPreview { headers, rows })
}

/// Spreadsheet exports write numeric cells as `"7001.0"`; read those back as the whole number.
/// Anything that is not a whole decimal number is returned unchanged.
fn whole_number_text(raw: &str) -> &str {
    let Some((int_part, frac)) = raw.split_once('.') else {
        return raw;
    };
    let digits = int_part.strip_prefix('-').unwrap_or(int_part);
    let is_whole = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !frac.is_empty()
        && frac.bytes().all(|b| b == b'0');
    if is_whole {
        int_part
    } else {
        raw
    }
}

fn parse_case_id(raw: Option<&str>, row_idx: usize, warnings: &mut Vec<ValidationWarning>) -> Option<i64> {
    let Some(s) = raw else {
        warnings.push(
            ValidationWarning::new("INGEST_MISSING_CASE_ID", "Row missing required case_id")
                .with_details(format!("row={row_idx}")),
        );
        return None;
    };
    match whole_number_text(s).parse::<i64>() {
        Ok(v) => Some(v),
        Err(e) => {
            warnings.push(
                ValidationWarning::new("INGEST_CASE_ID_PARSE_FAILED", "Failed to parse case_id")
                    .with_details(format!("row={row_idx}; value={s}; err={e}")),
            );
            None
        }
    }
}

/// Parse one data row. Returns `None` (with warnings) when the row cannot become a record.
fn parse_row(
    row_idx: usize,
    row: &csv::StringRecord,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<Repair> {
    if row.len() < COLUMNS.len() {
        warnings.push(
            ValidationWarning::new("INGEST_ROW_TOO_SHORT", "Row has fewer columns than expected")
                .with_details(format!(
                    "row={row_idx}; expected={}; got={}",
                    COLUMNS.len(),
                    row.len()
                )),
        );
        return None;
    }

    let case_id = parse_case_id(cell(row, 0), row_idx, warnings);

    let start = normalize_timestamp("start_time", cell(row, 3).unwrap_or(""), warnings);
    let end = normalize_timestamp("end_time", cell(row, 4).unwrap_or(""), warnings);
    if start.value.is_none() && start.raw.is_none() {
        warnings.push(
            ValidationWarning::new("INGEST_MISSING_START_TIME", "Row missing required start_time")
                .with_details(format!("row={row_idx}")),
        );
    }

    let (Some(case_id), Some(start_time)) = (case_id, start.value) else {
        return None;
    };
    // A provided but unparseable end time must not silently turn into an open repair.
    if end.raw.is_some() {
        return None;
    }

    let text = |idx: usize| cell(row, idx).unwrap_or("").to_string();
    let number_text = |idx: usize| whole_number_text(cell(row, idx).unwrap_or("")).to_string();
    Some(Repair {
        case_id,
        atm_id: number_text(1),
        reason: text(2),
        start_time,
        end_time: end.value,
        serial_number: number_text(5),
        bank_name: text(6),
        channel: text(7),
    })
}

/// Parse and validate an export without touching the store.
///
/// Rows that fail to parse, fail validation, or repeat a case id already seen in the same file
/// are skipped and reported as warnings (row index in details, 0 = first data row).
pub fn parse_repair_csv(csv_text: &str) -> Result<(Vec<Repair>, RepairImportSummary), AppError> {
    let mut summary = RepairImportSummary::default();
    let mut repairs = Vec::new();
    let mut seen_case_ids = HashSet::new();

    let mut rdr = reader(csv_text);
    rdr.headers().map_err(|e| {
        AppError::new("INGEST_CSV_HEADERS_FAILED", "Failed to read CSV headers")
            .with_details(e.to_string())
    })?;

    for (row_idx, result) in rdr.records().enumerate() {
        summary.rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                summary.warnings.push(
                    ValidationWarning::new("INGEST_CSV_PARSE_FAILED", "Failed to parse CSV row")
                        .with_details(format!("row={row_idx}; err={e}")),
                );
                summary.skipped += 1;
                continue;
            }
        };

        let Some(repair) = parse_row(row_idx, &row, &mut summary.warnings) else {
            summary.skipped += 1;
            continue;
        };

        let row_warnings = validate_repair(&repair);
        if !row_warnings.is_empty() {
            summary.warnings.extend(row_warnings.into_iter().map(|w| {
                let details = match &w.details {
                    Some(d) => format!("row={row_idx}; {d}"),
                    None => format!("row={row_idx}"),
                };
                w.with_details(details)
            }));
            summary.skipped += 1;
            continue;
        }

        if !seen_case_ids.insert(repair.case_id) {
            summary.warnings.push(
                ValidationWarning::new("INGEST_DUPLICATE_CASE_ID", "Duplicate case_id in import")
                    .with_details(format!("row={row_idx}; case_id={}", repair.case_id)),
            );
            summary.skipped += 1;
            continue;
        }

        repairs.push(repair);
    }

    Ok((repairs, summary))
}

/// Bulk import: parse, validate, then create-or-update every accepted row by case id.
pub fn import_repair_csv(
    conn: &mut Connection,
    csv_text: &str,
) -> Result<RepairImportSummary, AppError> {
    let (repairs, mut summary) = parse_repair_csv(csv_text)?;
    let upserted = upsert_repairs(conn, &repairs)?;

    summary.inserted = upserted.inserted;
    summary.updated = upserted.updated;
    summary.unchanged = upserted.unchanged;

    tracing::info!(
        rows = summary.rows,
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        warnings = summary.warnings.len(),
        "imported repair csv"
    );
    Ok(summary)
}
