use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::domain::Repair;
use crate::error::AppError;
use crate::normalize::timestamps::{format_local, parse_local};
use crate::validate::ensure_valid;

const SELECT_REPAIR_COLUMNS: &str = r#"
      SELECT
        case_id, atm_id, reason, start_time, end_time,
        serial_number, bank_nm, channel
      FROM repairs
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<time::PrimitiveDateTime>> {
    let Some(text) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    parse_local(&text)
        .map(Some)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn repair_from_row(row: &Row<'_>) -> rusqlite::Result<Repair> {
    let start_time = ts_column(row, 3)?
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(3, "start_time".to_string(), Type::Null))?;
    Ok(Repair {
        case_id: row.get(0)?,
        atm_id: row.get(1)?,
        reason: row.get(2)?,
        start_time,
        end_time: ts_column(row, 4)?,
        serial_number: row.get(5)?,
        bank_name: row.get(6)?,
        channel: row.get(7)?,
    })
}

/// Full snapshot of the store, ordered by case id so "store order" is stable across calls.
pub fn list_repairs(conn: &Connection) -> Result<Vec<Repair>, AppError> {
    let sql = format!("{SELECT_REPAIR_COLUMNS} ORDER BY case_id ASC");
    let mut stmt = conn.prepare(&sql).map_err(|e| {
        AppError::store("DB_QUERY_FAILED", "Failed to prepare repairs query")
            .with_details(e.to_string())
    })?;

    let rows = stmt.query_map([], repair_from_row).map_err(|e| {
        AppError::store("DB_QUERY_FAILED", "Failed to query repairs").with_details(e.to_string())
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| {
            AppError::store("DB_QUERY_FAILED", "Failed to decode repair row")
                .with_details(e.to_string())
        })?);
    }

    Ok(out)
}

pub fn count_repairs(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("SELECT COUNT(*) FROM repairs", [], |row| row.get(0))
        .map_err(|e| {
            AppError::store("DB_QUERY_FAILED", "Failed to count repairs")
                .with_details(e.to_string())
        })
}

fn find_repair(conn: &Connection, case_id: i64) -> Result<Option<Repair>, AppError> {
    let sql = format!("{SELECT_REPAIR_COLUMNS} WHERE case_id = ?1");
    conn.query_row(&sql, [case_id], repair_from_row)
        .optional()
        .map_err(|e| {
            AppError::store("DB_QUERY_FAILED", "Failed to query repair by case_id")
                .with_details(e.to_string())
        })
}

pub fn get_repair(conn: &Connection, case_id: i64) -> Result<Repair, AppError> {
    find_repair(conn, case_id)?.ok_or_else(|| {
        AppError::not_found("Repair not found").with_details(format!("case_id={case_id}"))
    })
}

fn insert_row(conn: &Connection, repair: &Repair) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
      INSERT INTO repairs(
        case_id, atm_id, reason, start_time, end_time,
        serial_number, bank_nm, channel, ingested_at
      ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, strftime('%Y-%m-%dT%H:%M:%fZ','now'))
      "#,
        rusqlite::params![
            repair.case_id,
            repair.atm_id,
            repair.reason,
            format_local(repair.start_time),
            repair.end_time.map(format_local),
            repair.serial_number,
            repair.bank_name,
            repair.channel,
        ],
    )
}

fn update_row(conn: &Connection, repair: &Repair) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
      UPDATE repairs SET
        atm_id = ?2,
        reason = ?3,
        start_time = ?4,
        end_time = ?5,
        serial_number = ?6,
        bank_nm = ?7,
        channel = ?8,
        ingested_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
      WHERE case_id = ?1
      "#,
        rusqlite::params![
            repair.case_id,
            repair.atm_id,
            repair.reason,
            format_local(repair.start_time),
            repair.end_time.map(format_local),
            repair.serial_number,
            repair.bank_name,
            repair.channel,
        ],
    )
}

/// Replace the stored record with the same `case_id`.
///
/// The record must already exist (`DB_NOT_FOUND` otherwise) and pass validation
/// (`VALIDATION_REPAIR_INVALID`). Returns the record as stored.
pub fn update_repair(conn: &Connection, repair: &Repair) -> Result<Repair, AppError> {
    ensure_valid(repair)?;

    let changed = update_row(conn, repair).map_err(|e| {
        AppError::store("DB_UPDATE_FAILED", "Failed to update repair")
            .with_details(format!("case_id={}; err={e}", repair.case_id))
    })?;
    if changed == 0 {
        return Err(AppError::not_found("Repair not found")
            .with_details(format!("case_id={}", repair.case_id)));
    }

    tracing::info!(case_id = repair.case_id, "updated repair");
    get_repair(conn, repair.case_id)
}

/// Create-or-update by `case_id`, in one transaction.
///
/// Callers are expected to have validated the records; this layer only persists them.
pub fn upsert_repairs(conn: &mut Connection, repairs: &[Repair]) -> Result<UpsertSummary, AppError> {
    let tx = conn.transaction().map_err(|e| {
        AppError::store("DB_TX_FAILED", "Failed to start upsert transaction")
            .with_details(e.to_string())
    })?;

    let mut summary = UpsertSummary::default();
    for repair in repairs {
        match find_repair(&tx, repair.case_id)? {
            Some(existing) if existing.same_content(repair) => summary.unchanged += 1,
            Some(_) => {
                update_row(&tx, repair).map_err(|e| {
                    AppError::store("DB_UPDATE_FAILED", "Failed to update repair")
                        .with_details(format!("case_id={}; err={e}", repair.case_id))
                })?;
                summary.updated += 1;
            }
            None => {
                insert_row(&tx, repair).map_err(|e| {
                    AppError::store("DB_INSERT_FAILED", "Failed to insert repair")
                        .with_details(format!("case_id={}; err={e}", repair.case_id))
                })?;
                summary.inserted += 1;
            }
        }
    }

    tx.commit().map_err(|e| {
        AppError::store("DB_TX_FAILED", "Failed to commit upsert transaction")
            .with_details(e.to_string())
    })?;

    tracing::info!(
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "upserted repairs"
    );
    Ok(summary)
}

/// Remove every record. Returns how many were deleted.
pub fn delete_all_repairs(conn: &Connection) -> Result<usize, AppError> {
    let deleted = conn.execute("DELETE FROM repairs", []).map_err(|e| {
        AppError::store("DB_DELETE_FAILED", "Failed to delete repairs").with_details(e.to_string())
    })?;
    tracing::info!(deleted, "deleted all repairs");
    Ok(deleted)
}
