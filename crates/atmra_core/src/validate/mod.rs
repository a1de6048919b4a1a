use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::{Repair, ValidationWarning};
use crate::error::AppError;
use crate::normalize::timestamps::format_local;

/// Validate a repair record according to the store rules:
/// positive case id, non-blank text fields, `end_time >= start_time` when present.
///
/// Every warning returned here is blocking: import skips the row and update rejects it.
pub fn validate_repair(repair: &Repair) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if repair.case_id <= 0 {
        warnings.push(
            ValidationWarning::new("VALIDATION_CASE_ID_INVALID", "case_id must be positive")
                .with_details(format!("case_id={}", repair.case_id)),
        );
    }

    for (field, value) in [
        ("atm_id", &repair.atm_id),
        ("reason", &repair.reason),
        ("serial_number", &repair.serial_number),
        ("bank_name", &repair.bank_name),
        ("channel", &repair.channel),
    ] {
        if value.trim().is_empty() {
            warnings.push(
                ValidationWarning::new("VALIDATION_FIELD_BLANK", format!("{field} is required"))
                    .with_details(format!("case_id={}", repair.case_id)),
            );
        }
    }

    if let Some(end) = repair.end_time {
        if end < repair.start_time {
            warnings.push(
                ValidationWarning::new(
                    "VALIDATION_TS_ORDER_VIOLATION",
                    "Timestamp order violation: start_time must be <= end_time",
                )
                .with_details(format!(
                    "case_id={}; start_time={}; end_time={}",
                    repair.case_id,
                    format_local(repair.start_time),
                    format_local(end)
                )),
            );
        }
    }

    warnings
}

/// Turn blocking warnings into the validation error the store surfaces to callers.
pub fn ensure_valid(repair: &Repair) -> Result<(), AppError> {
    let warnings = validate_repair(repair);
    if warnings.is_empty() {
        return Ok(());
    }
    let details = warnings
        .iter()
        .map(|w| match &w.details {
            Some(d) => format!("{}: {} ({d})", w.code, w.message),
            None => format!("{}: {}", w.code, w.message),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(AppError::new("VALIDATION_REPAIR_INVALID", "Repair record failed validation")
        .with_details(details))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairValidationReportItem {
    pub case_id: i64,
    pub atm_id: String,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate every stored repair; only records with warnings are listed, ordered by case id.
pub fn validate_all_repairs(
    conn: &Connection,
) -> Result<Vec<RepairValidationReportItem>, AppError> {
    let repairs = crate::repo::list_repairs(conn)?;
    let mut out = Vec::new();

    for repair in repairs {
        let warnings = validate_repair(&repair);
        if warnings.is_empty() {
            continue;
        }
        out.push(RepairValidationReportItem {
            case_id: repair.case_id,
            atm_id: repair.atm_id,
            warnings,
        });
    }

    out.sort_by_key(|item| item.case_id);
    Ok(out)
}
