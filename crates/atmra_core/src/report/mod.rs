use sha2::{Digest, Sha256};

use crate::analytics::{AnalyticsEngine, Report, ReportItem};
use crate::domain::Repair;
use crate::error::AppError;
use crate::normalize::timestamps::format_display;

const TABLE_HEADER: &str = "| Case | ATM | Reason | Start | End | Serial | Bank | Channel |\n";
const TABLE_RULE: &str = "|---:|---|---|---|---|---|---|---|\n";

/// SHA-256 over the canonical JSON of the records a report was built from, sorted by case id.
///
/// Two runs with the same digest saw the same snapshot and must render the same report.
pub fn snapshot_digest(repairs: &[Repair]) -> Result<String, AppError> {
    let mut sorted = repairs.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|r| r.case_id);

    let canonical = serde_json::to_vec(&sorted).map_err(|e| {
        AppError::new("REPORT_DIGEST_FAILED", "Failed to serialize snapshot for digest")
            .with_details(e.to_string())
    })?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

// Table cells must not break the row.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn repair_row(r: &Repair) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
        r.case_id,
        cell(&r.atm_id),
        cell(&r.reason),
        format_display(r.start_time),
        r.end_time
            .map(format_display)
            .unwrap_or_else(|| "—".to_string()),
        cell(&r.serial_number),
        cell(&r.bank_name),
        cell(&r.channel)
    )
}

/// Render a report as a Markdown table. Section titles become bold full-width rows.
///
/// Output depends only on the report and the snapshot, so it is snapshot-testable.
pub fn render_markdown(
    engine: &AnalyticsEngine,
    report: &Report<'_>,
    snapshot: &[Repair],
) -> Result<String, AppError> {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", engine.report_title(report.kind)));
    out.push_str(&format!(
        "Records in snapshot: **{}**  \nSnapshot digest: `{}`\n\n",
        snapshot.len(),
        snapshot_digest(snapshot)?
    ));

    if report.items.is_empty() {
        out.push_str("_No matching records._\n");
        return Ok(out);
    }

    out.push_str(TABLE_HEADER);
    out.push_str(TABLE_RULE);
    for item in &report.items {
        match item {
            ReportItem::Group { title } => {
                out.push_str(&format!("| **{}** |||||||\n", cell(title)));
            }
            ReportItem::Repair(r) => out.push_str(&repair_row(r)),
        }
    }
    Ok(out)
}
