use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, Time};

use crate::domain::ValidationWarning;

/// Storage and JSON form of a local timestamp.
pub const LOCAL_ISO: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const DISPLAY: &[BorrowedFormatItem<'static>] =
    format_description!("[day].[month].[year] [hour].[minute]");

// Deterministic allowlist only (no fuzzy parsing). Order matters: longer formats first.
const DATE_TIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[day].[month].[year] [hour]:[minute]:[second]"),
    format_description!("[day].[month].[year] [hour]:[minute]"),
    format_description!("[day].[month].[year] [hour].[minute]"),
];

const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[day].[month].[year]"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTimestamp {
    pub value: Option<PrimitiveDateTime>,
    /// Raw input, kept only when it could not be parsed.
    pub raw: Option<String>,
}

/// Parse a stored canonical value (`YYYY-MM-DDTHH:MM:SS`).
pub fn parse_local(s: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(s, LOCAL_ISO)
}

/// Canonical text form. Infallible for the components `PrimitiveDateTime` can hold.
pub fn format_local(dt: PrimitiveDateTime) -> String {
    dt.format(LOCAL_ISO).unwrap_or_else(|_| dt.to_string())
}

/// `dd.mm.YYYY hh.mm`, the form operators read in reports.
pub fn format_display(dt: PrimitiveDateTime) -> String {
    dt.format(DISPLAY).unwrap_or_else(|_| dt.to_string())
}

fn parse_allowlist(raw: &str) -> Option<PrimitiveDateTime> {
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = PrimitiveDateTime::parse(raw, fmt) {
            return Some(dt.replace_nanosecond(0).unwrap_or(dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = time::Date::parse(raw, fmt) {
            return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT));
        }
    }
    None
}

/// Normalize a user-provided timestamp into a local date-time.
///
/// Contract:
/// - Empty input is "not provided": `value=None`, `raw=None`, no warning.
/// - Allowlisted local formats parse silently.
/// - RFC3339 input keeps its wall-clock time and drops the offset, with a warning.
/// - Anything else keeps `raw`, leaves `value=None` and warns.
pub fn normalize_timestamp(
    field: &str,
    raw_input: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> NormalizedTimestamp {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return NormalizedTimestamp {
            value: None,
            raw: None,
        };
    }

    if let Some(dt) = parse_allowlist(trimmed) {
        return NormalizedTimestamp {
            value: Some(dt),
            raw: None,
        };
    }

    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        warnings.push(
            ValidationWarning::new(
                "INGEST_TS_OFFSET_DROPPED",
                format!("Dropped UTC offset from {field}; kept local wall time"),
            )
            .with_details(format!("raw={trimmed}")),
        );
        let local = PrimitiveDateTime::new(dt.date(), dt.time());
        return NormalizedTimestamp {
            value: Some(local.replace_nanosecond(0).unwrap_or(local)),
            raw: None,
        };
    }

    warnings.push(
        ValidationWarning::new(
            "INGEST_TS_UNPARSEABLE",
            format!("Unparseable timestamp for {field}"),
        )
        .with_details(format!("raw={trimmed}")),
    );

    NormalizedTimestamp {
        value: None,
        raw: Some(trimmed.to_string()),
    }
}
