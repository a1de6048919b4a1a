use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

time::serde::format_description!(
    local_ts,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);

/// One ATM repair event.
///
/// Notes:
/// - Timestamps are local wall-clock times without an offset, the way the bank exports them.
/// - `end_time` is `None` while the repair is still open.
/// - Identity is `case_id`; two values with the same `case_id` compare equal even when other
///   fields differ (an updated record is the same record).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repair {
    pub case_id: i64,
    pub atm_id: String,
    pub reason: String,
    #[serde(with = "local_ts")]
    pub start_time: PrimitiveDateTime,
    #[serde(with = "local_ts::option", default)]
    pub end_time: Option<PrimitiveDateTime>,
    pub serial_number: String,
    pub bank_name: String,
    pub channel: String,
}

impl PartialEq for Repair {
    fn eq(&self, other: &Self) -> bool {
        self.case_id == other.case_id
    }
}

impl Eq for Repair {}

impl Repair {
    /// Field-by-field comparison, used where "same record" is not enough (update detection).
    pub fn same_content(&self, other: &Repair) -> bool {
        self.case_id == other.case_id
            && self.atm_id == other.atm_id
            && self.reason == other.reason
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.serial_number == other.serial_number
            && self.bank_name == other.bank_name
            && self.channel == other.channel
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
