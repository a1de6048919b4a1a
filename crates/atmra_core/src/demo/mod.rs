use crate::error::AppError;
use crate::ingest::repair_csv::{import_repair_csv, RepairImportSummary};
use crate::normalize::timestamps::format_local;
use rusqlite::Connection;
use time::macros::datetime;
use time::Duration;

pub const DEMO_ROWS: usize = 36;

pub fn demo_csv() -> String {
    // Sanitized, deterministic dataset large enough to make every report non-trivial:
    // reasons with different frequencies, machines that fail repeatedly for the same reason,
    // and open repairs without an end time.
    let mut out = String::new();
    out.push_str("CaseId,AtmId,Reason,StartTime,EndTime,SerialNumber,BankName,Channel\n");

    let atms = ["7001", "7002", "7003", "7004"];
    let reasons = [
        "Замятие купюр",
        "Замятие купюр",
        "Ошибка картридера",
        "Замятие купюр",
        "Нет связи",
        "Ошибка картридера",
    ];
    let banks = ["Северный банк", "Южный банк"];
    let channels = ["branch", "offsite"];
    let base = datetime!(2024-01-01 08:00:00);

    for i in 1..=DEMO_ROWS {
        let atm = atms[(i - 1) % atms.len()];
        let reason = reasons[(i - 1) % reasons.len()];
        let bank = banks[(i - 1) % banks.len()];
        let channel = channels[((i - 1) / 2) % channels.len()];

        // Starts are 36 hours apart, so each machine sees its next repair about 6 days later.
        let start = base + Duration::hours(36 * (i as i64 - 1) + (i % 6) as i64);

        // Every seventh repair is still open; the others take 1..=40 hours.
        let end = if i % 7 == 0 {
            String::new()
        } else {
            let minutes = 60 * (1 + (i * 11) % 40) as i64 + ((i * 7) % 60) as i64;
            format_local(start + Duration::minutes(minutes))
        };
        let start = format_local(start);

        out.push_str(&format!(
            "{},{atm},{reason},{start},{end},SN-{atm}-{:02},{bank},{channel}\n",
            1000 + i,
            (i - 1) % 3
        ));
    }
    out
}

pub fn seed_demo_dataset(conn: &mut Connection) -> Result<RepairImportSummary, AppError> {
    import_repair_csv(conn, &demo_csv())
}
