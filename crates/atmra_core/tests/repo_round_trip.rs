use atmra_core::analytics::{AnalyticsEngine, ReportKind};
use atmra_core::db;
use atmra_core::error::ErrorKind;
use atmra_core::ingest::repair_csv::import_repair_csv;
use atmra_core::repo::{count_repairs, delete_all_repairs, get_repair, list_repairs, update_repair};
use rusqlite::Connection;
use time::macros::datetime;

fn seeded() -> Connection {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");
    let csv_text = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/demo/repairs_sample.csv"
    ));
    import_repair_csv(&mut conn, csv_text).expect("ingest");
    conn
}

#[test]
fn list_is_ordered_by_case_id() {
    let conn = seeded();
    let ids = list_repairs(&conn)
        .unwrap()
        .into_iter()
        .map(|r| r.case_id)
        .collect::<Vec<_>>();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[test]
fn update_is_reflected_in_reports_without_duplication() {
    let conn = seeded();
    let engine = AnalyticsEngine::default();

    let mut repair = get_repair(&conn, 6).expect("case 6");
    repair.reason = "R1".to_string();
    repair.end_time = Some(datetime!(2024-01-10 08:00:00));
    let stored = update_repair(&conn, &repair).expect("update");
    assert!(stored.same_content(&repair));
    assert_eq!(count_repairs(&conn).unwrap(), 8);

    let repairs = list_repairs(&conn).unwrap();
    let report = engine.run(ReportKind::MostCommonCauses, &repairs);
    assert_eq!(report.titles().next(), Some("R1 (Всего: 5)"));
    assert_eq!(report.repairs().filter(|r| r.case_id == 6).count(), 1);

    // 2024-01-06 08:00 -> 2024-01-10 08:00 is 96 hours, the longest repair now.
    let report = engine.run(ReportKind::LongestRepairTimes, &repairs);
    assert_eq!(report.titles().next(), Some("R1. Время ремонта 96 часов"));
}

#[test]
fn update_of_unknown_case_is_not_found() {
    let conn = seeded();
    let mut repair = get_repair(&conn, 1).unwrap();
    repair.case_id = 404;

    let err = update_repair(&conn, &repair).expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.details.as_deref(), Some("case_id=404"));
    assert_eq!(count_repairs(&conn).unwrap(), 8);
}

#[test]
fn invalid_update_is_a_validation_failure() {
    let conn = seeded();
    let mut repair = get_repair(&conn, 1).unwrap();
    repair.atm_id = String::new();

    let err = update_repair(&conn, &repair).expect_err("invalid");
    assert_eq!(err.code, "VALIDATION_REPAIR_INVALID");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(get_repair(&conn, 1).unwrap().atm_id, "A1");
}

#[test]
fn get_unknown_case_is_not_found() {
    let conn = seeded();
    let err = get_repair(&conn, 999).expect_err("missing");
    assert_eq!(err.code, "DB_NOT_FOUND");
}

#[test]
fn delete_all_empties_the_store_and_reports() {
    let conn = seeded();
    assert_eq!(delete_all_repairs(&conn).unwrap(), 8);
    assert_eq!(count_repairs(&conn).unwrap(), 0);

    let repairs = list_repairs(&conn).unwrap();
    let engine = AnalyticsEngine::default();
    for kind in ReportKind::ALL {
        assert!(engine.run(kind, &repairs).items.is_empty());
    }
}

#[test]
fn store_without_schema_is_unavailable() {
    let conn = db::open_in_memory().expect("open");
    let err = list_repairs(&conn).expect_err("no table");
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert!(err.retryable);
}
