/// Stress tests for large repair histories
///
/// Verifies that import and every report stay fast on realistic sizes
/// (10,000 repairs is several years of a regional ATM fleet).

#[cfg(test)]
mod stress_tests {
    use std::time::{Duration as StdDuration, Instant};

    use atmra_core::analytics::{AnalyticsEngine, ReportKind};
    use atmra_core::db;
    use atmra_core::domain::Repair;
    use atmra_core::normalize::timestamps::format_local;
    use atmra_core::repo::{list_repairs, upsert_repairs};
    use time::macros::datetime;
    use time::Duration;

    /// Generate synthetic repair at index i
    fn generate_synthetic_repair(i: usize) -> Repair {
        let reasons = ["Замятие купюр", "Нет связи", "Ошибка картридера", "Сбой ПО", "Нет питания"];
        let start = datetime!(2022-01-01 00:00:00) + Duration::hours((i * 3) as i64);
        Repair {
            case_id: i as i64 + 1,
            atm_id: format!("ATM-{:03}", i % 40),
            reason: reasons[(i / 7) % reasons.len()].to_string(),
            start_time: start,
            end_time: (i % 11 != 0).then(|| start + Duration::minutes(((i * 37) % 4000) as i64)),
            serial_number: format!("SN-{:03}", i % 40),
            bank_name: format!("Bank {}", i % 4),
            channel: if i % 2 == 0 { "branch" } else { "offsite" }.to_string(),
        }
    }

    fn dataset(n: usize) -> Vec<Repair> {
        (0..n).map(generate_synthetic_repair).collect()
    }

    #[test]
    fn stress_test_reports_10k_repairs() {
        let repairs = dataset(10_000);
        let engine = AnalyticsEngine::default();

        for kind in ReportKind::ALL {
            let start = Instant::now();
            let report = engine.run(kind, &repairs);
            let elapsed = start.elapsed();

            assert!(!report.items.is_empty(), "{kind} produced nothing");
            assert!(
                elapsed < StdDuration::from_secs(5),
                "{kind} took {elapsed:?} on 10k repairs"
            );
        }
    }

    #[test]
    fn stress_test_import_and_reload_10k_repairs() {
        let repairs = dataset(10_000);
        let mut conn = db::open_in_memory().expect("open");
        db::migrate(&mut conn).expect("migrate");

        let start = Instant::now();
        let summary = upsert_repairs(&mut conn, &repairs).expect("upsert");
        let loaded = list_repairs(&conn).expect("list");
        let elapsed = start.elapsed();

        assert_eq!(summary.inserted, 10_000);
        assert_eq!(loaded.len(), 10_000);
        assert!(loaded.iter().zip(&repairs).all(|(a, b)| a.same_content(b)));
        assert!(elapsed < StdDuration::from_secs(30), "took {elapsed:?}");
    }

    #[test]
    fn stress_test_generated_timestamps_are_canonical() {
        let r = generate_synthetic_repair(9_999);
        assert_eq!(format_local(r.start_time), "2025-06-03T21:00:00");
    }
}
