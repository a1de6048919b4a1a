/// Unicode handling in repair data
///
/// Cyrillic reasons and bank names must survive import, grouping and rendering unchanged.

#[cfg(test)]
mod unicode_tests {
    use atmra_core::analytics::{AnalyticsEngine, ReportKind};
    use atmra_core::db;
    use atmra_core::ingest::repair_csv::import_repair_csv;
    use atmra_core::report::render_markdown;
    use atmra_core::repo::{get_repair, list_repairs};

    const CSV: &str = "Номер,Банкомат,Причина,Начало,Конец,Серийный номер,Банк,Канал\n\
        1,АТМ-01,Замятие купюр,01.03.2024 09:00,01.03.2024 11:00,СН-1,Северный банк,отделение\n\
        2,АТМ-01,Замятие купюр,05.03.2024 09:00,05.03.2024 10:00,СН-1,Северный банк,отделение\n\
        3,АТМ-02,\"Ошибка картридера, код 7\",02.03.2024 09:00,,СН-2,Южный банк,офсайт\n";

    #[test]
    fn test_cyrillic_fields_round_trip_through_store() {
        let mut conn = db::open_in_memory().expect("open");
        db::migrate(&mut conn).expect("migrate");
        let summary = import_repair_csv(&mut conn, CSV).expect("import");
        assert_eq!(summary.inserted, 3);

        let r = get_repair(&conn, 3).expect("case 3");
        assert_eq!(r.reason, "Ошибка картридера, код 7");
        assert_eq!(r.bank_name, "Южный банк");
        assert_eq!(r.channel, "офсайт");
    }

    #[test]
    fn test_cyrillic_reasons_group_and_render() {
        let mut conn = db::open_in_memory().expect("open");
        db::migrate(&mut conn).expect("migrate");
        import_repair_csv(&mut conn, CSV).expect("import");
        let repairs = list_repairs(&conn).expect("list");

        let engine = AnalyticsEngine::default();
        let causes = engine.run(ReportKind::MostCommonCauses, &repairs);
        assert_eq!(
            causes.titles().collect::<Vec<_>>(),
            vec!["Замятие купюр (Всего: 2)", "Ошибка картридера, код 7 (Всего: 1)"]
        );

        let recurred = engine.run(ReportKind::CauseFailureRecurred, &repairs);
        assert_eq!(
            recurred.titles().collect::<Vec<_>>(),
            vec!["АТМ: АТМ-01. Замятие купюр"]
        );

        let md = render_markdown(&engine, &recurred, &repairs).expect("render");
        assert!(md.contains("| 1 | АТМ-01 | Замятие купюр | 01.03.2024 09.00 | 01.03.2024 11.00 | СН-1 | Северный банк | отделение |"));
    }
}
