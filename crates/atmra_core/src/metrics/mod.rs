use time::PrimitiveDateTime;

use crate::domain::Repair;

/// Whole hours from `a` to `b`, truncated toward zero (90 minutes is 1 hour).
pub fn whole_hours_between(a: PrimitiveDateTime, b: PrimitiveDateTime) -> i64 {
    (b - a).whole_hours()
}

/// Whole days from `a` to `b`, truncated toward zero (47 hours is 1 day).
pub fn whole_days_between(a: PrimitiveDateTime, b: PrimitiveDateTime) -> i64 {
    (b - a).whole_days()
}

/// Repair duration in whole hours; `None` while the repair is still open.
pub fn repair_duration_hours(repair: &Repair) -> Option<i64> {
    repair
        .end_time
        .map(|end| whole_hours_between(repair.start_time, end))
}
