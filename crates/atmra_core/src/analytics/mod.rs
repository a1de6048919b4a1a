//! Report builders. They work on an in-memory snapshot only; loading it is the caller's job.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::{AnalyticsConfig, AnchorAdvance};
use crate::domain::Repair;
use crate::error::AppError;
use crate::metrics::{repair_duration_hours, whole_days_between};

/// One row of a report: a section title, or a record that belongs to the nearest title above it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportItem<'a> {
    Group { title: String },
    Repair(&'a Repair),
}

impl<'a> ReportItem<'a> {
    fn group(title: String) -> Self {
        ReportItem::Group { title }
    }

    pub fn as_repair(&self) -> Option<&'a Repair> {
        match self {
            ReportItem::Repair(r) => Some(r),
            ReportItem::Group { .. } => None,
        }
    }

    pub fn as_title(&self) -> Option<&str> {
        match self {
            ReportItem::Group { title } => Some(title),
            ReportItem::Repair(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    AllData,
    MostCommonCauses,
    LongestRepairTimes,
    CauseFailureRecurred,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::AllData,
        ReportKind::MostCommonCauses,
        ReportKind::LongestRepairTimes,
        ReportKind::CauseFailureRecurred,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::AllData => "allData",
            ReportKind::MostCommonCauses => "mostCommonCauses",
            ReportKind::LongestRepairTimes => "longestRepairTimes",
            ReportKind::CauseFailureRecurred => "causeFailureRecurred",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                AppError::new("VALIDATION_UNKNOWN_REPORT_TYPE", format!("Не известный тип: {s}"))
                    .with_details(format!(
                        "expected one of: {}",
                        ReportKind::ALL.map(ReportKind::as_str).join(", ")
                    ))
            })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report<'a> {
    pub kind: ReportKind,
    pub items: Vec<ReportItem<'a>>,
}

impl<'a> Report<'a> {
    pub fn repairs(&self) -> impl Iterator<Item = &'a Repair> + '_ {
        self.items.iter().filter_map(ReportItem::as_repair)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().filter_map(ReportItem::as_title)
    }
}

pub fn cause_title(reason: &str, count: usize) -> String {
    format!("{reason} (Всего: {count})")
}

pub fn repair_time_title(reason: &str, hours: i64) -> String {
    format!("{reason}. Время ремонта {hours} часов")
}

pub fn recurrence_title(atm_id: &str, reason: &str) -> String {
    format!("АТМ: {atm_id}. {reason}")
}

/// Every record, in the order given, without section titles.
pub fn all_data(repairs: &[Repair]) -> Vec<ReportItem<'_>> {
    repairs.iter().map(ReportItem::Repair).collect()
}

/// The `limit` most frequent reasons, each followed by all of its records in input order.
///
/// Ranking is by group size descending; equal sizes fall back to the reason text ascending.
pub fn most_common_causes(repairs: &[Repair], limit: usize) -> Vec<ReportItem<'_>> {
    let mut by_reason: BTreeMap<&str, Vec<&Repair>> = BTreeMap::new();
    for repair in repairs {
        by_reason.entry(repair.reason.as_str()).or_default().push(repair);
    }
    let group_count = by_reason.len();

    // BTreeMap yields reasons in ascending order; the stable sort keeps that as the tie-break.
    let mut groups = by_reason.into_iter().collect::<Vec<_>>();
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    groups.truncate(limit);

    let mut items = Vec::new();
    for (reason, members) in groups {
        items.push(ReportItem::group(cause_title(reason, members.len())));
        items.extend(members.into_iter().map(ReportItem::Repair));
    }

    tracing::debug!(
        records = repairs.len(),
        groups = group_count,
        limit,
        "built most common causes report"
    );
    items
}

/// The `limit` longest finished repairs, each preceded by a title with its duration in hours.
///
/// Open repairs (no `end_time`) are not ranked. Equal durations keep input order.
pub fn longest_repair_times(repairs: &[Repair], limit: usize) -> Vec<ReportItem<'_>> {
    let mut ranked = repairs
        .iter()
        .filter_map(|r| repair_duration_hours(r).map(|hours| (hours, r)))
        .collect::<Vec<_>>();
    let finished = ranked.len();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.truncate(limit);

    let mut items = Vec::with_capacity(ranked.len() * 2);
    for (hours, repair) in ranked {
        items.push(ReportItem::group(repair_time_title(&repair.reason, hours)));
        items.push(ReportItem::Repair(repair));
    }

    tracing::debug!(
        records = repairs.len(),
        finished,
        limit,
        "built longest repair times report"
    );
    items
}

/// Scan one machine/reason group, already sorted by start time, for recurrences.
///
/// A record recurs when it starts within `days` whole days of the anchor. On a recurrence the
/// anchor (unless it is already the last chain entry) and the record join the chain and the
/// record becomes the new anchor, so chains extend transitively. On a miss the anchor only
/// moves under `AnchorAdvance::Always`.
fn scan_chain<'a>(sorted: &[&'a Repair], days: u32, advance: AnchorAdvance) -> Vec<&'a Repair> {
    let mut chain: Vec<&'a Repair> = Vec::new();
    let Some((&first, rest)) = sorted.split_first() else {
        return chain;
    };

    let threshold = i64::from(days);
    let mut anchor = first;
    let mut last_appended: Option<i64> = None;

    for &current in rest {
        let gap_days = whole_days_between(anchor.start_time, current.start_time);
        if gap_days <= threshold {
            if last_appended != Some(anchor.case_id) {
                chain.push(anchor);
            }
            chain.push(current);
            last_appended = Some(current.case_id);
            anchor = current;
        } else if advance == AnchorAdvance::Always {
            anchor = current;
        }
    }

    chain
}

/// Repairs of the same cause on the same machine that started within `days` days of each other.
///
/// One section per `(atm_id, reason)` pair with a qualifying run, sections ordered by that pair.
pub fn recurring_failures(
    repairs: &[Repair],
    days: u32,
    advance: AnchorAdvance,
) -> Vec<ReportItem<'_>> {
    let mut by_machine_and_reason: BTreeMap<(&str, &str), Vec<&Repair>> = BTreeMap::new();
    for repair in repairs {
        by_machine_and_reason
            .entry((repair.atm_id.as_str(), repair.reason.as_str()))
            .or_default()
            .push(repair);
    }

    let mut items = Vec::new();
    let mut sections = 0usize;
    for ((atm_id, reason), mut group) in by_machine_and_reason {
        if group.len() < 2 {
            continue;
        }
        group.sort_by(|a, b| (a.start_time, a.case_id).cmp(&(b.start_time, b.case_id)));

        let chain = scan_chain(&group, days, advance);
        if chain.is_empty() {
            continue;
        }
        sections += 1;
        items.push(ReportItem::group(recurrence_title(atm_id, reason)));
        items.extend(chain.into_iter().map(ReportItem::Repair));
    }

    tracing::debug!(
        records = repairs.len(),
        days,
        ?advance,
        sections,
        "built recurring failures report"
    );
    items
}

/// Runs the reports with one fixed set of thresholds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn most_common_causes<'a>(&self, repairs: &'a [Repair]) -> Vec<ReportItem<'a>> {
        most_common_causes(repairs, self.config.count_top_most_common_causes)
    }

    pub fn longest_repair_times<'a>(&self, repairs: &'a [Repair]) -> Vec<ReportItem<'a>> {
        longest_repair_times(repairs, self.config.count_top_longest_repair_times)
    }

    pub fn recurring_failures<'a>(&self, repairs: &'a [Repair]) -> Vec<ReportItem<'a>> {
        recurring_failures(
            repairs,
            self.config.count_cause_failure_recurred,
            self.config.anchor_advance,
        )
    }

    pub fn run<'a>(&self, kind: ReportKind, repairs: &'a [Repair]) -> Report<'a> {
        let items = match kind {
            ReportKind::AllData => all_data(repairs),
            ReportKind::MostCommonCauses => self.most_common_causes(repairs),
            ReportKind::LongestRepairTimes => self.longest_repair_times(repairs),
            ReportKind::CauseFailureRecurred => self.recurring_failures(repairs),
        };
        Report { kind, items }
    }

    /// Human-readable heading for a report, reflecting the configured thresholds.
    pub fn report_title(&self, kind: ReportKind) -> String {
        match kind {
            ReportKind::AllData => "Все загруженные данные".to_string(),
            ReportKind::MostCommonCauses => format!(
                "{} наиболее часто встречающиеся причины неисправности",
                self.config.count_top_most_common_causes
            ),
            ReportKind::LongestRepairTimes => format!(
                "{} наиболее долгих ремонта",
                self.config.count_top_longest_repair_times
            ),
            ReportKind::CauseFailureRecurred => format!(
                "Причина поломки повторилась в течение {} дней",
                self.config.count_cause_failure_recurred
            ),
        }
    }
}
