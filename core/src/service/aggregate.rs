use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::model::report::Report;
use crate::model::stats::{DailyTotal, PeriodSummary, SubjectTotal};

/// Floating-point addition is not associative, so each group's addends are
/// summed in total order. That keeps totals bit-identical however the rows
/// arrived.
fn canonical_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

#[derive(Default)]
struct Bucket {
    work: Vec<f64>,
    overtime: Vec<f64>,
}

impl Bucket {
    fn push(&mut self, report: &Report) {
        self.work.push(report.work());
        self.overtime.push(report.overtime());
    }

    fn count(&self) -> usize {
        self.work.len()
    }
}

/// Per-day totals keyed and ordered by calendar date.
pub fn aggregate_by_date<'a, I>(reports: I) -> BTreeMap<NaiveDate, DailyTotal>
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for report in reports {
        buckets.entry(report.report_date).or_default().push(report);
    }

    buckets
        .into_iter()
        .map(|(date, bucket)| {
            let report_count = bucket.count();
            let total = DailyTotal {
                date,
                work_total: canonical_sum(bucket.work),
                overtime_total: canonical_sum(bucket.overtime),
                report_count,
            };
            (date, total)
        })
        .collect()
}

/// Per-person totals ordered by subject id. The name is the first non-empty
/// embedded author name seen in id order, so it does not depend on input
/// order either.
pub fn aggregate_by_subject<'a, I>(reports: I) -> Vec<SubjectTotal>
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut buckets: BTreeMap<&str, (Bucket, BTreeMap<i64, &str>)> = BTreeMap::new();
    for report in reports {
        let entry = buckets.entry(report.user_id.as_str()).or_default();
        entry.0.push(report);
        if let Some(name) = report.author_name().filter(|n| !n.is_empty()) {
            entry.1.insert(report.id, name);
        }
    }

    buckets
        .into_iter()
        .map(|(subject_id, (bucket, names))| {
            let report_count = bucket.count();
            SubjectTotal {
                subject_id: subject_id.to_string(),
                name: names.values().next().map(|n| n.to_string()),
                work_total: canonical_sum(bucket.work),
                overtime_total: canonical_sum(bucket.overtime),
                report_count,
            }
        })
        .collect()
}

pub fn summarize<'a, I>(reports: I) -> PeriodSummary
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut work = Vec::new();
    let mut overtime = Vec::new();
    let mut days = BTreeSet::new();
    for report in reports {
        work.push(report.work());
        overtime.push(report.overtime());
        days.insert(report.report_date);
    }
    PeriodSummary {
        report_count: work.len(),
        day_count: days.len(),
        work_total: canonical_sum(work),
        overtime_total: canonical_sum(overtime),
    }
}
