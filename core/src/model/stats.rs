use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub work_total: f64,
    pub overtime_total: f64,
    pub report_count: usize,
}

impl DailyTotal {
    pub fn total(&self) -> f64 {
        self.work_total + self.overtime_total
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubjectTotal {
    pub subject_id: String,
    pub name: Option<String>,
    pub work_total: f64,
    pub overtime_total: f64,
    pub report_count: usize,
}

impl SubjectTotal {
    pub fn total(&self) -> f64 {
        self.work_total + self.overtime_total
    }
}

/// Figures for the summary cards of a viewing window. `report_count` is what
/// the 出勤日数 card historically showed; `day_count` counts distinct dates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PeriodSummary {
    pub work_total: f64,
    pub overtime_total: f64,
    pub report_count: usize,
    pub day_count: usize,
}

impl PeriodSummary {
    pub fn total_hours(&self) -> f64 {
        self.work_total + self.overtime_total
    }
}
