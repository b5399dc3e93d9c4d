use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::holiday::HolidayCalendar;
use crate::model::stats::{DailyTotal, PeriodSummary};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayColor {
    /// Sundays and holidays.
    Highlight,
    Saturday,
    Default,
}

impl DayColor {
    pub fn resolve(date: NaiveDate, calendar: &dyn HolidayCalendar) -> Self {
        if date.weekday() == Weekday::Sun || calendar.is_holiday(date) {
            DayColor::Highlight
        } else if date.weekday() == Weekday::Sat {
            DayColor::Saturday
        } else {
            DayColor::Default
        }
    }

    pub fn hex(&self) -> Option<&'static str> {
        match self {
            DayColor::Highlight => Some("#d9534f"),
            DayColor::Saturday => Some("#5bc0de"),
            DayColor::Default => None,
        }
    }
}

/// One line of the per-day table.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    /// `MM/DD`
    pub label: String,
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: u32,
    pub weekday_label: &'static str,
    pub color: DayColor,
    pub work: String,
    pub overtime: String,
    pub total: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub regular: f64,
    pub overtime: f64,
    pub is_weekend: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryCard {
    pub title: &'static str,
    pub value: String,
}

const WEEKDAY_LABELS: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

pub fn format_hours(value: f64) -> String {
    format!("{:.1}", value)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[date.weekday().num_days_from_sunday() as usize]
}

pub fn daily_rows(totals: &BTreeMap<NaiveDate, DailyTotal>, calendar: &dyn HolidayCalendar) -> Vec<DailyRow> {
    totals
        .values()
        .map(|t| DailyRow {
            date: t.date,
            label: t.date.format("%m/%d").to_string(),
            weekday: t.date.weekday().num_days_from_sunday(),
            weekday_label: weekday_label(t.date),
            color: DayColor::resolve(t.date, calendar),
            work: format_hours(t.work_total),
            overtime: format_hours(t.overtime_total),
            total: format_hours(t.total()),
        })
        .collect()
}

pub fn chart_series(totals: &BTreeMap<NaiveDate, DailyTotal>) -> Vec<ChartPoint> {
    totals
        .values()
        .map(|t| ChartPoint {
            label: t.date.format("%m/%d").to_string(),
            regular: round1(t.work_total),
            overtime: round1(t.overtime_total),
            is_weekend: matches!(t.date.weekday(), Weekday::Sat | Weekday::Sun),
        })
        .collect()
}

pub fn summary_cards(summary: &PeriodSummary) -> Vec<SummaryCard> {
    vec![
        SummaryCard {
            title: "総労働時間",
            value: format!("{}h", format_hours(summary.total_hours())),
        },
        SummaryCard {
            title: "通常時間",
            value: format!("{}h", format_hours(summary.work_total)),
        },
        SummaryCard {
            title: "残業時間",
            value: format!("{}h", format_hours(summary.overtime_total)),
        },
        SummaryCard {
            title: "出勤日数",
            value: format!("{}日", summary.day_count),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holiday::JapaneseHolidays;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn totals(entries: &[(&str, f64, f64)]) -> BTreeMap<NaiveDate, DailyTotal> {
        entries
            .iter()
            .map(|(date, work, ot)| {
                let date = d(date);
                (
                    date,
                    DailyTotal {
                        date,
                        work_total: *work,
                        overtime_total: *ot,
                        report_count: 1,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_colors() {
        let cal = JapaneseHolidays::new();
        // Sunday, Saturday, Monday holiday, plain weekday.
        assert_eq!(DayColor::resolve(d("2024-06-02"), &cal), DayColor::Highlight);
        assert_eq!(DayColor::resolve(d("2024-06-01"), &cal), DayColor::Saturday);
        assert_eq!(DayColor::resolve(d("2024-07-15"), &cal), DayColor::Highlight);
        assert_eq!(DayColor::resolve(d("2024-06-03"), &cal), DayColor::Default);
        assert_eq!(DayColor::Highlight.hex(), Some("#d9534f"));
    }

    #[test]
    fn test_saturday_holiday_is_highlighted() {
        let cal = |date: NaiveDate| date == d("2024-06-01");
        assert_eq!(DayColor::resolve(d("2024-06-01"), &cal), DayColor::Highlight);
    }

    #[test]
    fn test_rows_are_date_ascending_and_formatted() {
        let cal = JapaneseHolidays::new();
        let rows = daily_rows(&totals(&[("2024-06-02", 7.5, 0.0), ("2024-06-01", 8.0, 2.0)]), &cal);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "06/01");
        assert_eq!(rows[0].weekday, 6);
        assert_eq!(rows[0].weekday_label, "土");
        assert_eq!(rows[0].total, "10.0");
        assert_eq!(rows[1].label, "06/02");
        assert_eq!(rows[1].weekday, 0);
        assert_eq!(rows[1].work, "7.5");
    }

    #[test]
    fn test_chart_series_rounding() {
        let series = chart_series(&totals(&[("2024-06-03", 7.25, 0.04), ("2024-06-08", 1.0, 0.0)]));
        assert_eq!(series[0].regular, 7.3);
        assert_eq!(series[0].overtime, 0.0);
        assert!(!series[0].is_weekend);
        assert!(series[1].is_weekend);
    }

    #[test]
    fn test_summary_cards() {
        let summary = PeriodSummary {
            work_total: 15.5,
            overtime_total: 2.0,
            report_count: 3,
            day_count: 2,
        };
        let cards = summary_cards(&summary);
        assert_eq!(cards[0].value, "17.5h");
        assert_eq!(cards[3].value, "2日");
    }
}
