use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::query::DateWindow;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    #[default]
    Month,
    Week,
}

impl RangeMode {
    /// Unit shown on the paging buttons (前の月 / 次の週).
    pub fn unit_label(&self) -> &'static str {
        match self {
            RangeMode::Month => "月",
            RangeMode::Week => "週",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl DateRange {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.window().contains(date)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Resolves the viewing window `offset` periods away from the one containing
/// `today`. Weeks run Sunday to Saturday.
pub fn date_range(mode: RangeMode, offset: i64, today: NaiveDate) -> Result<DateRange, ValidationError> {
    match mode {
        RangeMode::Month => {
            let index = today.year() as i64 * 12 + today.month0() as i64 + offset;
            let year = i32::try_from(index.div_euclid(12)).map_err(|_| ValidationError::DateOutOfRange)?;
            let month = index.rem_euclid(12) as u32 + 1;
            let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(ValidationError::DateOutOfRange)?;
            let end = last_day_of_month(year, month).ok_or(ValidationError::DateOutOfRange)?;
            Ok(DateRange {
                start,
                end,
                label: format!("{}年{}月", start.year(), start.month()),
            })
        }
        RangeMode::Week => {
            let shift = offset
                .checked_mul(7)
                .and_then(Duration::try_days)
                .ok_or(ValidationError::DateOutOfRange)?;
            let current = today
                .checked_add_signed(shift)
                .ok_or(ValidationError::DateOutOfRange)?;
            let back = Duration::days(current.weekday().num_days_from_sunday() as i64);
            let start = current
                .checked_sub_signed(back)
                .ok_or(ValidationError::DateOutOfRange)?;
            let end = start
                .checked_add_signed(Duration::days(6))
                .ok_or(ValidationError::DateOutOfRange)?;
            Ok(DateRange {
                start,
                end,
                label: format!(
                    "{}月{}日〜{}月{}日",
                    start.month(),
                    start.day(),
                    end.month(),
                    end.day()
                ),
            })
        }
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Mode and paging offset of a dashboard view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeSelector {
    mode: RangeMode,
    offset: i64,
}

impl RangeSelector {
    pub fn new(mode: RangeMode) -> Self {
        Self { mode, offset: 0 }
    }

    pub fn with_offset(mode: RangeMode, offset: i64) -> Self {
        Self { mode, offset }
    }

    pub fn mode(&self) -> RangeMode {
        self.mode
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Switching mode always starts over at the current period.
    pub fn set_mode(&mut self, mode: RangeMode) {
        self.mode = mode;
        self.offset = 0;
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            RangeMode::Month => RangeMode::Week,
            RangeMode::Week => RangeMode::Month,
        };
        self.set_mode(next);
    }

    pub fn previous(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn next(&mut self) {
        self.offset = self.offset.saturating_add(1);
    }

    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, ValidationError> {
        date_range(self.mode, self.offset, today)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses the date of a report as typed on the command line: `today`,
/// `yesterday`, `-Nd`, a weekday name (the most recent such day, today
/// included) or `YYYY-MM-DD`.
pub fn parse_report_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let input = input.trim();
    let invalid = || ValidationError::InvalidValue {
        field: "report_date",
        value: input.to_string(),
    };

    match input.to_lowercase().as_str() {
        "today" | "tod" | "今日" => return Ok(today),
        "yesterday" | "yes" | "昨日" => return today.pred_opt().ok_or_else(invalid),
        _ => {}
    }

    if let Some(rest) = input.strip_prefix('-') {
        if let Some(num) = rest.strip_suffix('d') {
            let days: i64 = num.parse().map_err(|_| invalid())?;
            return Duration::try_days(days)
                .and_then(|d| today.checked_sub_signed(d))
                .ok_or_else(invalid);
        }
    }

    if let Ok(target) = parse_weekday_str(input) {
        let back = (today.weekday().num_days_from_sunday() as i64
            - target.num_days_from_sunday() as i64)
            .rem_euclid(7);
        return Ok(today - Duration::days(back));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}

fn parse_weekday_str(s: &str) -> Result<Weekday, ()> {
    match s.to_lowercase().as_str() {
        "sun" | "sunday" | "日" => Ok(Weekday::Sun),
        "mon" | "monday" | "月" => Ok(Weekday::Mon),
        "tue" | "tuesday" | "火" => Ok(Weekday::Tue),
        "wed" | "wednesday" | "水" => Ok(Weekday::Wed),
        "thu" | "thursday" | "木" => Ok(Weekday::Thu),
        "fri" | "friday" | "金" => Ok(Weekday::Fri),
        "sat" | "saturday" | "土" => Ok(Weekday::Sat),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_previous_month() {
        let range = date_range(RangeMode::Month, -1, d("2024-06-15")).unwrap();
        assert_eq!(range.start, d("2024-05-01"));
        assert_eq!(range.end, d("2024-05-31"));
        assert_eq!(range.label, "2024年5月");
    }

    #[test]
    fn test_month_across_year_boundaries() {
        let range = date_range(RangeMode::Month, -6, d("2024-03-31")).unwrap();
        assert_eq!((range.start, range.end), (d("2023-09-01"), d("2023-09-30")));

        let range = date_range(RangeMode::Month, 11, d("2024-02-29")).unwrap();
        assert_eq!((range.start, range.end), (d("2025-01-01"), d("2025-01-31")));

        let feb = date_range(RangeMode::Month, 0, d("2024-02-10")).unwrap();
        assert_eq!(feb.end, d("2024-02-29"));
        assert_eq!(feb.days(), 29);
    }

    #[test]
    fn test_current_month_contains_today() {
        let mut day = d("2023-12-25");
        for _ in 0..450 {
            let range = date_range(RangeMode::Month, 0, day).unwrap();
            assert!(range.contains(day), "{} not in {:?}", day, range);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_months_are_contiguous() {
        let today = d("2024-06-15");
        for offset in -30..30 {
            let a = date_range(RangeMode::Month, offset, today).unwrap();
            let b = date_range(RangeMode::Month, offset + 1, today).unwrap();
            assert_eq!(a.end.succ_opt().unwrap(), b.start, "offset {}", offset);
        }
    }

    #[test]
    fn test_week_is_sunday_to_saturday() {
        let today = d("2024-06-15"); // Saturday
        for offset in -60..60 {
            let range = date_range(RangeMode::Week, offset, today).unwrap();
            assert_eq!(range.start.weekday(), Weekday::Sun);
            assert_eq!(range.end.weekday(), Weekday::Sat);
            assert_eq!(range.days(), 7);
        }
        let current = date_range(RangeMode::Week, 0, today).unwrap();
        assert_eq!(current.start, d("2024-06-09"));
        assert_eq!(current.label, "6月9日〜6月15日");

        let sunday = date_range(RangeMode::Week, 0, d("2024-06-16")).unwrap();
        assert_eq!(sunday.start, d("2024-06-16"));

        let spanning = date_range(RangeMode::Week, -2, today).unwrap();
        assert_eq!(spanning.label, "5月26日〜6月1日");
    }

    #[test]
    fn test_deterministic() {
        let today = d("2024-06-15");
        assert_eq!(
            date_range(RangeMode::Week, 3, today),
            date_range(RangeMode::Week, 3, today)
        );
    }

    #[test]
    fn test_out_of_range_offset() {
        let today = d("2024-06-15");
        assert_eq!(
            date_range(RangeMode::Month, i64::MAX / 2, today),
            Err(ValidationError::DateOutOfRange)
        );
        assert_eq!(
            date_range(RangeMode::Week, i64::MAX, today),
            Err(ValidationError::DateOutOfRange)
        );
    }

    #[test]
    fn test_selector_mode_change_resets_offset() {
        let mut sel = RangeSelector::default();
        assert_eq!(sel.mode(), RangeMode::Month);
        sel.previous();
        sel.previous();
        assert_eq!(sel.offset(), -2);
        sel.set_mode(RangeMode::Week);
        assert_eq!(sel.offset(), 0);
        sel.next();
        sel.toggle_mode();
        assert_eq!((sel.mode(), sel.offset()), (RangeMode::Month, 0));
        sel.next();
        sel.set_mode(RangeMode::Month);
        assert_eq!(sel.offset(), 0);
    }

    #[test]
    fn test_selector_with_extreme_offset() {
        let today = d("2024-06-15");
        let mut sel = RangeSelector::with_offset(RangeMode::Week, i64::MIN);
        assert_eq!(sel.resolve(today), Err(ValidationError::DateOutOfRange));
        sel.previous();
        assert_eq!(sel.offset(), i64::MIN);

        let sel = RangeSelector::with_offset(RangeMode::Month, -1);
        assert_eq!(sel.resolve(today).unwrap().label, "2024年5月");
    }

    #[test]
    fn test_parse_report_date() {
        let today = d("2024-06-13"); // Thursday
        assert_eq!(parse_report_date("today", today).unwrap(), today);
        assert_eq!(parse_report_date("yesterday", today).unwrap(), d("2024-06-12"));
        assert_eq!(parse_report_date("-3d", today).unwrap(), d("2024-06-10"));
        assert_eq!(parse_report_date("mon", today).unwrap(), d("2024-06-10"));
        assert_eq!(parse_report_date("thu", today).unwrap(), today);
        assert_eq!(parse_report_date("fri", today).unwrap(), d("2024-06-07"));
        assert_eq!(parse_report_date("2024-05-31", today).unwrap(), d("2024-05-31"));
        assert!(parse_report_date("-xd", today).is_err());
        assert!(parse_report_date("2024/05/31", today).is_err());
    }
}
