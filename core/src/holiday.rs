use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Holiday lookup used when colouring calendar rows.
pub trait HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

impl<F> HolidayCalendar for F
where
    F: Fn(NaiveDate) -> bool,
{
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

/// Japanese national holidays computed from the statutory rules, plus any
/// extra company-specific dates.
///
/// Equinox days use the usual astronomical approximation, which only holds
/// for 1980..=2099; outside that span no equinox holiday is reported.
#[derive(Debug, Clone, Default)]
pub struct JapaneseHolidays {
    extra: BTreeSet<NaiveDate>,
}

impl JapaneseHolidays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        Self {
            extra: dates.into_iter().collect(),
        }
    }

    pub fn name(&self, date: NaiveDate) -> Option<&'static str> {
        if let Some(name) = national_holiday(date) {
            return Some(name);
        }
        if is_substitute_holiday(date) {
            return Some("振替休日");
        }
        if is_citizens_holiday(date) {
            return Some("国民の休日");
        }
        if self.extra.contains(&date) {
            return Some("休日");
        }
        None
    }
}

impl HolidayCalendar for JapaneseHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.name(date).is_some()
    }
}

fn nth_monday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, n)
}

fn equinox_day(year: i32, base: f64) -> Option<u32> {
    if !(1980..=2099).contains(&year) {
        return None;
    }
    let y = (year - 1980) as f64;
    Some((base + 0.242194 * y - (y / 4.0).floor()).floor() as u32)
}

/// Holidays fixed by the national holiday act, before substitute and
/// sandwiched-day rules apply.
fn national_holiday(date: NaiveDate) -> Option<&'static str> {
    let year = date.year();
    let md = (date.month(), date.day());

    let is = |other: Option<NaiveDate>| other == Some(date);

    match md {
        (1, 1) => return Some("元日"),
        (2, 11) => return Some("建国記念の日"),
        (2, 23) if year >= 2020 => return Some("天皇誕生日"),
        (12, 23) if (1989..=2018).contains(&year) => return Some("天皇誕生日"),
        (4, 29) => return Some("昭和の日"),
        (5, 3) => return Some("憲法記念日"),
        (5, 4) if year >= 2007 => return Some("みどりの日"),
        (5, 5) => return Some("こどもの日"),
        (11, 3) => return Some("文化の日"),
        (11, 23) => return Some("勤労感謝の日"),
        _ => {}
    }

    if is(nth_monday(year, 1, 2)) && year >= 2000 {
        return Some("成人の日");
    }

    let marine = match year {
        2020 => NaiveDate::from_ymd_opt(2020, 7, 23),
        2021 => NaiveDate::from_ymd_opt(2021, 7, 22),
        y if y >= 2003 => nth_monday(y, 7, 3),
        _ => None,
    };
    if is(marine) {
        return Some("海の日");
    }

    let mountain = match year {
        2020 => NaiveDate::from_ymd_opt(2020, 8, 10),
        2021 => NaiveDate::from_ymd_opt(2021, 8, 8),
        y if y >= 2016 => NaiveDate::from_ymd_opt(y, 8, 11),
        _ => None,
    };
    if is(mountain) {
        return Some("山の日");
    }

    if year >= 2003 && is(nth_monday(year, 9, 3)) {
        return Some("敬老の日");
    }

    let sports = match year {
        2020 => NaiveDate::from_ymd_opt(2020, 7, 24),
        2021 => NaiveDate::from_ymd_opt(2021, 7, 23),
        y if y >= 2000 => nth_monday(y, 10, 2),
        _ => None,
    };
    if is(sports) {
        return Some(if year >= 2020 { "スポーツの日" } else { "体育の日" });
    }

    if date.month() == 3 && equinox_day(year, 20.8431) == Some(date.day()) {
        return Some("春分の日");
    }
    if date.month() == 9 && equinox_day(year, 23.2488) == Some(date.day()) {
        return Some("秋分の日");
    }

    None
}

/// A day off owed when a holiday falls on Sunday: the first following day
/// that is not itself a holiday.
fn is_substitute_holiday(date: NaiveDate) -> bool {
    if national_holiday(date).is_some() {
        return false;
    }
    let mut prev = date - Duration::days(1);
    while national_holiday(prev).is_some() {
        if prev.weekday() == Weekday::Sun {
            return true;
        }
        prev = prev - Duration::days(1);
    }
    false
}

/// An ordinary weekday sandwiched between two national holidays.
fn is_citizens_holiday(date: NaiveDate) -> bool {
    date.weekday() != Weekday::Sun
        && national_holiday(date).is_none()
        && national_holiday(date - Duration::days(1)).is_some()
        && national_holiday(date + Duration::days(1)).is_some()
}
