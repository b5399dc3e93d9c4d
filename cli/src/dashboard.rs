use anyhow::Result;
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

use logicore_core::query::DateWindow;
use logicore_core::service::presentation::{ChartPoint, DayColor};
use logicore_core::time::{date_range, today};
use logicore_core::{DashboardState, DashboardUseCase, DashboardView, Identity, RangeMode, RangeSelector};

use crate::text::fit;
use crate::Context;

const BAR_COLUMNS: usize = 24;

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "日付")]
    date: String,
    #[tabled(rename = "曜日")]
    weekday: String,
    #[tabled(rename = "通常")]
    work: String,
    #[tabled(rename = "残業")]
    overtime: String,
    #[tabled(rename = "合計")]
    total: String,
    #[tabled(rename = "")]
    mark: String,
}

#[derive(Tabled)]
struct PersonRow {
    #[tabled(rename = "氏名")]
    name: String,
    #[tabled(rename = "通常")]
    work: String,
    #[tabled(rename = "残業")]
    overtime: String,
    #[tabled(rename = "日報数")]
    reports: usize,
}

pub fn window(mode: RangeMode, offset: i64) -> Result<DateWindow> {
    Ok(date_range(mode, offset, today())?.window())
}

pub async fn show(ctx: &Context, identity: Identity, selector: RangeSelector) -> Result<()> {
    let state = DashboardState { identity, selector };
    let usecase = DashboardUseCase::new(ctx.store.clone(), ctx.calendar.clone());
    if let Some(view) = usecase.load(&state, today()).await? {
        print_view(&view);
    }
    Ok(())
}

fn mark(color: DayColor) -> &'static str {
    match color {
        DayColor::Highlight => "休",
        DayColor::Saturday => "土",
        DayColor::Default => "",
    }
}

/// Two-tone bar: `█` for regular hours, `▒` for overtime.
fn bar(point: &ChartPoint, scale: f64) -> String {
    let regular = (point.regular * scale).round() as usize;
    let overtime = (point.overtime * scale).round() as usize;
    format!("{}{}", "█".repeat(regular), "▒".repeat(overtime))
}

fn print_view(view: &DashboardView) {
    println!(
        "\n\x1b[1;36m{}\x1b[0m ({} 〜 {}, {}日間)",
        view.range.label,
        view.range.start,
        view.range.end,
        view.range.days()
    );
    let cards: Vec<String> = view
        .cards
        .iter()
        .map(|c| format!("{}: {}", c.title, c.value))
        .collect();
    println!("{}", cards.join("  |  "));

    if view.rows.is_empty() {
        println!("この期間の日報はありません。");
        return;
    }

    let rows: Vec<DayRow> = view
        .rows
        .iter()
        .map(|r| DayRow {
            date: r.label.clone(),
            weekday: r.weekday_label.to_string(),
            work: r.work.clone(),
            overtime: r.overtime.clone(),
            total: r.total.clone(),
            mark: mark(r.color).to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{}", table);

    let peak = view
        .chart
        .iter()
        .map(|p| p.regular + p.overtime)
        .fold(0.0_f64, f64::max);
    if peak > 0.0 {
        let scale = BAR_COLUMNS as f64 / peak;
        println!();
        for point in &view.chart {
            println!("{} {}", point.label, bar(point, scale));
        }
        println!("█ 通常  ▒ 残業");
    }

    if view.subjects.len() > 1 {
        let people: Vec<PersonRow> = view
            .subjects
            .iter()
            .map(|s| PersonRow {
                name: fit(s.name.as_deref().unwrap_or(&s.subject_id), 16),
                work: format!("{:.1}", s.work_total),
                overtime: format!("{:.1}", s.overtime_total),
                reports: s.report_count,
            })
            .collect();
        let mut table = Table::new(people);
        table.with(Style::modern());
        println!("\n{}", table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_scales_both_parts() {
        let point = ChartPoint {
            label: "06/01".into(),
            regular: 8.0,
            overtime: 2.0,
            is_weekend: true,
        };
        assert_eq!(bar(&point, 0.5), "████▒");
    }

    #[test]
    fn test_mark_for_day_colors() {
        assert_eq!(mark(DayColor::Highlight), "休");
        assert_eq!(mark(DayColor::Default), "");
    }
}
