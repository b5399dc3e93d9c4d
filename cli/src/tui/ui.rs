use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, BorderType, Borders, Padding, Paragraph, Row, Table},
    Frame,
};

use logicore_core::service::presentation::{ChartPoint, DailyRow};
use logicore_core::DashboardView;

use crate::text::pad;
use crate::tui::app::App;

struct Theme {
    primary: Color,
    muted: Color,
    text: Color,
    regular: Color,
    overtime: Color,
}

const THEME: Theme = Theme {
    primary: Color::Cyan,
    muted: Color::DarkGray,
    text: Color::White,
    regular: Color::Green,
    overtime: Color::Red,
};

const NAME_COLUMNS: usize = 12;

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Cards
            Constraint::Min(8),    // Content
            Constraint::Length(1), // Footer
        ])
        .split(size);

    draw_header(f, app, main_chunks[0]);

    match app.view.clone() {
        Some(view) => {
            draw_cards(f, &view, main_chunks[1]);

            let content = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(44), Constraint::Min(20)])
                .split(main_chunks[2]);
            draw_rows(f, app, &view.rows, content[0]);

            if view.subjects.len() > 1 {
                let right = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                    .split(content[1]);
                draw_chart(f, &view.chart, right[0]);
                draw_subjects(f, &view, right[1]);
            } else {
                draw_chart(f, &view.chart, content[1]);
            }
        }
        None => {
            let message = if app.is_loading() { "読み込み中..." } else { "データがありません" };
            f.render_widget(
                Paragraph::new(message).alignment(Alignment::Center),
                main_chunks[2],
            );
        }
    }

    draw_footer(f, app, main_chunks[3]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(1), Constraint::Length(40)])
        .split(area);

    let title = Paragraph::new(Span::styled(
        "LOGICORE ダッシュボード",
        Style::default().fg(THEME.primary).add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().padding(Padding::new(0, 0, 1, 0)));
    f.render_widget(title, chunks[0]);

    let label = app
        .view
        .as_ref()
        .map(|v| v.range.label.clone())
        .unwrap_or_default();
    let unit = app.state.selector.mode().unit_label();
    let nav = Line::from(vec![
        Span::styled(format!(" < 前の{} ", unit), Style::default().fg(THEME.muted)),
        Span::styled(label, Style::default().fg(THEME.text).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" 次の{} > ", unit), Style::default().fg(THEME.muted)),
    ]);
    let nav = Paragraph::new(nav)
        .alignment(Alignment::Right)
        .block(Block::default().padding(Padding::new(0, 0, 1, 0)));
    f.render_widget(nav, chunks[2]);

    let identity = &app.state.identity;
    let who = Paragraph::new(Span::styled(
        format!("{} ({})", identity.name, identity.role.label()),
        Style::default().fg(THEME.muted),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().padding(Padding::new(0, 0, 1, 0)));
    f.render_widget(who, chunks[1]);
}

fn draw_cards(f: &mut Frame, view: &DashboardView, area: Rect) {
    let constraints: Vec<Constraint> = view
        .cards
        .iter()
        .map(|_| Constraint::Ratio(1, view.cards.len().max(1) as u32))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for (card, chunk) in view.cards.iter().zip(chunks.iter()) {
        let widget = Paragraph::new(Span::styled(
            card.value.clone(),
            Style::default().fg(THEME.text).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(format!(" {} ", card.title))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(THEME.muted)),
        );
        f.render_widget(widget, *chunk);
    }
}

fn row_style(row: &DailyRow) -> Style {
    match row.color.hex().and_then(|hex| hex.parse::<Color>().ok()) {
        Some(color) => Style::default().fg(color),
        None => Style::default(),
    }
}

fn draw_rows(f: &mut Frame, app: &mut App, rows: &[DailyRow], area: Rect) {
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                r.label.clone(),
                r.weekday_label.to_string(),
                r.work.clone(),
                r.overtime.clone(),
                r.total.clone(),
            ])
            .style(row_style(r))
        })
        .collect();

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(6), // Date
            Constraint::Length(4), // Weekday
            Constraint::Length(7), // Work
            Constraint::Length(7), // Overtime
            Constraint::Length(7), // Total
        ],
    )
    .header(Row::new(vec!["日付", "曜日", "通常", "残業", "合計"]).style(Style::default().fg(Color::Yellow)))
    .block(
        Block::default()
            .title(" 日別 ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.table);
}

fn draw_chart(f: &mut Frame, chart: &[ChartPoint], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(THEME.muted))
        .title(" 勤務時間 (通常 / 残業) ");

    let mut widget = BarChart::default().block(block).bar_width(2).bar_gap(0).group_gap(1);
    for point in chart {
        let bars = [
            Bar::default()
                .value((point.regular * 10.0).round() as u64)
                .text_value(String::new())
                .style(Style::default().fg(THEME.regular)),
            Bar::default()
                .value((point.overtime * 10.0).round() as u64)
                .text_value(String::new())
                .style(Style::default().fg(THEME.overtime)),
        ];
        let day = point.label.rsplit('/').next().unwrap_or(&point.label).to_string();
        let label_style = if point.is_weekend {
            Style::default().fg(THEME.overtime)
        } else {
            Style::default().fg(THEME.muted)
        };
        widget = widget.data(BarGroup::default().label(Line::styled(day, label_style)).bars(&bars));
    }
    f.render_widget(widget, area);
}

fn draw_subjects(f: &mut Frame, view: &DashboardView, area: Rect) {
    let lines: Vec<Line> = view
        .subjects
        .iter()
        .map(|s| {
            Line::from(vec![
                Span::raw(pad(s.name.as_deref().unwrap_or(&s.subject_id), NAME_COLUMNS)),
                Span::styled(format!(" {:>6.1}", s.work_total), Style::default().fg(THEME.regular)),
                Span::styled(format!(" {:>6.1}", s.overtime_total), Style::default().fg(THEME.overtime)),
            ])
        })
        .collect();
    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" 担当者別 ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(THEME.muted)),
    );
    f.render_widget(widget, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.error {
        Some(message) => Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red))),
        None => Line::from(vec![
            Span::styled("←/→ ", Style::default().fg(THEME.text)),
            Span::styled("前/次  ", Style::default().fg(THEME.muted)),
            Span::styled("w ", Style::default().fg(THEME.text)),
            Span::styled("月/週  ", Style::default().fg(THEME.muted)),
            Span::styled("r ", Style::default().fg(THEME.text)),
            Span::styled("再読込  ", Style::default().fg(THEME.muted)),
            Span::styled("q ", Style::default().fg(THEME.text)),
            Span::styled("終了", Style::default().fg(THEME.muted)),
        ]),
    };
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
