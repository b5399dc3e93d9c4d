use anyhow::Result;
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

use logicore_core::error::{AppError, ValidationError};
use logicore_core::input::{apply_order_fields, apply_project_fields, apply_report_fields, parse_args};
use logicore_core::model::order::{OrderDraft, PurchaseOrder};
use logicore_core::model::project::{Project, ProjectDraft, ProjectRef};
use logicore_core::model::report::ReportDraft;
use logicore_core::model::wage::WageDraft;
use logicore_core::query::DateWindow;
use logicore_core::service::cost_summary::{CostEntry, CostSummaryService};
use logicore_core::service::order_service::OrderService;
use logicore_core::service::project_service::ProjectService;
use logicore_core::service::wage_service::WageService;
use logicore_core::time::today;
use logicore_core::usecase::daily_report::{DailyReportUseCase, ReportRow};
use logicore_core::Identity;

use crate::text::fit;
use crate::Context;

const DESCRIPTION_WIDTH: usize = 30;

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{}", table);
}

// --- Daily reports ---

#[derive(Tabled)]
struct ReportLine {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "日付")]
    date: String,
    #[tabled(rename = "氏名")]
    author: String,
    #[tabled(rename = "作業内容")]
    task: String,
    #[tabled(rename = "通常")]
    work: String,
    #[tabled(rename = "残業")]
    overtime: String,
    #[tabled(rename = "人工")]
    manpower: String,
    #[tabled(rename = "工事")]
    project: String,
    #[tabled(rename = "編集")]
    editable: &'static str,
}

impl From<&ReportRow> for ReportLine {
    fn from(row: &ReportRow) -> Self {
        let report = &row.report;
        Self {
            id: report.id,
            date: report.report_date.format("%Y-%m-%d").to_string(),
            author: row.author.clone(),
            task: fit(report.task_description.as_deref().unwrap_or(""), DESCRIPTION_WIDTH),
            work: format!("{:.1}", report.work()),
            overtime: format!("{:.1}", report.overtime()),
            manpower: format!("{:.2}", row.manpower),
            project: opt(&report.project_id),
            editable: if row.editable { "○" } else { "" },
        }
    }
}

pub async fn list_reports(ctx: &Context, identity: &Identity, window: Option<DateWindow>) -> Result<()> {
    let usecase = DailyReportUseCase::new(ctx.store.clone());
    let rows = usecase.rows(identity, window).await?;
    if rows.is_empty() {
        println!("日報はまだありません。");
        return Ok(());
    }
    print_table(rows.iter().map(ReportLine::from).collect());
    Ok(())
}

fn print_project_options(options: &[ProjectRef]) {
    if options.is_empty() {
        eprintln!("工事が登録されていません。");
        return;
    }
    eprintln!("工事を project:<ID> で指定してください:");
    for option in options {
        eprintln!("  {:>4}  {}", option.id, option.label());
    }
}

pub async fn add_report(ctx: &Context, identity: &Identity, args: &[String]) -> Result<()> {
    let usecase = DailyReportUseCase::new(ctx.store.clone());
    let mut draft = ReportDraft {
        report_date: Some(today()),
        ..Default::default()
    };
    apply_report_fields(&mut draft, &parse_args(args), today())?;
    if draft.project_id.is_none() {
        print_project_options(&usecase.project_options().await?);
    }
    let saved = usecase.add(identity, &draft).await?;
    println!(
        "日報を登録しました (ID: {}, {}, {:.1}h + 残業 {:.1}h)",
        saved.id,
        saved.report_date,
        saved.work(),
        saved.overtime()
    );
    Ok(())
}

pub async fn edit_report(ctx: &Context, identity: &Identity, id: i64, args: &[String]) -> Result<()> {
    let usecase = DailyReportUseCase::new(ctx.store.clone());
    let parsed = parse_args(args);
    let saved = usecase
        .edit(identity, id, |draft| {
            apply_report_fields(draft, &parsed, today()).map_err(AppError::from)
        })
        .await?;
    println!("日報 {} を更新しました。", saved.id);
    Ok(())
}

// --- Purchase orders ---

#[derive(Tabled)]
struct OrderLine {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "発注日")]
    date: String,
    #[tabled(rename = "工事")]
    project: String,
    #[tabled(rename = "品名")]
    item: String,
    #[tabled(rename = "仕様")]
    spec: String,
    #[tabled(rename = "数量")]
    quantity: String,
    #[tabled(rename = "単価")]
    unit_price: String,
    #[tabled(rename = "金額")]
    total: String,
    #[tabled(rename = "発注者")]
    ordered_by: String,
}

impl From<&PurchaseOrder> for OrderLine {
    fn from(order: &PurchaseOrder) -> Self {
        Self {
            id: order.id,
            date: opt(&order.order_date),
            project: order
                .projects
                .as_ref()
                .map(|p| fit(&p.label(), 24))
                .unwrap_or_else(|| opt(&order.project_id)),
            item: fit(&order.item_name, 20),
            spec: fit(order.spec.as_deref().unwrap_or(""), 16),
            quantity: format!(
                "{} {}",
                opt(&order.quantity),
                order.unit.as_deref().unwrap_or("")
            ),
            unit_price: opt(&order.unit_price),
            total: opt(&order.total_price),
            ordered_by: opt(&order.ordered_by),
        }
    }
}

pub async fn list_orders(ctx: &Context, project: Option<i64>) -> Result<()> {
    let service = OrderService::new(ctx.store.clone());
    let orders = service.list(project).await?;
    if orders.is_empty() {
        println!("発注はまだありません。");
        return Ok(());
    }
    print_table(orders.iter().map(OrderLine::from).collect());
    Ok(())
}

pub async fn save_order(ctx: &Context, id: Option<i64>, args: &[String]) -> Result<()> {
    let service = OrderService::new(ctx.store.clone());
    let mut draft = match id {
        Some(id) => service
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("発注 {}", id)))?
            .to_draft(),
        None => OrderDraft::new(today()),
    };
    apply_order_fields(&mut draft, &parse_args(args))?;
    if draft.project_id.is_none() {
        print_project_options(&service.project_options().await?);
    }
    let saved = service.save(id, &draft).await?;
    println!("発注を保存しました (ID: {}, {})", saved.id, saved.item_name);
    Ok(())
}

// --- Projects ---

#[derive(Tabled)]
struct ProjectLine {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "工事番号")]
    no: i64,
    #[tabled(rename = "会社名")]
    company: String,
    #[tabled(rename = "工事名")]
    name: String,
    #[tabled(rename = "製品名")]
    product: String,
    #[tabled(rename = "営業")]
    sales: String,
    #[tabled(rename = "受注日")]
    ordered: String,
    #[tabled(rename = "納期")]
    delivery: String,
}

impl From<&Project> for ProjectLine {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            no: project.project_no,
            company: fit(project.company_name.as_deref().unwrap_or(""), 16),
            name: fit(project.project_name.as_deref().unwrap_or(""), 20),
            product: fit(project.product_name.as_deref().unwrap_or(""), 16),
            sales: opt(&project.sales_rep),
            ordered: opt(&project.order_date),
            delivery: opt(&project.delivery_date),
        }
    }
}

pub async fn list_projects(ctx: &Context) -> Result<()> {
    let service = ProjectService::new(ctx.store.clone());
    let projects = service.list().await?;
    if projects.is_empty() {
        println!("工事はまだありません。");
        return Ok(());
    }
    print_table(projects.iter().map(ProjectLine::from).collect());
    Ok(())
}

pub async fn save_project(ctx: &Context, id: Option<i64>, args: &[String]) -> Result<()> {
    let service = ProjectService::new(ctx.store.clone());
    let mut draft = match id {
        Some(id) => service
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("工事 {}", id)))?
            .to_draft(),
        None => ProjectDraft::default(),
    };
    apply_project_fields(&mut draft, &parse_args(args))?;
    let saved = service.save(id, &draft).await?;
    println!("工事を保存しました: {}", saved.summary().label());
    Ok(())
}

// --- Wages ---

#[derive(Tabled)]
struct WageLine {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "氏名")]
    name: String,
    #[tabled(rename = "時給")]
    hourly: String,
    #[tabled(rename = "残業時給")]
    overtime: String,
    #[tabled(rename = "適用開始日")]
    effective_from: String,
}

pub async fn list_wages(ctx: &Context, identity: &Identity) -> Result<()> {
    let service = WageService::new(ctx.store.clone());
    let wages = service.list(identity).await?;
    if wages.is_empty() {
        println!("時給はまだ登録されていません。");
        return Ok(());
    }
    print_table(
        wages
            .iter()
            .map(|w| WageLine {
                id: w.id,
                name: w.worker_name().to_string(),
                hourly: format!("{}", w.hourly_wage),
                overtime: opt(&w.overtime_wage),
                effective_from: opt(&w.effective_from),
            })
            .collect(),
    );
    Ok(())
}

pub async fn add_wage(ctx: &Context, identity: &Identity, user_id: String, hourly_wage: f64) -> Result<()> {
    let service = WageService::new(ctx.store.clone());
    let workers = service.workers(identity).await?;
    let Some(worker) = workers.iter().find(|p| p.id == user_id) else {
        eprintln!("登録できるユーザー:");
        for p in &workers {
            eprintln!("  {}  {} ({})", p.id, p.name.as_deref().unwrap_or(""), p.role.label());
        }
        return Err(AppError::from(ValidationError::InvalidValue {
            field: "user_id",
            value: user_id,
        })
        .into());
    };
    let name = worker.name.clone().unwrap_or_default();
    let saved = service
        .register(identity, &WageDraft { user_id, hourly_wage })
        .await?;
    println!("{} の時給を登録しました: {} 円 (ID: {})", name, saved.hourly_wage, saved.id);
    Ok(())
}

pub async fn set_wage(ctx: &Context, identity: &Identity, id: i64, hourly_wage: f64) -> Result<()> {
    let service = WageService::new(ctx.store.clone());
    let saved = service.set_hourly(identity, id, hourly_wage).await?;
    println!("時給 {} を {} 円に更新しました。", saved.id, saved.hourly_wage);
    Ok(())
}

// --- Cost summary ---

#[derive(Tabled)]
struct CostRow {
    #[tabled(rename = "区分")]
    kind: &'static str,
    #[tabled(rename = "氏名")]
    worker: String,
    #[tabled(rename = "作業内容")]
    task: String,
    #[tabled(rename = "時間")]
    hours: String,
    #[tabled(rename = "備考")]
    note: String,
}

fn cost_row(kind: &'static str, entry: &CostEntry) -> CostRow {
    CostRow {
        kind,
        worker: entry.worker_name.clone(),
        task: fit(&entry.task_description, DESCRIPTION_WIDTH),
        hours: format!("{:.1}", entry.hours),
        note: entry.note.clone().unwrap_or_default(),
    }
}

pub async fn cost_sheet(ctx: &Context, identity: &Identity, project_id: i64) -> Result<()> {
    let service = CostSummaryService::new(ctx.store.clone());
    let sheet = service.sheet(identity, project_id).await?;
    println!(
        "\n\x1b[1;36m{}\x1b[0m {}",
        sheet.project.summary().label(),
        sheet.project.company_name.as_deref().unwrap_or("")
    );
    if sheet.lines.is_empty() {
        println!("この工事の発注はありません。");
    }
    for line in &sheet.lines {
        let order = &line.order;
        println!(
            "\n■ {} {}  数量 {} {}  単価 {}  金額 {}",
            order.item_name,
            order.spec.as_deref().unwrap_or(""),
            opt(&order.quantity),
            order.unit.as_deref().unwrap_or(""),
            opt(&order.unit_price),
            opt(&order.total_price)
        );
        if line.entries.is_empty() {
            println!("  作業記録なし");
            continue;
        }
        let rows: Vec<CostRow> = line
            .entries
            .iter()
            .map(|e| cost_row("通常", e))
            .chain(line.overtime.iter().map(|e| cost_row("残業", e)))
            .collect();
        print_table(rows);
        println!(
            "  合計: 通常 {:.1}h / 残業 {:.1}h",
            line.work_total, line.overtime_total
        );
    }
    if sheet.unmatched > 0 {
        println!("\n発注に紐づかない日報: {} 件", sheet.unmatched);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_line_from_row() {
        let report = serde_json::from_value(json!({
            "id": 3,
            "report_date": "2024-06-03",
            "user_id": "u1",
            "task_description": "鋼板の切断と溶接および仕上げ作業一式と清掃",
            "work_hours": 6,
            "project_id": 2,
        }))
        .unwrap();
        let row = ReportRow {
            report,
            author: "Sato".into(),
            manpower: 0.75,
            editable: true,
        };
        let line = ReportLine::from(&row);
        assert_eq!(line.date, "2024-06-03");
        assert_eq!(line.overtime, "0.0");
        assert_eq!(line.manpower, "0.75");
        assert!(line.task.ends_with('…'));
        assert_eq!(line.editable, "○");
    }

    #[test]
    fn test_opt_placeholder() {
        assert_eq!(opt::<i64>(&None), "-");
        assert_eq!(opt(&Some(5)), "5");
    }
}
