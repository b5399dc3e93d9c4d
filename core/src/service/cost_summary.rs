use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::model::identity::Identity;
use crate::model::order::PurchaseOrder;
use crate::model::project::Project;
use crate::model::report::Report;
use crate::query::{scoped_report_query, Query, Table};
use crate::repository::{select_as, select_one, RowStore};
use crate::service::aggregate::summarize;

/// A report as listed under an order line.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CostEntry {
    pub report_id: i64,
    pub worker_name: String,
    pub task_description: String,
    pub hours: f64,
    pub note: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CostLine {
    pub order: PurchaseOrder,
    pub entries: Vec<CostEntry>,
    /// Overtime of the same reports, listed on separate rows.
    pub overtime: Vec<CostEntry>,
    pub work_total: f64,
    pub overtime_total: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CostSheet {
    pub project: Project,
    pub lines: Vec<CostLine>,
    /// Reports of the project that could not be tied to any order line.
    pub unmatched: usize,
}

/// Finds the order line a report belongs to. An explicit
/// `purchase_order_id` naming one of `orders` wins; otherwise the first line,
/// in id order, whose item name occurs in the task description.
fn owning_line(report: &Report, orders: &[PurchaseOrder]) -> Option<usize> {
    if let Some(po) = report.purchase_order_id {
        if let Some(idx) = orders.iter().position(|o| o.id == po) {
            return Some(idx);
        }
    }
    let description = report.task_description.as_deref().filter(|d| !d.is_empty())?;
    orders
        .iter()
        .position(|o| !o.item_name.is_empty() && description.contains(o.item_name.as_str()))
}

fn entry(report: &Report, hours: f64) -> CostEntry {
    CostEntry {
        report_id: report.id,
        worker_name: report.author_name().unwrap_or("不明").to_string(),
        task_description: report.task_description.clone().unwrap_or_default(),
        hours,
        note: report.note.clone(),
    }
}

/// Groups reports under order lines. Lines keep the order of `orders`,
/// sorted by id first.
pub fn attach_reports(orders: Vec<PurchaseOrder>, reports: &[Report]) -> (Vec<CostLine>, usize) {
    let mut orders = orders;
    orders.sort_by_key(|o| o.id);
    let mut reports: Vec<&Report> = reports.iter().collect();
    reports.sort_by_key(|r| r.id);

    let mut buckets: Vec<Vec<&Report>> = vec![Vec::new(); orders.len()];
    let mut unmatched = 0;
    for report in reports {
        match owning_line(report, &orders) {
            Some(idx) => buckets[idx].push(report),
            None => unmatched += 1,
        }
    }

    let lines = orders
        .into_iter()
        .zip(buckets)
        .map(|(order, attached)| {
            let totals = summarize(attached.iter().copied());
            CostLine {
                entries: attached.iter().map(|r| entry(r, r.work())).collect(),
                overtime: attached
                    .iter()
                    .filter(|r| r.overtime() > 0.0)
                    .map(|r| entry(r, r.overtime()))
                    .collect(),
                work_total: totals.work_total,
                overtime_total: totals.overtime_total,
                order,
            }
        })
        .collect();
    (lines, unmatched)
}

pub struct CostSummaryService<S: RowStore> {
    store: S,
}

impl<S: RowStore> CostSummaryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn sheet(&self, identity: &Identity, project_id: i64) -> Result<CostSheet> {
        let project: Project = select_one(
            &self.store,
            &Query::from(Table::Projects).all_columns().eq("id", project_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("工事 {}", project_id)))?;

        let orders: Vec<PurchaseOrder> = select_as(
            &self.store,
            &Query::from(Table::PurchaseOrders)
                .all_columns()
                .eq("project_id", project_id)
                .order("id", true),
        )
        .await?;

        let reports: Vec<Report> = select_as(
            &self.store,
            &scoped_report_query(identity, None)
                .eq("project_id", project_id)
                .order("id", true),
        )
        .await?;

        let (lines, unmatched) = attach_reports(orders, &reports);
        if unmatched > 0 {
            warn!("{} reports of project {} match no order line", unmatched, project_id);
        }
        info!("Cost sheet for project {}: {} lines", project_id, lines.len());
        Ok(CostSheet {
            project,
            lines,
            unmatched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::repository::mock::MockStore;
    use serde_json::json;

    fn order(id: i64, item: &str) -> PurchaseOrder {
        serde_json::from_value(json!({"id": id, "project_id": 1, "item_name": item})).unwrap()
    }

    fn report(id: i64, desc: Option<&str>, po: Option<i64>, work: f64, ot: f64) -> Report {
        serde_json::from_value(json!({
            "id": id,
            "report_date": "2024-06-01",
            "user_id": "u1",
            "project_id": 1,
            "task_description": desc,
            "purchase_order_id": po,
            "work_hours": work,
            "overtime_hours": ot,
        }))
        .unwrap()
    }

    #[test]
    fn test_substring_match_takes_first_line_by_id() {
        // "角パイプ" and "パイプ" both occur; line 2 has the lower id.
        let orders = vec![order(5, "角パイプ"), order(2, "パイプ")];
        let reports = vec![report(1, Some("角パイプ切断"), None, 4.0, 0.0)];
        let (lines, unmatched) = attach_reports(orders, &reports);
        assert_eq!(unmatched, 0);
        assert_eq!(lines[0].order.id, 2);
        assert_eq!(lines[0].entries.len(), 1);
        assert!(lines[1].entries.is_empty());
    }

    #[test]
    fn test_explicit_link_wins() {
        let orders = vec![order(1, "鋼板"), order(2, "ボルト")];
        let reports = vec![report(1, Some("鋼板の溶接"), Some(2), 3.0, 1.5)];
        let (lines, _) = attach_reports(orders, &reports);
        assert!(lines[0].entries.is_empty());
        assert_eq!(lines[1].entries[0].hours, 3.0);
        assert_eq!(lines[1].overtime[0].hours, 1.5);
        assert_eq!(lines[1].overtime_total, 1.5);
    }

    #[test]
    fn test_unmatched_reports_are_counted() {
        let orders = vec![order(1, "鋼板")];
        let reports = vec![
            report(1, None, None, 8.0, 0.0),
            report(2, Some("清掃"), None, 2.0, 0.0),
            report(3, Some("鋼板加工"), Some(99), 1.0, 0.0),
        ];
        let (lines, unmatched) = attach_reports(orders, &reports);
        assert_eq!(unmatched, 2);
        assert_eq!(lines[0].entries[0].report_id, 3);
        assert_eq!(lines[0].entries[0].worker_name, "不明");
    }

    #[tokio::test]
    async fn test_sheet_uses_scoped_reports() {
        let store = MockStore::with_rows(
            Table::Projects,
            vec![json!({"id": 1, "project_no": 7, "project_name": "倉庫"})],
        )
        .add_rows(
            Table::PurchaseOrders,
            vec![json!({"id": 1, "project_id": 1, "item_name": "鋼板"})],
        )
        .add_rows(
            Table::DailyReports,
            vec![
                json!({"id": 1, "report_date": "2024-06-01", "user_id": "u1", "project_id": 1, "task_description": "鋼板"}),
                json!({"id": 2, "report_date": "2024-06-01", "user_id": "u2", "project_id": 1, "task_description": "鋼板"}),
            ],
        );
        let service = CostSummaryService::new(store);

        let staff = Identity::new("s1", "Suzuki", Role::Staff);
        let sheet = service.sheet(&staff, 1).await.unwrap();
        assert_eq!(sheet.lines[0].entries.len(), 2);

        let worker = Identity::new("u1", "Sato", Role::Worker);
        let sheet = service.sheet(&worker, 1).await.unwrap();
        assert_eq!(sheet.lines[0].entries.len(), 1);

        let err = service.sheet(&staff, 42).await.unwrap_err();
        assert_eq!(err.user_message(), "工事 42 が見つかりません");
    }
}
