use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::model::identity::Identity;
use crate::model::project::ProjectRef;
use crate::model::report::{Report, ReportDraft};
use crate::query::{scoped_report_query, DateWindow, Query, Table};
use crate::repository::{select_as, RowStore};

pub struct ReportService<S: RowStore> {
    store: S,
}

impl<S: RowStore> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reports visible to `identity` inside `window`, in store order.
    pub async fn fetch_window(&self, identity: &Identity, window: Option<DateWindow>) -> Result<Vec<Report>> {
        let query = scoped_report_query(identity, window);
        select_as(&self.store, &query).await
    }

    /// Newest first.
    pub async fn list(&self, identity: &Identity, window: Option<DateWindow>) -> Result<Vec<Report>> {
        let query = scoped_report_query(identity, window)
            .order("report_date", false)
            .order("id", false);
        let reports: Vec<Report> = select_as(&self.store, &query).await?;
        info!("Loaded {} reports for {}", reports.len(), identity.user_id);
        Ok(reports)
    }

    /// One report, looked up inside the identity's scope.
    pub async fn get(&self, identity: &Identity, id: i64) -> Result<Report> {
        let query = scoped_report_query(identity, None).eq("id", id).limit(1);
        select_as::<Report, _>(&self.store, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("日報 {}", id)))
    }

    /// Inserts a new report owned by `identity`, or updates `existing`
    /// without changing who it belongs to.
    pub async fn save(&self, identity: &Identity, existing: Option<&Report>, draft: &ReportDraft) -> Result<Report> {
        if let Err(e) = draft.validate() {
            warn!("Report draft rejected: {}", e);
            return Err(e.into());
        }

        let row = match existing {
            Some(report) => {
                if !identity.may_edit_report_of(&report.user_id) {
                    warn!(
                        "{} ({}) may not edit report {} of {}",
                        identity.user_id, identity.role, report.id, report.user_id
                    );
                    return Err(AppError::Forbidden {
                        role: identity.role.to_string(),
                        resource: format!("daily_reports/{}", report.id),
                    });
                }
                self.store
                    .update(Table::DailyReports, report.id, draft.payload(None))
                    .await?
            }
            None => {
                self.store
                    .insert(Table::DailyReports, draft.payload(Some(&identity.user_id)))
                    .await?
            }
        };
        let saved: Report = serde_json::from_value(row)?;
        info!("Saved report {} for {}", saved.id, saved.user_id);
        Ok(saved)
    }

    /// Projects offered in the report form.
    pub async fn project_options(&self) -> Result<Vec<ProjectRef>> {
        let query = Query::from(Table::Projects)
            .columns(&["id", "project_no", "project_name"])
            .order("project_no", true);
        select_as(&self.store, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::role::Role;
    use crate::repository::mock::MockStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn rows() -> Vec<serde_json::Value> {
        vec![
            json!({"id": 1, "report_date": "2024-06-01", "user_id": "u1", "project_id": 3, "work_hours": 8, "profiles": {"name": "Sato"}}),
            json!({"id": 2, "report_date": "2024-06-03", "user_id": "u2", "project_id": 3, "work_hours": 7, "profiles": {"name": "Ito"}}),
            json!({"id": 3, "report_date": "2024-06-02", "user_id": "u1", "work_hours": 6}),
        ]
    }

    fn draft() -> ReportDraft {
        ReportDraft {
            report_date: NaiveDate::from_ymd_opt(2024, 6, 4),
            project_id: Some(3),
            task_description: "配管".into(),
            work_hours: 8.0,
            overtime_hours: 0.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let service = ReportService::new(MockStore::with_rows(Table::DailyReports, rows()));
        let worker = Identity::new("u1", "Sato", Role::Worker);
        let ids: Vec<i64> = service.list(&worker, None).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);

        let staff = Identity::new("s1", "Suzuki", Role::Staff);
        let ids: Vec<i64> = service.list(&staff, None).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_get_outside_scope_is_not_found() {
        let service = ReportService::new(MockStore::with_rows(Table::DailyReports, rows()));
        let worker = Identity::new("u1", "Sato", Role::Worker);
        assert_eq!(service.get(&worker, 1).await.unwrap().id, 1);
        let err = service.get(&worker, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_insert_sets_owner() {
        let service = ReportService::new(MockStore::default());
        let worker = Identity::new("u1", "Sato", Role::Worker);
        let saved = service.save(&worker, None, &draft()).await.unwrap();
        assert_eq!(saved.user_id, "u1");
        let inserts = service.store.inserts.lock().unwrap();
        assert_eq!(inserts[0].1["user_id"], "u1");
    }

    #[tokio::test]
    async fn test_staff_edit_keeps_owner() {
        let service = ReportService::new(MockStore::with_rows(Table::DailyReports, rows()));
        let staff = Identity::new("s1", "Suzuki", Role::Staff);
        let existing = service.get(&staff, 2).await.unwrap();
        let saved = service.save(&staff, Some(&existing), &existing.to_draft()).await.unwrap();
        assert_eq!(saved.user_id, "u2");

        let updates = service.store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, 2);
        assert!(updates[0].2.get("user_id").is_none());
    }

    #[tokio::test]
    async fn test_worker_cannot_edit_others() {
        let service = ReportService::new(MockStore::default());
        let worker = Identity::new("u1", "Sato", Role::Worker);
        let theirs: Report = serde_json::from_value(rows()[1].clone()).unwrap();
        let err = service.save(&worker, Some(&theirs), &draft()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(service.store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_store() {
        let service = ReportService::new(MockStore::default());
        let worker = Identity::new("u1", "Sato", Role::Worker);
        let mut bad = draft();
        bad.project_id = None;
        let err = service.save(&worker, None, &bad).await.unwrap_err();
        assert_eq!(err.user_message(), "必須項目をすべて入力してください");
        assert_eq!(service.store.call_count(), 0);
    }
}
