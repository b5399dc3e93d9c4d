use serde::Serialize;

use crate::error::Result;
use crate::model::identity::Identity;
use crate::model::project::ProjectRef;
use crate::model::report::{Report, ReportDraft};
use crate::query::DateWindow;
use crate::repository::RowStore;
use crate::service::report_service::ReportService;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub report: Report,
    pub author: String,
    pub manpower: f64,
    /// Whether the viewer may open this report for editing.
    pub editable: bool,
}

impl ReportRow {
    fn new(report: Report, viewer: &Identity) -> Self {
        let author = match report.author_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if report.user_id == viewer.user_id => viewer.name.clone(),
            _ => "不明".to_string(),
        };
        Self {
            editable: viewer.may_edit_report_of(&report.user_id),
            manpower: report.manpower_or_derived(),
            author,
            report,
        }
    }
}

/// The daily report page: the viewer's list and the add/edit form.
pub struct DailyReportUseCase<S: RowStore> {
    reports: ReportService<S>,
}

impl<S: RowStore> DailyReportUseCase<S> {
    pub fn new(store: S) -> Self {
        Self {
            reports: ReportService::new(store),
        }
    }

    pub async fn rows(&self, identity: &Identity, window: Option<DateWindow>) -> Result<Vec<ReportRow>> {
        Ok(self
            .reports
            .list(identity, window)
            .await?
            .into_iter()
            .map(|r| ReportRow::new(r, identity))
            .collect())
    }

    /// Fetches a report to edit. Reports outside the viewer's scope are not
    /// found; the scope matches exactly the reports the viewer may change.
    pub async fn open_for_edit(&self, identity: &Identity, id: i64) -> Result<Report> {
        self.reports.get(identity, id).await
    }

    pub async fn add(&self, identity: &Identity, draft: &ReportDraft) -> Result<Report> {
        self.reports.save(identity, None, draft).await
    }

    pub async fn edit<F>(&self, identity: &Identity, id: i64, change: F) -> Result<Report>
    where
        F: FnOnce(&mut ReportDraft) -> Result<()>,
    {
        let existing = self.open_for_edit(identity, id).await?;
        let mut draft = existing.to_draft();
        change(&mut draft)?;
        self.reports.save(identity, Some(&existing), &draft).await
    }

    pub async fn project_options(&self) -> Result<Vec<ProjectRef>> {
        self.reports.project_options().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::role::Role;
    use crate::query::Table;
    use crate::repository::mock::MockStore;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> MockStore {
        MockStore::with_rows(
            Table::DailyReports,
            vec![
                json!({"id": 1, "report_date": "2024-06-01", "user_id": "u1", "project_id": 1, "work_hours": 8, "overtime_hours": 4}),
                json!({"id": 2, "report_date": "2024-06-02", "user_id": "u2", "project_id": 1, "work_hours": 6, "profiles": [{"name": "Ito"}]}),
            ],
        )
    }

    #[tokio::test]
    async fn test_rows_carry_editable_flag() {
        let usecase = DailyReportUseCase::new(store());
        let staff = Identity::new("s1", "Suzuki", Role::Staff);
        let rows = usecase.rows(&staff, None).await.unwrap();
        assert!(rows.iter().all(|r| r.editable));
        assert_eq!(rows[0].author, "Ito");
        assert_eq!(rows[1].author, "不明");
        assert_eq!(rows[1].manpower, 1.5);

        let worker = Identity::new("u1", "Sato", Role::Worker);
        let rows = usecase.rows(&worker, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].editable);
        assert_eq!(rows[0].author, "Sato");
    }

    #[tokio::test]
    async fn test_edit_applies_change_and_keeps_owner() {
        let usecase = DailyReportUseCase::new(store());
        let staff = Identity::new("s1", "Suzuki", Role::Staff);
        let saved = usecase
            .edit(&staff, 2, |d| {
                d.overtime_hours = 1.0;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(saved.user_id, "u2");
        assert_eq!(saved.overtime(), 1.0);
    }

    #[tokio::test]
    async fn test_worker_cannot_open_foreign_report() {
        let store = Arc::new(store());
        let usecase = DailyReportUseCase::new(store.clone());
        let worker = Identity::new("u1", "Sato", Role::Worker);
        let err = usecase.open_for_edit(&worker, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let result = usecase.edit(&worker, 2, |_| Ok(())).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(store.updates.lock().unwrap().is_empty());
    }
}
