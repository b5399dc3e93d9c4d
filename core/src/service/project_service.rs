use tracing::{info, warn};

use crate::error::Result;
use crate::model::project::{Project, ProjectDraft};
use crate::query::{Query, Table};
use crate::repository::{select_as, select_one, RowStore};

pub struct ProjectService<S: RowStore> {
    store: S,
}

impl<S: RowStore> ProjectService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ordered by project number.
    pub async fn list(&self) -> Result<Vec<Project>> {
        let query = Query::from(Table::Projects).all_columns().order("project_no", true);
        select_as(&self.store, &query).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Project>> {
        let query = Query::from(Table::Projects).all_columns().eq("id", id);
        select_one(&self.store, &query).await
    }

    pub async fn save(&self, id: Option<i64>, draft: &ProjectDraft) -> Result<Project> {
        if let Err(e) = draft.validate() {
            warn!("Project draft rejected: {}", e);
            return Err(e.into());
        }
        let row = match id {
            Some(id) => self.store.update(Table::Projects, id, draft.payload()).await?,
            None => self.store.insert(Table::Projects, draft.payload()).await?,
        };
        let saved: Project = serde_json::from_value(row)?;
        info!("Saved project No.{} (id {})", saved.project_no, saved.id);
        Ok(saved)
    }
}
