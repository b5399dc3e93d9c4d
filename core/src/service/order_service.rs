use tracing::{info, warn};

use crate::error::Result;
use crate::model::order::{OrderDraft, PurchaseOrder};
use crate::model::project::ProjectRef;
use crate::query::{Query, Table};
use crate::repository::{select_as, RowStore};

pub struct OrderService<S: RowStore> {
    store: S,
}

impl<S: RowStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn base_query() -> Query {
        Query::from(Table::PurchaseOrders)
            .all_columns()
            .embed(Table::Projects, None, &["id", "project_no", "project_name"])
    }

    /// Newest order date first, each with its project summary.
    pub async fn list(&self, project_id: Option<i64>) -> Result<Vec<PurchaseOrder>> {
        let mut query = Self::base_query().order("order_date", false);
        if let Some(id) = project_id {
            query = query.eq("project_id", id);
        }
        select_as(&self.store, &query).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<PurchaseOrder>> {
        let query = Self::base_query().eq("id", id).limit(1);
        Ok(select_as(&self.store, &query).await?.into_iter().next())
    }

    /// Inserts when `id` is `None`, updates otherwise.
    pub async fn save(&self, id: Option<i64>, draft: &OrderDraft) -> Result<PurchaseOrder> {
        if let Err(e) = draft.validate() {
            warn!("Order draft rejected: {}", e);
            return Err(e.into());
        }
        let row = match id {
            Some(id) => self.store.update(Table::PurchaseOrders, id, draft.payload()).await?,
            None => self.store.insert(Table::PurchaseOrders, draft.payload()).await?,
        };
        let saved: PurchaseOrder = serde_json::from_value(row)?;
        info!("Saved order {} ({})", saved.id, saved.item_name);
        Ok(saved)
    }

    pub async fn project_options(&self) -> Result<Vec<ProjectRef>> {
        let query = Query::from(Table::Projects)
            .columns(&["id", "project_no", "project_name"])
            .order("project_no", true);
        select_as(&self.store, &query).await
    }
}
