use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::model::identity::{Identity, Profile};
use crate::model::wage::{validate_hourly_wage, Wage, WageDraft};
use crate::query::{Query, Table};
use crate::repository::{select_as, RowStore};

/// Hourly wage administration. Every operation is refused for roles other
/// than staff before anything is read or written.
pub struct WageService<S: RowStore> {
    store: S,
}

impl<S: RowStore> WageService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn authorize(identity: &Identity) -> Result<()> {
        if identity.role.manages_wages() {
            return Ok(());
        }
        warn!("{} ({}) denied wage access", identity.user_id, identity.role);
        Err(AppError::Forbidden {
            role: identity.role.to_string(),
            resource: Table::Wages.name().to_string(),
        })
    }

    /// Newest `effective_from` first, with the worker's name.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<Wage>> {
        Self::authorize(identity)?;
        let query = Query::from(Table::Wages)
            .all_columns()
            .embed(Table::Profiles, Some("profile"), &["name"])
            .order("effective_from", false);
        select_as(&self.store, &query).await
    }

    /// People a wage can be registered for.
    pub async fn workers(&self, identity: &Identity) -> Result<Vec<Profile>> {
        Self::authorize(identity)?;
        let query = Query::from(Table::Profiles)
            .columns(&["id", "name", "role"])
            .order("name", true);
        select_as(&self.store, &query).await
    }

    pub async fn register(&self, identity: &Identity, draft: &WageDraft) -> Result<Wage> {
        Self::authorize(identity)?;
        draft.validate()?;
        let row = self.store.insert(Table::Wages, draft.payload()).await?;
        let wage: Wage = serde_json::from_value(row)?;
        info!("Registered wage {} for {}", wage.id, wage.user_id);
        Ok(wage)
    }

    pub async fn set_hourly(&self, identity: &Identity, id: i64, hourly_wage: f64) -> Result<Wage> {
        Self::authorize(identity)?;
        validate_hourly_wage(hourly_wage)?;
        let row = self
            .store
            .update(Table::Wages, id, json!({ "hourly_wage": hourly_wage }))
            .await?;
        let wage: Wage = serde_json::from_value(row)?;
        info!("Updated wage {} to {}", wage.id, wage.hourly_wage);
        Ok(wage)
    }
}
