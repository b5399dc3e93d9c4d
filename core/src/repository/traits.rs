use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::model::identity::{AuthUser, UserMetadata};
use crate::query::{Query, Table};

/// Row-level access to the backing store.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;
    /// Inserts one row and returns it as stored.
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;
    /// Patches the row with the given id and returns it as stored.
    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Value>;
}

/// The authentication collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<AuthUser>>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;
    async fn sign_up(&self, email: &str, password: &str, metadata: &UserMetadata) -> Result<AuthUser>;
    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
impl<T: RowStore + ?Sized> RowStore for Arc<T> {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        (**self).select(query).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Value> {
        (**self).update(table, id, patch).await
    }
}

#[async_trait]
impl<T: AuthProvider + ?Sized> AuthProvider for Arc<T> {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        (**self).current_user().await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        (**self).sign_in(email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: &UserMetadata) -> Result<AuthUser> {
        (**self).sign_up(email, password, metadata).await
    }

    async fn sign_out(&self) -> Result<()> {
        (**self).sign_out().await
    }
}

pub async fn select_as<T, S>(store: &S, query: &Query) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: RowStore + ?Sized,
{
    store
        .select(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value::<T>(row).map_err(AppError::from))
        .collect()
}

/// First row of the result, if any.
pub async fn select_one<T, S>(store: &S, query: &Query) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: RowStore + ?Sized,
{
    let query = query.clone().limit(1);
    Ok(select_as(store, &query).await?.into_iter().next())
}
