use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::model::identity::{AuthUser, UserMetadata};
use crate::query::{Query, Table};
use crate::repository::traits::{AuthProvider, RowStore};

/// Canned rows per table; records every call it receives.
#[derive(Default)]
pub struct MockStore {
    pub rows: Mutex<HashMap<Table, Vec<Value>>>,
    pub selects: Mutex<Vec<Query>>,
    pub inserts: Mutex<Vec<(Table, Value)>>,
    pub updates: Mutex<Vec<(Table, i64, Value)>>,
    pub fail_with: Option<String>,
}

impl MockStore {
    pub fn with_rows(table: Table, rows: Vec<Value>) -> Self {
        let store = Self::default();
        store.rows.lock().unwrap().insert(table, rows);
        store
    }

    pub fn add_rows(self, table: Table, rows: Vec<Value>) -> Self {
        self.rows.lock().unwrap().insert(table, rows);
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.selects.lock().unwrap().len()
            + self.inserts.lock().unwrap().len()
            + self.updates.lock().unwrap().len()
    }

    fn check(&self, context: &str) -> Result<()> {
        match &self.fail_with {
            Some(msg) => Err(AppError::remote(context, Some(500), msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RowStore for MockStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.selects.lock().unwrap().push(query.clone());
        self.check("select")?;
        let mut rows: Vec<Value> = self
            .rows
            .lock()
            .unwrap()
            .get(&query.table)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        query.sort_rows(&mut rows);
        if let Some(n) = query.limit {
            rows.truncate(n);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.inserts.lock().unwrap().push((table, row.clone()));
        self.check("insert")?;
        let mut stored = row;
        if stored.get("id").is_none() {
            stored["id"] = Value::from(100);
        }
        self.rows.lock().unwrap().entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Value> {
        self.updates.lock().unwrap().push((table, id, patch.clone()));
        self.check("update")?;
        let mut rows = self.rows.lock().unwrap();
        let existing = rows
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_i64) == Some(id));
        match (existing, patch) {
            (Some(Value::Object(row)), Value::Object(changes)) => {
                row.extend(changes);
                Ok(Value::Object(row.clone()))
            }
            (_, mut patch) => {
                patch["id"] = Value::from(id);
                Ok(patch)
            }
        }
    }
}

#[derive(Default)]
pub struct MockAuth {
    pub user: Mutex<Option<AuthUser>>,
    pub signed_up: Mutex<Vec<(String, UserMetadata)>>,
}

impl MockAuth {
    pub fn signed_in(id: &str, metadata: UserMetadata) -> Self {
        let auth = Self::default();
        *auth.user.lock().unwrap() = Some(AuthUser {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            user_metadata: metadata,
        });
        auth
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.user.lock().unwrap().clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        if password != "secret" {
            return Err(AppError::remote("sign in", Some(400), "Invalid login credentials"));
        }
        let user = AuthUser {
            id: email.split('@').next().unwrap_or(email).to_string(),
            email: Some(email.to_string()),
            user_metadata: UserMetadata::default(),
        };
        *self.user.lock().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn sign_up(&self, email: &str, _password: &str, metadata: &UserMetadata) -> Result<AuthUser> {
        self.signed_up
            .lock()
            .unwrap()
            .push((email.to_string(), metadata.clone()));
        Ok(AuthUser {
            id: format!("new-{}", email),
            email: Some(email.to_string()),
            user_metadata: metadata.clone(),
        })
    }

    async fn sign_out(&self) -> Result<()> {
        *self.user.lock().unwrap() = None;
        Ok(())
    }
}
