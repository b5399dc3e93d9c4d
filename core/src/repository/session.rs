use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};
use crate::model::identity::{AuthUser, UserMetadata};
use crate::repository::file::{read_json, write_json};
use crate::repository::traits::AuthProvider;

pub const SESSION_FILE_NAME: &str = "session.json";

/// Tokens and user persisted between CLI invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_unix_secs: i64,
    pub user: AuthUser,
}

impl StoredSession {
    pub fn is_expired(&self, buffer_secs: i64) -> bool {
        Utc::now().timestamp() >= self.expires_at_unix_secs.saturating_sub(buffer_secs)
    }
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            path: base_dir.join(SESSION_FILE_NAME),
        }
    }

    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        read_json(&self.path).map(Some)
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io(e, format!("Failed to create directory {:?}", parent)))?;
        }
        write_json(&self.path, session)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| AppError::io(e, format!("Failed to remove {:?}", self.path)))?;
        }
        Ok(())
    }
}

/// Auth for the file store. There are no passwords: signing in records the
/// given identity, and a configured default user stands in when nobody has.
pub struct LocalAuth {
    sessions: FileSessionStore,
    default_user: Option<String>,
}

impl LocalAuth {
    pub fn new(sessions: FileSessionStore, default_user: Option<String>) -> Self {
        Self {
            sessions,
            default_user,
        }
    }

    fn record(&self, user: AuthUser) -> Result<AuthUser> {
        self.sessions.save(&StoredSession {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at_unix_secs: i64::MAX,
            user: user.clone(),
        })?;
        Ok(user)
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        if let Some(session) = self.sessions.load()? {
            return Ok(Some(session.user));
        }
        Ok(self.default_user.as_ref().map(|id| AuthUser {
            id: id.clone(),
            email: None,
            user_metadata: UserMetadata::default(),
        }))
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthUser> {
        info!("Local sign-in as {}", email);
        self.record(AuthUser {
            id: email.to_string(),
            email: Some(email.to_string()),
            user_metadata: UserMetadata::default(),
        })
    }

    async fn sign_up(&self, email: &str, _password: &str, metadata: &UserMetadata) -> Result<AuthUser> {
        self.record(AuthUser {
            id: email.to_string(),
            email: Some(email.to_string()),
            user_metadata: metadata.clone(),
        })
    }

    async fn sign_out(&self) -> Result<()> {
        self.sessions.clear()
    }
}
