use serde::{Deserialize, Serialize};

use crate::model::role::Role;

/// Who is looking at a view. Resolved once on mount and handed to every
/// component that scopes data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn may_edit_report_of(&self, subject_id: &str) -> bool {
        self.user_id == subject_id || self.role.sees_all_reports()
    }
}

/// A row of the `profiles` table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    pub fn into_identity(self) -> Identity {
        Identity {
            name: self.name.unwrap_or_default(),
            user_id: self.id,
            role: self.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct UserMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// The user as the auth collaborator knows it, before any profile lookup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Embedded `profiles(name)` resource. PostgREST returns either an object or
/// a one-element array depending on the relationship detection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum EmbeddedName {
    One(NameOnly),
    Many(Vec<NameOnly>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NameOnly {
    #[serde(default)]
    pub name: Option<String>,
}

impl EmbeddedName {
    pub fn name(&self) -> Option<&str> {
        match self {
            EmbeddedName::One(n) => n.name.as_deref(),
            EmbeddedName::Many(list) => list.first().and_then(|n| n.name.as_deref()),
        }
    }
}
