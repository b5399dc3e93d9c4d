use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{AppError, Result, ValidationError};
use crate::model::identity::{AuthUser, Identity, Profile, UserMetadata};
use crate::model::role::Role;
use crate::navigation::{landing, Route};
use crate::query::{Query, Table};
use crate::repository::{select_one, AuthProvider, RowStore};

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub identity: Identity,
    /// `None` for roles without a home page.
    pub landing: Option<Route>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl Registration {
    pub fn validate(&self) -> std::result::Result<Role, ValidationError> {
        for (field, value) in [("name", &self.name), ("email", &self.email), ("password", &self.password)] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        match self.role {
            Some(role) if role.is_registerable() => Ok(role),
            Some(role) => Err(ValidationError::InvalidValue {
                field: "role",
                value: role.to_string(),
            }),
            None => Err(ValidationError::MissingField("role")),
        }
    }
}

/// Resolves who is signed in and runs the login, registration and logout
/// flows.
pub struct SessionService<A: AuthProvider, S: RowStore> {
    auth: A,
    store: S,
}

impl<A: AuthProvider, S: RowStore> SessionService<A, S> {
    pub fn new(auth: A, store: S) -> Self {
        Self { auth, store }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let query = Query::from(Table::Profiles).all_columns().eq("id", user_id);
        select_one(&self.store, &query).await
    }

    /// The current identity with its role, read once per view.
    pub async fn resolve(&self) -> Result<Identity> {
        let user = self.auth.current_user().await?.ok_or(AppError::Unauthenticated)?;
        let profile = self.fetch_profile(&user.id).await;
        match profile {
            Ok(Some(profile)) => Ok(profile.into_identity()),
            Ok(None) => {
                warn!("User {} has no profile row", user.id);
                Err(AppError::ProfileMissing(user.id))
            }
            Err(e) => {
                error!("Profile lookup for {} failed: {}", user.id, e);
                Err(AppError::ProfileMissing(user.id))
            }
        }
    }

    /// Like `resolve`, but an absent session is `None` rather than an error.
    pub async fn try_resolve(&self) -> Result<Option<Identity>> {
        match self.resolve().await {
            Ok(identity) => Ok(Some(identity)),
            Err(AppError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates the profile row from sign-up metadata when the user has none.
    async fn ensure_profile(&self, user: &AuthUser) -> Result<Identity> {
        if let Some(profile) = self.fetch_profile(&user.id).await? {
            return Ok(profile.into_identity());
        }
        let name = user.user_metadata.name.clone().unwrap_or_default();
        let role = match user.user_metadata.role.as_deref() {
            None => Role::Worker,
            raw => Role::parse(raw),
        };
        info!("Creating profile for {} as {}", user.id, role);
        self.store
            .insert(
                Table::Profiles,
                json!({ "id": user.id, "name": name, "role": role.as_str() }),
            )
            .await?;
        Ok(Identity::new(user.id.clone(), name, role))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        if email.trim().is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        let user = self.auth.sign_in(email.trim(), password).await?;
        let identity = self.ensure_profile(&user).await?;
        info!("{} logged in as {}", identity.user_id, identity.role);
        Ok(LoginOutcome {
            landing: landing(identity.role),
            identity,
        })
    }

    pub async fn register(&self, form: &Registration) -> Result<AuthUser> {
        let role = form.validate().map_err(|e| {
            warn!("Registration rejected: {}", e);
            e
        })?;
        let metadata = UserMetadata {
            name: Some(form.name.trim().to_string()),
            role: Some(role.as_str().to_string()),
        };
        let user = self.auth.sign_up(form.email.trim(), &form.password, &metadata).await?;
        info!("Registered {} as {}", user.id, role);
        Ok(user)
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.sign_out().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::mock::{MockAuth, MockStore};

    #[tokio::test]
    async fn test_resolve_unauthenticated() {
        let service = SessionService::new(MockAuth::default(), MockStore::default());
        let err = service.resolve().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(service.try_resolve().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_profile() {
        let store = MockStore::with_rows(
            Table::Profiles,
            vec![json!({"id": "u1", "name": "Sato", "role": "事務"})],
        );
        let service = SessionService::new(MockAuth::signed_in("u1", UserMetadata::default()), store);
        let identity = service.resolve().await.unwrap();
        assert_eq!(identity, Identity::new("u1", "Sato", Role::Staff));
    }

    #[tokio::test]
    async fn test_resolve_missing_profile() {
        let service = SessionService::new(
            MockAuth::signed_in("u1", UserMetadata::default()),
            MockStore::default(),
        );
        assert_eq!(service.resolve().await.unwrap_err().kind(), ErrorKind::ProfileMissing);

        let failing = SessionService::new(
            MockAuth::signed_in("u1", UserMetadata::default()),
            MockStore::failing("boom"),
        );
        assert_eq!(failing.resolve().await.unwrap_err().kind(), ErrorKind::ProfileMissing);
    }

    #[tokio::test]
    async fn test_login_creates_missing_profile() {
        let service = SessionService::new(MockAuth::default(), MockStore::default());
        let outcome = service.login("tanaka@example.com", "secret").await.unwrap();
        assert_eq!(outcome.identity.role, Role::Worker);
        assert_eq!(outcome.landing, Some(Route::DailyReport));

        let inserts = service.store.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].0, Table::Profiles);
        assert_eq!(inserts[0].1["id"], "tanaka");
        assert_eq!(inserts[0].1["role"], "worker");
    }

    #[tokio::test]
    async fn test_login_existing_profile_lands_by_role() {
        let store = MockStore::with_rows(
            Table::Profiles,
            vec![json!({"id": "ito", "name": "Ito", "role": "sales"})],
        );
        let service = SessionService::new(MockAuth::default(), store);
        let outcome = service.login("ito@example.com", "secret").await.unwrap();
        assert_eq!(outcome.landing, Some(Route::ProjectEntry));
        assert!(service.store.inserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_failure_and_validation() {
        let service = SessionService::new(MockAuth::default(), MockStore::default());
        let err = service.login("ito@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.user_message(), "取得エラー: Invalid login credentials");

        let err = service.login("  ", "secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(service.store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_register_validates_role() {
        let service = SessionService::new(MockAuth::default(), MockStore::default());
        let mut form = Registration {
            name: "Kato".into(),
            email: "kato@example.com".into(),
            password: "pw".into(),
            role: Some(Role::Unrecognized),
        };
        assert!(service.register(&form).await.is_err());
        assert!(service.auth.signed_up.lock().unwrap().is_empty());

        form.role = Some(Role::Sales);
        service.register(&form).await.unwrap();
        let signed_up = service.auth.signed_up.lock().unwrap();
        assert_eq!(signed_up[0].1.role.as_deref(), Some("sales"));
        assert_eq!(signed_up[0].1.name.as_deref(), Some("Kato"));
    }
}
