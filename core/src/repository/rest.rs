use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::model::identity::{AuthUser, UserMetadata};
use crate::query::{Query, Table};
use crate::repository::session::{FileSessionStore, StoredSession};
use crate::repository::traits::{AuthProvider, RowStore};

/// Refresh the access token when it expires within this many seconds.
const REFRESH_BUFFER_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: AuthUser,
}

/// Sign-up answers with a session when e-mail confirmation is off, and with
/// the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}

/// Client for a hosted PostgREST + GoTrue backend.
#[derive(Clone)]
pub struct SupabaseClient {
    base_url: Url,
    api_key: String,
    http_client: Client,
    sessions: FileSessionStore,
    session: Arc<Mutex<Option<StoredSession>>>,
}

impl SupabaseClient {
    pub fn new(base_url: Url, api_key: String, sessions: FileSessionStore) -> Result<Self> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let initial = sessions.load()?;
        Ok(Self {
            base_url,
            api_key,
            http_client,
            sessions,
            session: Arc::new(Mutex::new(initial)),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))?)
    }

    fn rest_url(&self, table: Table, params: &[(String, String)]) -> Result<Url> {
        let mut url = self.url(&format!("rest/v1/{}", table.name()))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status();
        debug!("{} -> {}", context, status);

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        let message = error_message(&body);
        error!("{} failed: status={}, message='{}'", context, status, message);
        Err(AppError::remote(context, Some(status.as_u16()), message))
    }

    async fn store_tokens(&self, token: TokenResponse) -> Result<AuthUser> {
        let stored = StoredSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at_unix_secs: Utc::now().timestamp() + token.expires_in,
            user: token.user,
        };
        self.sessions.save(&stored)?;
        let user = stored.user.clone();
        *self.session.lock().await = Some(stored);
        Ok(user)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredSession> {
        let mut url = self.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");
        let body = self
            .send(
                self.request(Method::POST, url, &self.api_key)
                    .json(&json!({ "refresh_token": refresh_token })),
                "refresh session",
            )
            .await?;
        let token: TokenResponse = serde_json::from_value(body)?;
        self.store_tokens(token).await?;
        info!("Refreshed session");
        self.session
            .lock()
            .await
            .clone()
            .ok_or(AppError::Unauthenticated)
    }

    /// Token for row requests: the signed-in user's access token, refreshed if
    /// close to expiry, or the anonymous key when nobody is signed in.
    async fn bearer(&self) -> Result<String> {
        let current = self.session.lock().await.clone();
        match current {
            Some(s) if !s.is_expired(REFRESH_BUFFER_SECS) => Ok(s.access_token),
            Some(s) => Ok(self.refresh(&s.refresh_token).await?.access_token),
            None => Ok(self.api_key.clone()),
        }
    }

    async fn drop_session(&self) -> Result<()> {
        *self.session.lock().await = None;
        self.sessions.clear()
    }

    /// Like `bearer`, but a refresh token the backend no longer accepts signs
    /// the user out and yields `None`.
    async fn bearer_or_signed_out(&self) -> Result<Option<String>> {
        match self.bearer().await {
            Ok(token) => Ok(Some(token)),
            Err(e) if rejects_session(&e, true) => {
                warn!("Refresh token was rejected; signing out");
                self.drop_session().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Whether `err` means the stored credentials are dead. The token endpoint
/// answers a bad refresh grant with 400.
fn rejects_session(err: &AppError, refresh: bool) -> bool {
    match err {
        AppError::RemoteQuery {
            status: Some(code), ..
        } => {
            *code == StatusCode::UNAUTHORIZED.as_u16()
                || *code == StatusCode::FORBIDDEN.as_u16()
                || (refresh && *code == StatusCode::BAD_REQUEST.as_u16())
        }
        _ => false,
    }
}

fn first_row(body: Value, context: &str) -> Result<Value> {
    match body {
        Value::Array(rows) => rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::remote(context, None, "no row returned")),
        other => Ok(other),
    }
}

#[async_trait]
impl RowStore for SupabaseClient {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let context = format!("select {}", query.table.name());
        let url = self.rest_url(query.table, &query.to_params())?;
        let bearer = self.bearer().await?;
        let body = self.send(self.request(Method::GET, url, &bearer), &context).await?;
        match body {
            Value::Array(rows) => {
                info!("{} returned {} rows", context, rows.len());
                Ok(rows)
            }
            Value::Null => Ok(Vec::new()),
            other => Err(AppError::remote(context, None, format!("unexpected body: {}", other))),
        }
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let context = format!("insert {}", table.name());
        let url = self.rest_url(table, &[])?;
        let bearer = self.bearer().await?;
        let builder = self
            .request(Method::POST, url, &bearer)
            .header("Prefer", "return=representation")
            .json(&row);
        first_row(self.send(builder, &context).await?, &context)
    }

    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Value> {
        let context = format!("update {}", table.name());
        let url = self.rest_url(table, &[("id".to_string(), format!("eq.{}", id))])?;
        let bearer = self.bearer().await?;
        let builder = self
            .request(Method::PATCH, url, &bearer)
            .header("Prefer", "return=representation")
            .json(&patch);
        first_row(self.send(builder, &context).await?, &context)
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        if self.session.lock().await.is_none() {
            return Ok(None);
        }
        let Some(bearer) = self.bearer_or_signed_out().await? else {
            return Ok(None);
        };
        let url = self.url("auth/v1/user")?;
        match self.send(self.request(Method::GET, url, &bearer), "get user").await {
            Ok(body) => Ok(Some(serde_json::from_value(body)?)),
            Err(e) if rejects_session(&e, false) => {
                warn!("Stored session was rejected; signing out");
                self.drop_session().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let mut url = self.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let body = self
            .send(
                self.request(Method::POST, url, &self.api_key)
                    .json(&json!({ "email": email, "password": password })),
                "sign in",
            )
            .await?;
        let token: TokenResponse = serde_json::from_value(body)?;
        let user = self.store_tokens(token).await?;
        info!("Signed in as {}", user.id);
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: &UserMetadata) -> Result<AuthUser> {
        let url = self.url("auth/v1/signup")?;
        let body = self
            .send(
                self.request(Method::POST, url, &self.api_key).json(&json!({
                    "email": email,
                    "password": password,
                    "data": metadata,
                })),
                "sign up",
            )
            .await?;
        match serde_json::from_value::<SignUpResponse>(body)? {
            SignUpResponse::Session(token) => self.store_tokens(token).await,
            SignUpResponse::User(user) => Ok(user),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.session.lock().await.as_ref().map(|s| s.access_token.clone());
        if let Some(token) = token {
            let url = self.url("auth/v1/logout")?;
            if let Err(e) = self.send(self.request(Method::POST, url, &token), "sign out").await {
                warn!("Remote sign-out failed, clearing local session anyway: {}", e);
            }
        }
        self.drop_session().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("logicore-rest-{}", Uuid::new_v4()))
    }

    fn expired_session() -> StoredSession {
        StoredSession {
            access_token: "old".into(),
            refresh_token: "gone".into(),
            expires_at_unix_secs: 0,
            user: AuthUser {
                id: "u1".into(),
                email: None,
                user_metadata: UserMetadata::default(),
            },
        }
    }

    /// Answers one HTTP request with `status` and `body`, handing back the
    /// request line it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length || n == 0 {
                        break;
                    }
                } else if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&received)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (base, handle)
    }

    fn client(base: &str) -> SupabaseClient {
        let dir = std::env::temp_dir().join(format!("logicore-rest-{}", Uuid::new_v4()));
        SupabaseClient::new(Url::parse(base).unwrap(), "anon".into(), FileSessionStore::new(dir)).unwrap()
    }

    #[test]
    fn test_rest_url_rendering() {
        let c = client("https://abc.supabase.co/");
        let q = Query::from(Table::DailyReports)
            .all_columns()
            .embed(Table::Profiles, None, &["name"])
            .eq("user_id", "u1")
            .order("report_date", false);
        let url = c.rest_url(q.table, &q.to_params()).unwrap();
        assert_eq!(url.path(), "/rest/v1/daily_reports");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, q.to_params());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message": "permission denied"}"#), "permission denied");
        assert_eq!(
            error_message(r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_sign_up_shapes() {
        let bare: SignUpResponse =
            serde_json::from_str(r#"{"id": "u1", "email": "a@b.c", "user_metadata": {"name": "A"}}"#).unwrap();
        assert!(matches!(bare, SignUpResponse::User(u) if u.id == "u1"));

        let session: SignUpResponse = serde_json::from_str(
            r#"{"access_token": "t", "refresh_token": "r", "expires_in": 3600, "user": {"id": "u2"}}"#,
        )
        .unwrap();
        assert!(matches!(session, SignUpResponse::Session(t) if t.user.id == "u2"));
    }

    #[tokio::test]
    async fn test_no_session_means_no_user() {
        let c = client("https://abc.supabase.co");
        assert!(c.current_user().await.unwrap().is_none());
        assert_eq!(c.bearer().await.unwrap(), "anon");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_refresh_signs_out() {
        let (base, server) = serve_once(
            "400 Bad Request",
            r#"{"error": "invalid_grant", "error_description": "Invalid Refresh Token: Refresh Token Not Found"}"#,
        )
        .await;
        let sessions = FileSessionStore::new(temp_dir());
        sessions.save(&expired_session()).unwrap();
        let c = SupabaseClient::new(Url::parse(&base).unwrap(), "anon".into(), sessions.clone()).unwrap();

        assert!(c.current_user().await.unwrap().is_none());
        assert!(sessions.load().unwrap().is_none());
        assert_eq!(c.bearer().await.unwrap(), "anon");

        let request_line = server.await.unwrap();
        assert!(
            request_line.starts_with("POST /auth/v1/token?grant_type=refresh_token"),
            "{}",
            request_line
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_outage_keeps_session() {
        let (base, server) = serve_once("503 Service Unavailable", r#"{"message": "down"}"#).await;
        let sessions = FileSessionStore::new(temp_dir());
        sessions.save(&expired_session()).unwrap();
        let c = SupabaseClient::new(Url::parse(&base).unwrap(), "anon".into(), sessions.clone()).unwrap();

        let err = c.current_user().await.unwrap_err();
        assert!(matches!(err, AppError::RemoteQuery { status: Some(503), .. }));
        assert!(sessions.load().unwrap().is_some());
        server.await.unwrap();
    }

    #[test]
    fn test_rejects_session_statuses() {
        let bad_request = AppError::remote("refresh session", Some(400), "invalid_grant");
        assert!(rejects_session(&bad_request, true));
        assert!(!rejects_session(&bad_request, false));
        assert!(rejects_session(&AppError::remote("get user", Some(401), "jwt expired"), false));
        assert!(!rejects_session(&AppError::remote("get user", Some(500), "boom"), false));
        assert!(!rejects_session(&AppError::Unauthenticated, true));
    }
}
