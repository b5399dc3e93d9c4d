use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Coarse classification surfaced to callers deciding how to react
/// (redirect to login, show a message, keep the form open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    ProfileMissing,
    RemoteQuery,
    Validation,
    Forbidden,
    NotFound,
    Local,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{field}' must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("field '{field}' must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("field '{field}' has an invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("ambiguous field '{key}' matches {candidates:?}")]
    AmbiguousField { key: String, candidates: Vec<String> },
    #[error("date is outside the supported calendar")]
    DateOutOfRange,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no authenticated session")]
    Unauthenticated,

    #[error("no profile row for user {0}")]
    ProfileMissing(String),

    #[error("{context} failed: status={status:?}, message='{message}'")]
    RemoteQuery {
        context: String,
        status: Option<u16>,
        message: String,
    },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("role '{role}' may not access {resource}")]
    Forbidden { role: String, resource: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn remote(context: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::RemoteQuery {
            context: context.into(),
            status,
            message: message.into(),
        }
    }

    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        AppError::Io {
            source,
            context: context.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Unauthenticated => ErrorKind::Unauthenticated,
            AppError::ProfileMissing(_) => ErrorKind::ProfileMissing,
            AppError::RemoteQuery { .. } | AppError::Http(_) | AppError::Json(_) => ErrorKind::RemoteQuery,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Forbidden { .. } => ErrorKind::Forbidden,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::UrlParse(_) | AppError::Io { .. } | AppError::Config(_) => ErrorKind::Local,
        }
    }

    /// Message shown to the person at the keyboard. Remote failures carry the
    /// backend's own text so the cause is visible without reading logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "ログインが必要です".to_string(),
            AppError::ProfileMissing(_) => "プロフィール取得に失敗しました".to_string(),
            AppError::RemoteQuery { message, .. } => format!("取得エラー: {}", message),
            AppError::Http(e) => format!("通信エラー: {}", e),
            AppError::Json(e) => format!("応答の解析に失敗しました: {}", e),
            AppError::Validation(ValidationError::MissingField(_)) => {
                "必須項目をすべて入力してください".to_string()
            }
            AppError::Validation(e) => format!("入力エラー: {}", e),
            AppError::Forbidden { .. } => "アクセス権限がありません。".to_string(),
            AppError::NotFound(what) => format!("{} が見つかりません", what),
            AppError::UrlParse(e) => format!("設定エラー: {}", e),
            AppError::Io { context, .. } => format!("ファイル操作に失敗しました: {}", context),
            AppError::Config(msg) => format!("設定エラー: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AppError::Unauthenticated.kind(), ErrorKind::Unauthenticated);
        assert_eq!(AppError::ProfileMissing("u1".into()).kind(), ErrorKind::ProfileMissing);
        assert_eq!(AppError::remote("select", Some(500), "boom").kind(), ErrorKind::RemoteQuery);
        assert_eq!(
            AppError::from(ValidationError::MissingField("item_name")).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_user_message() {
        assert_eq!(AppError::Unauthenticated.user_message(), "ログインが必要です");
        assert_eq!(
            AppError::from(ValidationError::MissingField("unit")).user_message(),
            "必須項目をすべて入力してください"
        );
        assert_eq!(
            AppError::remote("select daily_reports", Some(400), "bad filter").user_message(),
            "取得エラー: bad filter"
        );
        let missing = AppError::NotFound("日報 7".into());
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.user_message(), "日報 7 が見つかりません");
    }
}
