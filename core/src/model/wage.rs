use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ValidationError;
use crate::model::identity::EmbeddedName;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Wage {
    pub id: i64,
    pub user_id: String,
    pub hourly_wage: f64,
    #[serde(default)]
    pub overtime_wage: Option<f64>,
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<EmbeddedName>,
}

impl Wage {
    pub fn worker_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.name())
            .unwrap_or("不明")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WageDraft {
    pub user_id: String,
    pub hourly_wage: f64,
}

impl WageDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("user_id"));
        }
        validate_hourly_wage(self.hourly_wage)
    }

    pub fn payload(&self) -> Value {
        json!({
            "user_id": self.user_id,
            "hourly_wage": self.hourly_wage,
        })
    }
}

pub fn validate_hourly_wage(value: f64) -> Result<(), ValidationError> {
    if !(value > 0.0) {
        return Err(ValidationError::NotPositive {
            field: "hourly_wage",
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wage_draft() {
        let draft = WageDraft {
            user_id: "u1".to_string(),
            hourly_wage: 1500.0,
        };
        assert!(draft.validate().is_ok());

        let draft = WageDraft {
            user_id: String::new(),
            hourly_wage: 1500.0,
        };
        assert_eq!(draft.validate(), Err(ValidationError::MissingField("user_id")));

        assert!(validate_hourly_wage(0.0).is_err());
        assert!(validate_hourly_wage(f64::NAN).is_err());
    }

    #[test]
    fn test_worker_name_fallback() {
        let wage: Wage = serde_json::from_str(
            r#"{"id": 1, "user_id": "u1", "hourly_wage": 1200, "profile": {"name": "Kato"}}"#,
        )
        .unwrap();
        assert_eq!(wage.worker_name(), "Kato");

        let wage: Wage = serde_json::from_str(r#"{"id": 2, "user_id": "u2", "hourly_wage": 1200}"#).unwrap();
        assert_eq!(wage.worker_name(), "不明");
    }
}
