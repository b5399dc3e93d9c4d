use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ValidationError;
use crate::model::identity::EmbeddedName;

/// Hours that make up one 人工 (man-day).
pub const HOURS_PER_MAN_DAY: f64 = 8.0;

/// A row of `daily_reports`. Hours are optional because older rows were
/// written without them; readers treat a missing value as zero.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub id: i64,
    pub report_date: NaiveDate,
    pub user_id: String,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub work_hours: Option<f64>,
    #[serde(default)]
    pub overtime_hours: Option<f64>,
    #[serde(default)]
    pub manpower: Option<f64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub purchase_order_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<EmbeddedName>,
}

impl Report {
    pub fn work(&self) -> f64 {
        self.work_hours.unwrap_or(0.0)
    }

    pub fn overtime(&self) -> f64 {
        self.overtime_hours.unwrap_or(0.0)
    }

    pub fn author_name(&self) -> Option<&str> {
        self.profiles.as_ref().and_then(|p| p.name())
    }

    /// Stored manpower when the backend computed it, otherwise derived from
    /// the hours on the row.
    pub fn manpower_or_derived(&self) -> f64 {
        self.manpower
            .unwrap_or_else(|| (self.work() + self.overtime()) / HOURS_PER_MAN_DAY)
    }

    pub fn to_draft(&self) -> ReportDraft {
        ReportDraft {
            report_date: Some(self.report_date),
            project_id: self.project_id,
            task_description: self.task_description.clone().unwrap_or_default(),
            work_hours: self.work(),
            overtime_hours: self.overtime(),
            note: self.note.clone(),
            purchase_order_id: self.purchase_order_id,
        }
    }
}

/// Form state for creating or editing a report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportDraft {
    pub report_date: Option<NaiveDate>,
    pub project_id: Option<i64>,
    pub task_description: String,
    pub work_hours: f64,
    pub overtime_hours: f64,
    pub note: Option<String>,
    pub purchase_order_id: Option<i64>,
}

impl ReportDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.report_date.is_none() {
            return Err(ValidationError::MissingField("report_date"));
        }
        if self.project_id.is_none() {
            return Err(ValidationError::MissingField("project_id"));
        }
        check_hours("work_hours", self.work_hours)?;
        check_hours("overtime_hours", self.overtime_hours)?;
        Ok(())
    }

    /// Row body sent to the store. `owner` is only set on insert; an edit
    /// never reassigns the report to whoever saved it.
    pub fn payload(&self, owner: Option<&str>) -> Value {
        let mut body = json!({
            "report_date": self.report_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "project_id": self.project_id,
            "task_description": self.task_description,
            "work_hours": self.work_hours,
            "overtime_hours": self.overtime_hours,
        });
        if let Some(note) = &self.note {
            body["note"] = json!(note);
        }
        if let Some(po) = self.purchase_order_id {
            body["purchase_order_id"] = json!(po);
        }
        if let Some(owner) = owner {
            body["user_id"] = json!(owner);
        }
        body
    }
}

fn check_hours(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}
