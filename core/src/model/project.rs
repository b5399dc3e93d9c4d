use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ValidationError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    pub project_no: i64,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub sales_rep: Option<String>,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub finish_type: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub drawing_staff: Option<String>,
    #[serde(default)]
    pub exploded_view_staff: Option<String>,
}

impl Project {
    pub fn to_draft(&self) -> ProjectDraft {
        let mut draft = ProjectDraft {
            project_no: Some(self.project_no),
            ..Default::default()
        };
        let text = [
            ("company_name", &self.company_name),
            ("project_name", &self.project_name),
            ("product_name", &self.product_name),
            ("sales_rep", &self.sales_rep),
            ("finish_type", &self.finish_type),
            ("creator", &self.creator),
            ("drawing_staff", &self.drawing_staff),
            ("exploded_view_staff", &self.exploded_view_staff),
        ];
        for (field, value) in text {
            if let Some(v) = value {
                draft.set_text(field, v);
            }
        }
        if let Some(d) = self.order_date {
            draft.set_date("order_date", d);
        }
        if let Some(d) = self.delivery_date {
            draft.set_date("delivery_date", d);
        }
        draft
    }

    pub fn summary(&self) -> ProjectRef {
        ProjectRef {
            id: self.id,
            project_no: self.project_no,
            project_name: self.project_name.clone(),
        }
    }
}

/// Summary embedded into order rows via `projects(id, project_no, project_name)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectRef {
    pub id: i64,
    pub project_no: i64,
    #[serde(default)]
    pub project_name: Option<String>,
}

impl ProjectRef {
    pub fn label(&self) -> String {
        format!(
            "No.{}：{}",
            self.project_no,
            self.project_name.as_deref().unwrap_or("")
        )
    }
}

pub const PROJECT_TEXT_FIELDS: [&str; 8] = [
    "company_name",
    "project_name",
    "product_name",
    "sales_rep",
    "finish_type",
    "creator",
    "drawing_staff",
    "exploded_view_staff",
];

pub const PROJECT_DATE_FIELDS: [&str; 2] = ["order_date", "delivery_date"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectDraft {
    pub project_no: Option<i64>,
    pub text: Map<String, Value>,
    pub dates: Map<String, Value>,
}

impl ProjectDraft {
    pub fn set_text(&mut self, field: &str, value: &str) {
        self.text.insert(field.to_string(), json!(value));
    }

    pub fn set_date(&mut self, field: &str, date: NaiveDate) {
        self.dates
            .insert(field.to_string(), json!(date.format("%Y-%m-%d").to_string()));
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_no.is_none() {
            return Err(ValidationError::MissingField("project_no"));
        }
        let name_present = self
            .text
            .get("project_name")
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !name_present {
            return Err(ValidationError::MissingField("project_name"));
        }
        Ok(())
    }

    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(no) = self.project_no {
            body.insert("project_no".to_string(), json!(no));
        }
        body.extend(self.text.clone());
        body.extend(self.dates.clone());
        Value::Object(body)
    }
}
