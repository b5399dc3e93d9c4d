use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ValidationError;
use crate::model::project::ProjectRef;

pub const UNITS: [&str; 6] = ["kg", "本", "枚", "ヶ", "h", "個"];

/// A row of `purchase_orders`. `total_price` is computed by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    pub id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub item_name: String,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub ordered_by: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<ProjectRef>,
}

impl PurchaseOrder {
    pub fn to_draft(&self) -> OrderDraft {
        OrderDraft {
            project_id: self.project_id,
            item_name: self.item_name.clone(),
            spec: self.spec.clone(),
            note: self.note.clone(),
            quantity: self.quantity,
            unit: self.unit.clone(),
            unit_price: self.unit_price,
            order_date: self.order_date,
            ordered_by: self.ordered_by.clone(),
            weight: self.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderDraft {
    pub project_id: Option<i64>,
    pub item_name: String,
    pub spec: Option<String>,
    pub note: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub order_date: Option<NaiveDate>,
    pub ordered_by: Option<String>,
    pub weight: Option<f64>,
}

impl OrderDraft {
    pub fn new(order_date: NaiveDate) -> Self {
        Self {
            order_date: Some(order_date),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.is_none() {
            return Err(ValidationError::MissingField("project_id"));
        }
        if self.item_name.trim().is_empty() {
            return Err(ValidationError::MissingField("item_name"));
        }
        let quantity = self.quantity.ok_or(ValidationError::MissingField("quantity"))?;
        if !(quantity > 0.0) {
            return Err(ValidationError::NotPositive {
                field: "quantity",
                value: quantity,
            });
        }
        let unit = self.unit.as_deref().ok_or(ValidationError::MissingField("unit"))?;
        if !UNITS.contains(&unit) {
            return Err(ValidationError::InvalidValue {
                field: "unit",
                value: unit.to_string(),
            });
        }
        let unit_price = self
            .unit_price
            .ok_or(ValidationError::MissingField("unit_price"))?;
        if !(unit_price > 0.0) {
            return Err(ValidationError::NotPositive {
                field: "unit_price",
                value: unit_price,
            });
        }
        if let Some(weight) = self.weight {
            if weight < 0.0 {
                return Err(ValidationError::Negative {
                    field: "weight",
                    value: weight,
                });
            }
        }
        Ok(())
    }

    pub fn payload(&self) -> Value {
        json!({
            "project_id": self.project_id,
            "item_name": self.item_name,
            "spec": self.spec,
            "note": self.note,
            "quantity": self.quantity,
            "unit": self.unit,
            "unit_price": self.unit_price,
            "order_date": self.order_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "ordered_by": self.ordered_by,
            "weight": self.weight,
        })
    }
}
