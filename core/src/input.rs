use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::model::order::OrderDraft;
use crate::model::project::ProjectDraft;
use crate::model::report::ReportDraft;
use crate::time::parse_report_date;

#[derive(Debug, PartialEq)]
pub struct ParsedInput {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// Splits `key:value` arguments from free text.
pub fn parse_args(args: &[String]) -> ParsedInput {
    let mut text_parts = Vec::new();
    let mut metadata = HashMap::new();

    for arg in args {
        if let Some((key, value)) = arg.split_once(':') {
            if !key.is_empty() {
                metadata.insert(key.to_string(), value.to_string());
                continue;
            }
        }
        text_parts.push(arg.as_str());
    }

    ParsedInput {
        text: text_parts.join(" "),
        metadata,
    }
}

pub fn expand_key<'a>(key: &str, candidates: &[&'a str]) -> Result<&'a str, ValidationError> {
    // 1. Exact match
    if let Some(exact) = candidates.iter().find(|&&c| c == key) {
        return Ok(exact);
    }

    // 2. Prefix match
    let matches: Vec<&'a str> = candidates
        .iter()
        .filter(|&&c| c.starts_with(key))
        .cloned()
        .collect();

    match matches.len() {
        1 => Ok(matches[0]),
        0 => Err(ValidationError::UnknownField(key.to_string())),
        _ => Err(ValidationError::AmbiguousField {
            key: key.to_string(),
            candidates: matches.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

/// Resolves every metadata key against `candidates`, in a stable order.
fn resolved<'a>(
    parsed: &'a ParsedInput,
    candidates: &[&'static str],
) -> Result<Vec<(&'static str, &'a str)>, ValidationError> {
    let mut fields = Vec::new();
    for (key, value) in &parsed.metadata {
        fields.push((expand_key(key, candidates)?, value.as_str()));
    }
    fields.sort_by_key(|(k, _)| *k);
    Ok(fields)
}

fn number(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidValue {
            field,
            value: value.to_string(),
        })
}

fn integer(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value.trim().parse::<i64>().map_err(|_| ValidationError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn iso_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub const REPORT_KEYS: [&str; 7] = ["date", "project", "task", "work", "overtime", "note", "po"];

/// Applies `date:` `project:` `task:` `work:` `overtime:` `note:` `po:`.
/// Free text becomes the task description unless `task:` is given.
pub fn apply_report_fields(
    draft: &mut ReportDraft,
    parsed: &ParsedInput,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if !parsed.text.is_empty() {
        draft.task_description = parsed.text.clone();
    }
    for (key, value) in resolved(parsed, &REPORT_KEYS)? {
        match key {
            "date" => draft.report_date = Some(parse_report_date(value, today)?),
            "project" => draft.project_id = Some(integer("project_id", value)?),
            "task" => draft.task_description = value.to_string(),
            "work" => draft.work_hours = number("work_hours", value)?,
            "overtime" => draft.overtime_hours = number("overtime_hours", value)?,
            "note" => draft.note = optional_text(value),
            "po" => {
                draft.purchase_order_id = match value.trim() {
                    "" => None,
                    v => Some(integer("purchase_order_id", v)?),
                }
            }
            other => return Err(ValidationError::UnknownField(other.to_string())),
        }
    }
    Ok(())
}

pub const ORDER_KEYS: [&str; 10] = [
    "project", "item", "spec", "note", "quantity", "unit", "price", "date", "by", "weight",
];

/// Free text becomes the item name unless `item:` is given.
pub fn apply_order_fields(draft: &mut OrderDraft, parsed: &ParsedInput) -> Result<(), ValidationError> {
    if !parsed.text.is_empty() {
        draft.item_name = parsed.text.clone();
    }
    for (key, value) in resolved(parsed, &ORDER_KEYS)? {
        match key {
            "project" => draft.project_id = Some(integer("project_id", value)?),
            "item" => draft.item_name = value.to_string(),
            "spec" => draft.spec = optional_text(value),
            "note" => draft.note = optional_text(value),
            "quantity" => draft.quantity = Some(number("quantity", value)?),
            "unit" => draft.unit = optional_text(value),
            "price" => draft.unit_price = Some(number("unit_price", value)?),
            "date" => draft.order_date = Some(iso_date("order_date", value)?),
            "by" => draft.ordered_by = optional_text(value),
            "weight" => draft.weight = Some(number("weight", value)?),
            other => return Err(ValidationError::UnknownField(other.to_string())),
        }
    }
    Ok(())
}

pub const PROJECT_KEYS: [&str; 11] = [
    "no", "company", "name", "product", "sales", "ordered", "finish", "creator", "delivery", "drawing", "exploded",
];

/// Free text becomes the project name unless `name:` is given.
pub fn apply_project_fields(draft: &mut ProjectDraft, parsed: &ParsedInput) -> Result<(), ValidationError> {
    if !parsed.text.is_empty() {
        draft.set_text("project_name", &parsed.text);
    }
    for (key, value) in resolved(parsed, &PROJECT_KEYS)? {
        match key {
            "no" => draft.project_no = Some(integer("project_no", value)?),
            "ordered" => draft.set_date("order_date", iso_date("order_date", value)?),
            "delivery" => draft.set_date("delivery_date", iso_date("delivery_date", value)?),
            text => {
                let column = match text {
                    "company" => "company_name",
                    "name" => "project_name",
                    "product" => "product_name",
                    "sales" => "sales_rep",
                    "finish" => "finish_type",
                    "creator" => "creator",
                    "drawing" => "drawing_staff",
                    _ => "exploded_view_staff",
                };
                draft.set_text(column, value.trim());
            }
        }
    }
    Ok(())
}
