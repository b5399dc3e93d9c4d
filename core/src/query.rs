use std::cmp::Ordering;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::model::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    DailyReports,
    Profiles,
    Projects,
    PurchaseOrders,
    Wages,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::DailyReports,
        Table::Profiles,
        Table::Projects,
        Table::PurchaseOrders,
        Table::Wages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::DailyReports => "daily_reports",
            Table::Profiles => "profiles",
            Table::Projects => "projects",
            Table::PurchaseOrders => "purchase_orders",
            Table::Wages => "wages",
        }
    }

    /// Foreign key used to embed `target` into rows of `self`, as
    /// (local column, target column).
    pub fn relation_to(&self, target: Table) -> Option<(&'static str, &'static str)> {
        match (self, target) {
            (Table::DailyReports, Table::Profiles) => Some(("user_id", "id")),
            (Table::DailyReports, Table::Projects) => Some(("project_id", "id")),
            (Table::PurchaseOrders, Table::Projects) => Some(("project_id", "id")),
            (Table::Wages, Table::Profiles) => Some(("user_id", "id")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    All,
    Field(String),
    Embed {
        alias: Option<String>,
        table: Table,
        fields: Vec<String>,
    },
}

impl Column {
    fn render(&self) -> String {
        match self {
            Column::All => "*".to_string(),
            Column::Field(name) => name.clone(),
            Column::Embed { alias, table, fields } => {
                let inner = fields.join(",");
                match alias {
                    Some(alias) => format!("{}:{}({})", alias, table.name(), inner),
                    None => format!("{}({})", table.name(), inner),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gte,
    Lte,
}

impl Op {
    fn prefix(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Gte => "gte",
            Op::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

impl Filter {
    fn matches(&self, row: &Value) -> bool {
        let cell = match row.get(&self.column) {
            Some(cell) => cell,
            None => return false,
        };
        match (compare(cell, &self.value), self.op) {
            (Some(Ordering::Equal), _) => true,
            (Some(Ordering::Greater), Op::Gte) => true,
            (Some(Ordering::Less), Op::Lte) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A read against one table, described but not executed. Stores either render
/// it to request parameters or evaluate it against rows they hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub columns: Vec<Column>,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn all_columns(mut self) -> Self {
        self.columns.push(Column::All);
        self
    }

    pub fn columns(mut self, names: &[&str]) -> Self {
        self.columns
            .extend(names.iter().map(|n| Column::Field(n.to_string())));
        self
    }

    pub fn embed(mut self, table: Table, alias: Option<&str>, fields: &[&str]) -> Self {
        self.columns.push(Column::Embed {
            alias: alias.map(str::to_string),
            table,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Eq, value.into())
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Gte, value.into())
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Lte, value.into())
    }

    fn filter(mut self, column: &str, op: Op, value: Value) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn embeds(&self) -> impl Iterator<Item = (&Option<String>, &Table, &Vec<String>)> {
        self.columns.iter().filter_map(|c| match c {
            Column::Embed { alias, table, fields } => Some((alias, table, fields)),
            _ => None,
        })
    }

    pub fn select_clause(&self) -> String {
        if self.columns.is_empty() {
            return "*".to_string();
        }
        self.columns
            .iter()
            .map(Column::render)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// PostgREST query string pairs, in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select_clause())];
        for f in &self.filters {
            params.push((
                f.column.clone(),
                format!("{}.{}", f.op.prefix(), render_value(&f.value)),
            ));
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Sorts rows by the query's ordering; nulls and missing cells sort last.
    pub fn sort_rows(&self, rows: &mut [Value]) {
        if self.order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for o in &self.order {
                let ord = match (a.get(&o.column), b.get(&o.column)) {
                    (Some(x), Some(y)) if !x.is_null() && !y.is_null() => {
                        let ord = compare(x, y).unwrap_or(Ordering::Equal);
                        if o.ascending {
                            ord
                        } else {
                            ord.reverse()
                        }
                    }
                    (Some(x), _) if !x.is_null() => Ordering::Less,
                    (_, Some(y)) if !y.is_null() => Ordering::Greater,
                    _ => Ordering::Equal,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    /// Filter values of `column` compared with `eq`.
    pub fn equality_values(&self, column: &str) -> Vec<&Value> {
        self.filters
            .iter()
            .filter(|f| f.column == column && f.op == Op::Eq)
            .map(|f| &f.value)
            .collect()
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality as filters see it: `7` and `"7"` are the same key.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Inclusive calendar-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Whose reports a query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    Own(String),
    All,
}

impl ReportScope {
    pub fn for_identity(identity: &Identity) -> Self {
        if identity.role.sees_all_reports() {
            ReportScope::All
        } else {
            ReportScope::Own(identity.user_id.clone())
        }
    }
}

/// Reads `daily_reports` with the author's name embedded, narrowed to the
/// identity's own rows unless its role sees everyone's, and to `window` when
/// given.
pub fn scoped_report_query(identity: &Identity, window: Option<DateWindow>) -> Query {
    let mut query = Query::from(Table::DailyReports)
        .all_columns()
        .embed(Table::Profiles, None, &["name"]);

    let scope = ReportScope::for_identity(identity);
    if let ReportScope::Own(user_id) = &scope {
        query = query.eq("user_id", user_id.as_str());
    }
    if let Some(w) = window {
        query = query
            .gte("report_date", w.start.format("%Y-%m-%d").to_string())
            .lte("report_date", w.end.format("%Y-%m-%d").to_string());
    }
    debug!(
        "Scoped report query for {} ({}): {:?}, window={:?}",
        identity.user_id, identity.role, scope, window
    );
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_non_elevated_roles_only_see_themselves() {
        for role in [Role::Worker, Role::Sales, Role::Unrecognized] {
            let me = Identity::new("me", "Me", role);
            let q = scoped_report_query(&me, None);
            let subjects = q.equality_values("user_id");
            assert_eq!(subjects, vec![&json!("me")], "role {:?}", role);
        }
    }

    #[test]
    fn test_staff_has_no_subject_filter() {
        let staff = Identity::new("s1", "Staff", Role::Staff);
        let q = scoped_report_query(&staff, None);
        assert!(q.equality_values("user_id").is_empty());
        assert!(q.filters.is_empty());
    }

    #[test]
    fn test_params_rendering() {
        let me = Identity::new("u-1", "Me", Role::Worker);
        let window = DateWindow::new(d("2024-06-01"), d("2024-06-30"));
        let q = scoped_report_query(&me, Some(window)).order("report_date", false);
        assert_eq!(
            q.to_params(),
            vec![
                ("select".to_string(), "*,profiles(name)".to_string()),
                ("user_id".to_string(), "eq.u-1".to_string()),
                ("report_date".to_string(), "gte.2024-06-01".to_string()),
                ("report_date".to_string(), "lte.2024-06-30".to_string()),
                ("order".to_string(), "report_date.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_aliased_embed_and_limit() {
        let q = Query::from(Table::Wages)
            .all_columns()
            .embed(Table::Profiles, Some("profile"), &["name"])
            .eq("id", 4)
            .limit(1);
        let params = q.to_params();
        assert_eq!(params[0].1, "*,profile:profiles(name)");
        assert_eq!(params[1], ("id".to_string(), "eq.4".to_string()));
        assert_eq!(params[2], ("limit".to_string(), "1".to_string()));
    }

    #[test]
    fn test_local_matching() {
        let q = Query::from(Table::DailyReports)
            .eq("user_id", "u1")
            .gte("report_date", "2024-06-01")
            .lte("report_date", "2024-06-30");
        assert!(q.matches(&json!({"user_id": "u1", "report_date": "2024-06-30"})));
        assert!(!q.matches(&json!({"user_id": "u1", "report_date": "2024-07-01"})));
        assert!(!q.matches(&json!({"user_id": "u2", "report_date": "2024-06-10"})));
        assert!(!q.matches(&json!({"report_date": "2024-06-10"})));

        let by_id = Query::from(Table::Projects).eq("id", "7");
        assert!(by_id.matches(&json!({"id": 7})));
    }

    #[test]
    fn test_sort_rows_nulls_last() {
        let q = Query::from(Table::PurchaseOrders).order("order_date", false);
        let mut rows = vec![
            json!({"id": 1, "order_date": "2024-05-01"}),
            json!({"id": 2, "order_date": null}),
            json!({"id": 3, "order_date": "2024-06-01"}),
        ];
        q.sort_rows(&mut rows);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
