use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::query::{values_equal, Column, Query, Table};
use crate::repository::traits::RowStore;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| AppError::io(e, format!("Failed to open {:?}", path)))?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| AppError::io(e, format!("Failed to create {:?}", path)))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer
        .flush()
        .map_err(|e| AppError::io(e, format!("Failed to write {:?}", path)))?;
    Ok(())
}

/// Local snapshot of the backend: one `{table}.json` array per table.
#[derive(Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)
            .map_err(|e| AppError::io(e, format!("Failed to create data directory {:?}", base_dir)))?;

        for table in Table::ALL {
            let path = base_dir.join(format!("{}.json", table.name()));
            if !path.exists() {
                write_json(&path, &Vec::<Value>::new())?;
            }
        }

        Ok(FileStore {
            base_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn table_path(&self, table: Table) -> PathBuf {
        self.base_dir.join(format!("{}.json", table.name()))
    }

    fn read_rows(&self, table: Table) -> Result<Vec<Value>> {
        read_json(&self.table_path(table))
    }

    fn write_rows(&self, table: Table, rows: &[Value]) -> Result<()> {
        write_json(&self.table_path(table), rows)
    }

    fn next_id(rows: &[Value]) -> i64 {
        rows.iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn project(query: &Query, row: Value) -> Value {
        let fields: Vec<&str> = query
            .columns
            .iter()
            .filter_map(|c| match c {
                Column::Field(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        let keep_all = fields.is_empty() || query.columns.iter().any(|c| matches!(c, Column::All));
        if keep_all {
            return row;
        }
        match row {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(k, _)| fields.contains(&k.as_str()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Resolves `table(fields)` projections by following the foreign key
    /// between the two tables.
    fn embed(&self, query: &Query, rows: &mut [Value]) -> Result<()> {
        for (alias, target, fields) in query.embeds() {
            let (local, remote) = query.table.relation_to(*target).ok_or_else(|| {
                AppError::remote(
                    format!("select {}", query.table.name()),
                    None,
                    format!("no relationship to {}", target.name()),
                )
            })?;
            let targets = self.read_rows(*target)?;
            let key = alias.clone().unwrap_or_else(|| target.name().to_string());

            for row in rows.iter_mut() {
                let embedded = row
                    .get(local)
                    .and_then(|fk| {
                        targets
                            .iter()
                            .find(|t| t.get(remote).map_or(false, |id| values_equal(id, fk)))
                    })
                    .map(|t| pick(t, fields))
                    .unwrap_or(Value::Null);
                if let Value::Object(map) = row {
                    map.insert(key.clone(), embedded);
                }
            }
        }
        Ok(())
    }
}

fn pick(row: &Value, fields: &[String]) -> Value {
    if fields.iter().any(|f| f == "*") {
        return row.clone();
    }
    let mut out = Map::new();
    for field in fields {
        if let Some(v) = row.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    Value::Object(out)
}

#[async_trait]
impl RowStore for FileStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let mut rows: Vec<Value> = self
            .read_rows(query.table)?
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        query.sort_rows(&mut rows);
        if let Some(n) = query.limit {
            rows.truncate(n);
        }
        self.embed(query, &mut rows)?;
        debug!("File select on {} returned {} rows", query.table.name(), rows.len());
        Ok(rows.into_iter().map(|r| Self::project(query, r)).collect())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_rows(table)?;
        let mut row = match row {
            Value::Object(map) => map,
            _ => {
                return Err(AppError::remote(
                    format!("insert {}", table.name()),
                    None,
                    "row must be a JSON object",
                ))
            }
        };
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::from(Self::next_id(&rows)));
        }
        let row = Value::Object(row);
        rows.push(row.clone());
        self.write_rows(table, &rows)?;
        info!("Inserted row into {}", table.name());
        Ok(row)
    }

    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Value> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_rows(table)?;
        let target = Value::from(id);
        let pos = rows
            .iter()
            .position(|r| r.get("id").map_or(false, |v| values_equal(v, &target)))
            .ok_or_else(|| AppError::NotFound(format!("{} {}", table.name(), id)))?;

        if let (Value::Object(existing), Value::Object(changes)) = (&mut rows[pos], patch) {
            for (k, v) in changes {
                existing.insert(k, v);
            }
        }
        let updated = rows[pos].clone();
        self.write_rows(table, &rows)?;
        info!("Updated {} id={}", table.name(), id);
        Ok(updated)
    }
}
