use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One record handed over by the upstream feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRecord {
    pub code: String,
    pub name: String,
    pub value: f64,
    pub date: NaiveDate,
}

/// A row of the currencies table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Currency {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// A currency joined with one of its readings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RateRow {
    pub currency_id: i64,
    pub code: String,
    pub name: String,
    pub value: f64,
    pub date: NaiveDate,
}

/// Dynamic field map consumed by the response formatter
pub type Row = HashMap<String, Value>;

impl Currency {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("code".to_string(), Value::String(self.code));
        row.insert("name".to_string(), Value::String(self.name));
        row
    }
}

impl RateRow {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("code".to_string(), Value::String(self.code));
        row.insert("name".to_string(), Value::String(self.name));
        row.insert("value".to_string(), Value::from(self.value));
        row.insert("date".to_string(), Value::String(self.date.to_string()));
        row
    }
}

/// Load a feed hand-off file: a JSON array of feed records
pub fn load_feed(path: &Path) -> Result<Vec<FeedRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read feed file {}", path.display()))?;
    let records: Vec<FeedRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse feed file {}", path.display()))?;
    Ok(records)
}
