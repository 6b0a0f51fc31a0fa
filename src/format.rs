use crate::models::Row;
use chrono::Local;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

pub const LOGO: &str = "\
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
░░██░█░█░██░█░█░███░██░░█░███░██░███░░░░
░░█░░█░█░█░░█░█░█░█░███░█░█░░░█░░█░█░░░░
░░██░░█░░█░░███░███░█░███░█░░░██░███░░░░
░░█░░█░█░█░░█░█░█░█░█░░██░█░█░█░░██░░░░░
░░██░█░█░██░█░█░█░█░█░░██░███░██░█░█░░░░
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░";

pub const NOT_FOUND: &str = "\
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
░░░░░░░█░░░█░░█████░░█░░░█░░░░░░░░░░░
░░░░░░░█░░░█░░█░░░█░░█░░░█░░░░░░░░░░░
░░░░░░░█░░░█░░█░░░█░░█░░░█░░░░░░░░░░░
░░░░░░░█████░░█░░░█░░█████░░░░░░░░░░░
░░░░░░░░░░░█░░█░░░█░░░░░░█░░░░░░░░░░░
░░░░░░░░░░░█░░█░░░█░░░░░░█░░░░░░░░░░░
░░░░░░░░░░░█░░█████░░░░░░█░░░░░░░░░░░
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░";

/// What the formatter accepts: one row or a whole result set
pub enum TableInput {
    Row(Row),
    Rows(Vec<Row>),
}

/// Column set resolved once for the whole batch
enum Projection<'a> {
    Requested(&'a [&'a str]),
    /// Minimal fixed set used when any row lacks a requested field
    Fallback,
}

const FALLBACK_FIELDS: [&str; 3] = ["code", "name", "rate"];

impl<'a> Projection<'a> {
    fn resolve(rows: &[Row], fields: &'a [&'a str]) -> Self {
        let complete = rows
            .iter()
            .all(|row| fields.iter().all(|field| row.contains_key(*field)));
        if complete {
            Projection::Requested(fields)
        } else {
            Projection::Fallback
        }
    }

    fn fields(&self) -> &[&str] {
        match self {
            Projection::Requested(fields) => fields,
            Projection::Fallback => &FALLBACK_FIELDS,
        }
    }
}

/// Render rows as a banner, a bordered table and a timestamp line
///
/// An empty result set renders the not-found banner with no table body.
pub fn render(input: TableInput, fields: &[&str]) -> String {
    let mut rows = match input {
        TableInput::Row(row) => vec![row],
        TableInput::Rows(rows) => rows,
    };

    if rows.is_empty() {
        return render_not_found();
    }

    for row in &mut rows {
        coerce(row, fields);
    }

    let projection = Projection::resolve(&rows, fields);
    let table = draw_table(&rows, projection.fields());

    format!("{}\n\n{}\n\n{}\n", LOGO, table, timestamp())
}

/// The not-found variant: both banners, no table
pub fn render_not_found() -> String {
    format!("{}\n\n{}\n\n{}\n", LOGO, NOT_FOUND, timestamp())
}

/// Field-specific coercions applied before projection
fn coerce(row: &mut Row, fields: &[&str]) {
    if fields.contains(&"date") {
        if let Some(date) = row.get("date") {
            if !date.is_string() {
                let date = Value::String(date.to_string());
                row.insert("date".to_string(), date);
            }
        }
    }
    for key in ["rate", "value"] {
        if fields.contains(&key) {
            if let Some(number) = row.get(key).and_then(Value::as_f64) {
                let rounded = (number * 100.0).round() / 100.0;
                row.insert(key.to_string(), Value::from(rounded));
            }
        }
    }
}

fn draw_table(rows: &[Row], fields: &[&str]) -> String {
    let mut builder = Builder::default();
    builder.push_record(fields.iter().copied());
    for row in rows {
        builder.push_record(fields.iter().map(|field| cell(row.get(*field))));
    }

    let mut table = builder.build();
    // plain ascii borders with a separator after every row
    table.with(Style::ascii());
    table.to_string()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}
