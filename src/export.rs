use crate::models::RateRow;
use anyhow::Result;
use chrono::Local;
use csv::Writer;
use sqlx::sqlite::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};

/// Export every stored reading to a timestamped CSV file
pub async fn export_values_csv(pool: &SqlitePool, output_dir: &Path) -> Result<PathBuf> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)?;
    }

    let rows: Vec<RateRow> = sqlx::query_as(
        r#"
        SELECT v.currency_id, c.code, c.name, v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        ORDER BY v.date, v.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = output_dir.join(format!("rates_{}.csv", timestamp));
    let mut writer = Writer::from_path(&path)?;

    writer.write_record(["Code", "Name", "Value", "Date"])?;
    for row in &rows {
        writer.write_record([
            row.code.as_str(),
            row.name.as_str(),
            &row.value.to_string(),
            &row.date.to_string(),
        ])?;
    }
    writer.flush()?;

    println!("✅ {} readings written to {}", rows.len(), path.display());
    Ok(path)
}
