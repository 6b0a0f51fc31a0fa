use crate::error::RateError;
use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;

/// How two readings are picked out of the 2-day lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    /// The two earliest readings in the window, whatever days they fall on
    #[default]
    WindowEarliest,
    /// One reading dated yesterday against one dated today
    StrictDays,
}

/// Day-over-day change per currency, keyed by currency id
///
/// Currencies with fewer than two readings in the window are absent from the
/// result. A zero earlier reading fails with DivisionByZero.
pub async fn diff_all(pool: &SqlitePool, mode: DiffMode) -> Result<HashMap<i64, String>> {
    let today = Local::now().date_naive();
    let yesterday = today - Days::new(1);

    let rows: Vec<(i64, String, f64, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT v.currency_id, c.code, v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        WHERE v.date BETWEEN ? AND ?
        ORDER BY v.currency_id, v.date, v.id
        "#,
    )
    .bind(yesterday)
    .bind(today)
    .fetch_all(pool)
    .await?;

    let mut diffs = HashMap::new();
    for (currency_id, code, readings) in group_by_currency(rows) {
        if let Some((v0, v1)) = pick_pair(mode, &readings, yesterday, today) {
            diffs.insert(currency_id, percent(&code, v0, v1)?);
        }
    }

    Ok(diffs)
}

/// Day-over-day change for a single currency code
///
/// Unlike the all-currencies mode this fails with NotEnoughData when the
/// window does not contain a usable pair of readings.
pub async fn diff_for_code(pool: &SqlitePool, code: &str, mode: DiffMode) -> Result<String> {
    let today = Local::now().date_naive();
    let yesterday = today - Days::new(1);

    let readings: Vec<(f64, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        WHERE c.code = ? AND v.date BETWEEN ? AND ?
        ORDER BY v.date, v.id
        "#,
    )
    .bind(code)
    .bind(yesterday)
    .bind(today)
    .fetch_all(pool)
    .await?;

    match pick_pair(mode, &readings, yesterday, today) {
        Some((v0, v1)) => Ok(percent(code, v0, v1)?),
        None => Err(RateError::NotEnoughData {
            code: code.to_string(),
            found: readings.len(),
        }
        .into()),
    }
}

/// Split a currency_id-ordered result set into per-currency windows
fn group_by_currency(
    rows: Vec<(i64, String, f64, NaiveDate)>,
) -> Vec<(i64, String, Vec<(f64, NaiveDate)>)> {
    let mut groups: Vec<(i64, String, Vec<(f64, NaiveDate)>)> = Vec::new();
    for (currency_id, code, value, date) in rows {
        match groups.last_mut() {
            Some((id, _, readings)) if *id == currency_id => readings.push((value, date)),
            _ => groups.push((currency_id, code, vec![(value, date)])),
        }
    }
    groups
}

fn pick_pair(
    mode: DiffMode,
    readings: &[(f64, NaiveDate)],
    yesterday: NaiveDate,
    today: NaiveDate,
) -> Option<(f64, f64)> {
    match mode {
        // index 0 and 1 of the ascending window: the two oldest readings,
        // not necessarily one per calendar day
        DiffMode::WindowEarliest => {
            if readings.len() >= 2 {
                Some((readings[0].0, readings[1].0))
            } else {
                None
            }
        }
        DiffMode::StrictDays => {
            let (v0, _) = readings.iter().find(|(_, date)| *date == yesterday)?;
            let (v1, _) = readings.iter().find(|(_, date)| *date == today)?;
            Some((*v0, *v1))
        }
    }
}

/// Percentage change of v1 relative to v0, rendered with a " %" suffix
fn percent(code: &str, v0: f64, v1: f64) -> Result<String, RateError> {
    if v0 == 0.0 {
        return Err(RateError::DivisionByZero {
            code: code.to_string(),
        });
    }
    Ok(format_percent((v1 - v0) / (v0 / 100.0)))
}

/// Round to 2 decimal places and render the shortest decimal form,
/// keeping at least one digit after the point ("10.0 %", "1.23 %")
fn format_percent(raw: f64) -> String {
    let rounded = (raw * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1} %", rounded)
    } else {
        format!("{} %", rounded)
    }
}
