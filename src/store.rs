use crate::diff::{self, DiffMode};
use crate::error::RateError;
use crate::models::{Currency, FeedRecord, RateRow, Row};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;

/// Save a feed batch: upsert currencies, append one reading per matched code
///
/// Runs as a single transaction. Currencies already in the table that have no
/// matching record in the batch are silently skipped. Returns the inserted
/// readings joined back with their currency fields.
pub async fn save_rates(pool: &SqlitePool, records: &[FeedRecord]) -> Result<Vec<RateRow>> {
    let (last_value_id,): (i64,) = sqlx::query_as(r#"SELECT COALESCE(MAX(id), 0) FROM "values""#)
        .fetch_one(pool)
        .await?;

    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO currencies (code, name)
            VALUES (?, ?)
            ON CONFLICT(code) DO NOTHING
            "#,
        )
        .bind(&record.code)
        .bind(&record.name)
        .execute(&mut *tx)
        .await?;
    }

    let currencies: Vec<Currency> = sqlx::query_as(
        r#"
        SELECT id, code, name
        FROM currencies
        ORDER BY id
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    for currency in &currencies {
        // first matching record in the batch wins
        if let Some(record) = records.iter().find(|r| r.code == currency.code) {
            sqlx::query(r#"INSERT INTO "values" (value, date, currency_id) VALUES (?, ?, ?)"#)
                .bind(record.value)
                .bind(record.date)
                .bind(currency.id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    let inserted: Vec<RateRow> = sqlx::query_as(
        r#"
        SELECT v.currency_id, c.code, c.name, v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        WHERE v.id > ?
        ORDER BY v.id
        "#,
    )
    .bind(last_value_id)
    .fetch_all(pool)
    .await?;

    Ok(inserted)
}

/// Today's readings for all currencies, enriched with a day-over-day diff
///
/// Currencies with fewer than two readings in the lookback window get no
/// diff field.
pub async fn fetch_todays_values(pool: &SqlitePool, mode: DiffMode) -> Result<Vec<Row>> {
    let today = Local::now().date_naive();

    let rows: Vec<RateRow> = sqlx::query_as(
        r#"
        SELECT v.currency_id, c.code, c.name, v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        WHERE v.date = ?
        ORDER BY v.id
        "#,
    )
    .bind(today)
    .fetch_all(pool)
    .await?;

    let diffs = diff::diff_all(pool, mode).await?;

    Ok(rows
        .into_iter()
        .map(|rate| {
            let currency_id = rate.currency_id;
            let mut row = rate.into_row();
            if let Some(diff) = diffs.get(&currency_id) {
                row.insert("diff".to_string(), Value::String(diff.clone()));
            }
            row
        })
        .collect())
}

/// List all currencies in first-seen order
pub async fn fetch_codes_and_names(pool: &SqlitePool) -> Result<Vec<Currency>> {
    let currencies: Vec<Currency> = sqlx::query_as(
        r#"
        SELECT id, code, name
        FROM currencies
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(currencies)
}

/// Today's reading for one currency code, enriched with its diff
///
/// Unknown codes yield None. A known code with fewer than two readings in
/// the window fails with NotEnoughData, since the diff is explicitly
/// requested here.
pub async fn fetch_todays_value_by_code(
    pool: &SqlitePool,
    code: &str,
    mode: DiffMode,
) -> Result<Option<Row>> {
    let today = Local::now().date_naive();

    let rate: Option<RateRow> = sqlx::query_as(
        r#"
        SELECT v.currency_id, c.code, c.name, v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        WHERE v.date = ? AND c.code = ?
        ORDER BY v.id
        LIMIT 1
        "#,
    )
    .bind(today)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    match rate {
        None => Ok(None),
        Some(rate) => {
            let diff = diff::diff_for_code(pool, code, mode).await?;
            let mut row = rate.into_row();
            row.insert("diff".to_string(), Value::String(diff));
            Ok(Some(row))
        }
    }
}

/// Readings recorded on an arbitrary date, parsed from a date-like string
pub async fn fetch_values_by_date(pool: &SqlitePool, date: &str) -> Result<Vec<RateRow>> {
    let date: NaiveDate = date.parse().map_err(|source| RateError::InvalidDate {
        input: date.to_string(),
        source,
    })?;

    let rows: Vec<RateRow> = sqlx::query_as(
        r#"
        SELECT v.currency_id, c.code, c.name, v.value, v.date
        FROM "values" v
        JOIN currencies c ON c.id = v.currency_id
        WHERE v.date = ?
        ORDER BY v.id
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use approx::assert_relative_eq;
    use chrono::Days;

    fn record(code: &str, name: &str, value: f64, date: NaiveDate) -> FeedRecord {
        FeedRecord {
            code: code.to_string(),
            name: name.to_string(),
            value,
            date,
        }
    }

    fn batch(date: NaiveDate) -> Vec<FeedRecord> {
        vec![
            record("USD", "US Dollar", 1.0823, date),
            record("GBP", "Pound Sterling", 0.8564, date),
            record("JPY", "Japanese Yen", 159.31, date),
        ]
    }

    #[tokio::test]
    async fn test_ingest_populates_currencies_in_first_seen_order() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();

        let inserted = save_rates(&pool, &batch(today)).await?;
        assert_eq!(inserted.len(), 3);

        let currencies = fetch_codes_and_names(&pool).await?;
        let codes: Vec<&str> = currencies.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["USD", "GBP", "JPY"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_reingest_appends_values_without_new_currencies() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();

        save_rates(&pool, &batch(today)).await?;
        save_rates(&pool, &batch(today)).await?;

        let currencies = fetch_codes_and_names(&pool).await?;
        assert_eq!(currencies.len(), 3);

        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "values""#)
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 6);

        Ok(())
    }

    #[tokio::test]
    async fn test_late_codes_are_upserted() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();

        save_rates(&pool, &batch(today)).await?;
        save_rates(&pool, &[record("CHF", "Swiss Franc", 0.9512, today)]).await?;

        let currencies = fetch_codes_and_names(&pool).await?;
        let codes: Vec<&str> = currencies.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["USD", "GBP", "JPY", "CHF"]);

        // the CHF-only batch adds no readings for the other currencies
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "values""#)
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 4);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_codes_in_batch_first_match_wins() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();

        let inserted = save_rates(
            &pool,
            &[
                record("USD", "US Dollar", 1.08, today),
                record("USD", "US Dollar again", 9.99, today),
            ],
        )
        .await?;

        assert_eq!(inserted.len(), 1);
        assert_relative_eq!(inserted[0].value, 1.08);
        assert_eq!(fetch_codes_and_names(&pool).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_todays_values_match_ingested_batch() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();

        save_rates(&pool, &batch(today)).await?;

        let rows = fetch_todays_values(&pool, DiffMode::WindowEarliest).await?;
        assert_eq!(rows.len(), 3);

        let usd = rows
            .iter()
            .find(|r| r["code"] == "USD")
            .expect("USD row missing");
        assert_eq!(usd["name"], "US Dollar");
        assert_relative_eq!(usd["value"].as_f64().unwrap(), 1.0823);
        // a single reading per currency: no diff enrichment
        assert!(!usd.contains_key("diff"));

        Ok(())
    }

    #[tokio::test]
    async fn test_todays_values_carry_diff_when_available() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();
        let yesterday = today - Days::new(1);

        save_rates(&pool, &[record("USD", "US Dollar", 100.0, yesterday)]).await?;
        save_rates(&pool, &[record("USD", "US Dollar", 110.0, today)]).await?;

        let rows = fetch_todays_values(&pool, DiffMode::WindowEarliest).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["diff"], "10.0 %");

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_by_code() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();
        let yesterday = today - Days::new(1);

        save_rates(&pool, &batch(yesterday)).await?;
        save_rates(&pool, &batch(today)).await?;

        let row = fetch_todays_value_by_code(&pool, "GBP", DiffMode::WindowEarliest)
            .await?
            .expect("GBP row missing");
        assert_eq!(row["code"], "GBP");
        assert_eq!(row["diff"], "0.0 %");

        // unknown code is an empty result, not an error
        let missing = fetch_todays_value_by_code(&pool, "XXX", DiffMode::WindowEarliest).await?;
        assert!(missing.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_by_code_fails_without_history() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let today = Local::now().date_naive();

        save_rates(&pool, &[record("USD", "US Dollar", 1.08, today)]).await?;

        let err = fetch_todays_value_by_code(&pool, "USD", DiffMode::WindowEarliest)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::NotEnoughData { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_values_by_date() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();

        save_rates(&pool, &batch(date)).await?;

        let rows = fetch_values_by_date(&pool, "2026-08-20").await?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, date);

        let empty = fetch_values_by_date(&pool, "2026-08-21").await?;
        assert!(empty.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_date_is_rejected() -> Result<()> {
        let pool = db::create_test_pool().await?;

        let err = fetch_values_by_date(&pool, "today-ish").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::InvalidDate { .. })
        ));

        Ok(())
    }
}
