mod config;
mod db;
mod diff;
mod error;
mod export;
mod format;
mod models;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use diff::DiffMode;
use format::TableInput;
use models::{Currency, RateRow};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fx-report", about = "Store currency exchange rates and report them as text tables")]
struct Cli {
    /// Compare strictly yesterday's reading against today's
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSON feed file into the database
    Ingest { file: PathBuf },
    /// Show today's values for all currencies, with day-over-day change
    Today,
    /// List known currency codes and names
    Codes,
    /// Show today's value for one currency code
    Rate { code: String },
    /// Show values recorded on a given date (YYYY-MM-DD)
    Date { date: String },
    /// Export all stored readings to a CSV file
    Export,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_config().unwrap_or_default();
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| config.db_url.clone());
    let pool = db::create_db_pool(&db_url).await?;

    let mode = if cli.strict {
        DiffMode::StrictDays
    } else {
        config.diff_mode
    };

    match cli.command {
        Commands::Ingest { file } => {
            let records = models::load_feed(&file)?;
            let inserted = store::save_rates(&pool, &records).await?;
            println!("✅ {} readings saved", inserted.len());

            let rows = inserted.into_iter().map(RateRow::into_row).collect();
            println!(
                "{}",
                format::render(TableInput::Rows(rows), &["code", "name", "value", "date"])
            );
        }
        Commands::Today => {
            let rows = store::fetch_todays_values(&pool, mode).await?;
            println!(
                "{}",
                format::render(TableInput::Rows(rows), &["code", "name", "value", "diff"])
            );
        }
        Commands::Codes => {
            let rows = store::fetch_codes_and_names(&pool)
                .await?
                .into_iter()
                .map(Currency::into_row)
                .collect();
            println!("{}", format::render(TableInput::Rows(rows), &["code", "name"]));
        }
        Commands::Rate { code } => {
            match store::fetch_todays_value_by_code(&pool, &code, mode).await? {
                Some(row) => println!(
                    "{}",
                    format::render(TableInput::Row(row), &["code", "name", "value", "diff"])
                ),
                None => println!("{}", format::render_not_found()),
            }
        }
        Commands::Date { date } => {
            let rows = store::fetch_values_by_date(&pool, &date)
                .await?
                .into_iter()
                .map(RateRow::into_row)
                .collect();
            println!(
                "{}",
                format::render(TableInput::Rows(rows), &["code", "name", "value", "date"])
            );
        }
        Commands::Export => {
            export::export_values_csv(&pool, Path::new("output")).await?;
        }
    }

    Ok(())
}
