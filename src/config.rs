use crate::diff::DiffMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_url: String,
    pub diff_mode: DiffMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: "sqlite://fx-report.db".to_string(),
            diff_mode: DiffMode::WindowEarliest,
        }
    }
}

fn get_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

pub fn load_config() -> anyhow::Result<Config> {
    let config_path = get_config_path();
    let config_str = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}
