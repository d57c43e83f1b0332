use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::parser::records::DEFAULT_MASTHEAD;

pub const ENV_PREFIX: &str = "CAUSELIST";

const DEFAULT_LISTING_URL: &str = "https://www.sci.gov.in/cause-list/";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listing_url: String,
    pub db_path: PathBuf,
    pub csv_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// 0 keeps cached listing entries forever.
    pub cache_ttl_secs: u64,
    pub masthead: String,
    pub listing_year: Option<i32>,
    /// `MM/DD/YYYY`, today when unset.
    pub hit_date: Option<String>,
}

impl Settings {
    /// Defaults, overridden by `.env` and `CAUSELIST_*` environment variables.
    pub fn load() -> Result<Settings> {
        let _ = dotenvy::dotenv();
        Self::from_builder(
            Config::builder().add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Settings> {
        builder
            .set_default("listing_url", DEFAULT_LISTING_URL)?
            .set_default("db_path", "data/causelist.sqlite")?
            .set_default("csv_path", "causelist_data.csv")?
            .set_default("snapshot_dir", "causelist/pdf/supreme_court")?
            .set_default("concurrency", 8)?
            .set_default("max_attempts", 3)?
            .set_default("retry_backoff_secs", 5)?
            .set_default("timeout_secs", 60)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("cache_ttl_secs", 0)?
            .set_default("masthead", DEFAULT_MASTHEAD)?
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// Hit date with `/` swapped for `-`, for file names.
    pub fn hit_date_slug(&self) -> String {
        self.hit_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%m/%d/%Y").to_string())
            .replace('/', "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::from_builder(Config::builder()).unwrap();
        assert_eq!(s.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(s.concurrency, 8);
        assert_eq!(s.max_attempts, 3);
        assert_eq!(s.masthead, "SUPREME COURT OF INDIA");
        assert_eq!(s.cache_ttl(), None);
        assert_eq!(s.listing_year, None);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let builder = Config::builder()
            .set_override("concurrency", 2)
            .unwrap()
            .set_override("cache_ttl_secs", 60)
            .unwrap()
            .set_override("hit_date", "10/16/2024")
            .unwrap();
        let s = Settings::from_builder(builder).unwrap();
        assert_eq!(s.concurrency, 2);
        assert_eq!(s.cache_ttl(), Some(Duration::from_secs(60)));
        assert_eq!(s.hit_date_slug(), "10-16-2024");
    }
}
