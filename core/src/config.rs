use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::holiday::JapaneseHolidays;

pub const ENV_PREFIX: &str = "LOGICORE_";
const DEFAULT_DIR_NAME: &str = ".logicore";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Rest,
    File,
}

/// Settings read from `LOGICORE_*` environment variables.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub store: StoreKind,
    /// Identity used by the file store.
    #[serde(default)]
    pub local_user: Option<String>,
    /// Extra company holidays, `YYYY-MM-DD` separated by commas.
    #[serde(default)]
    pub holidays: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<Config>()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Config>(pairs)
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_DIR_NAME))
                .ok_or_else(|| AppError::Config("Could not determine home directory".to_string())),
        }
    }

    /// Backend base URL and API key, both required by the REST store.
    pub fn backend(&self) -> Result<(Url, String)> {
        let raw = self
            .backend_url
            .as_deref()
            .ok_or_else(|| AppError::Config(format!("{}BACKEND_URL is not set", ENV_PREFIX)))?;
        let url = Url::parse(raw)?;
        let key = self
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config(format!("{}API_KEY is not set", ENV_PREFIX)))?;
        Ok((url, key))
    }

    pub fn holiday_dates(&self) -> Result<Vec<NaiveDate>> {
        self.holidays
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| AppError::Config(format!("invalid holiday date '{}'", s)))
            })
            .collect()
    }

    pub fn holiday_calendar(&self) -> Result<JapaneseHolidays> {
        Ok(JapaneseHolidays::with_extra(self.holiday_dates()?))
    }
}
