use crate::common::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_DROP_LEADING_COLUMNS, DEFAULT_ENDPOINT_SUFFIX,
    DEFAULT_EXPORT_PREFIX, DEFAULT_OUTPUT_DIR, DEFAULT_SAS_TTL_MINUTES, ENV_ACCOUNT_KEY,
    ENV_ACCOUNT_NAME, ENV_CONFIG_PATH, ENV_DATA_CONTAINER, TS_COLUMN,
};
use crate::common::error::{FetchError, Result};
use chrono::Duration;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Credentials and addressing for the storage account holding ship data.
///
/// Built once at startup and handed to the storage adapter; nothing reads
/// the environment after that.
#[derive(Clone, PartialEq, Eq)]
pub struct DataLakeConfig {
    pub account_name: String,
    pub account_key: String,
    pub data_container: String,
    pub endpoint_suffix: String,
}

impl fmt::Debug for DataLakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLakeConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("data_container", &self.data_container)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .finish()
    }
}

impl DataLakeConfig {
    /// Loads `.env` (if present) and reads the three required variables.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| FetchError::MissingEnv {
                    name: name.to_string(),
                })
        };

        Ok(Self {
            account_name: require(ENV_ACCOUNT_NAME)?,
            account_key: require(ENV_ACCOUNT_KEY)?,
            data_container: require(ENV_DATA_CONTAINER)?,
            endpoint_suffix: DEFAULT_ENDPOINT_SUFFIX.to_string(),
        })
    }

    pub fn with_endpoint_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.endpoint_suffix = suffix.into();
        self
    }

    pub fn connection_string(&self) -> String {
        format!(
            "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix={}",
            self.account_name, self.account_key, self.endpoint_suffix
        )
    }

    pub fn blob_endpoint(&self) -> String {
        format!("https://{}.blob.{}", self.account_name, self.endpoint_suffix)
    }

    pub fn dfs_endpoint(&self) -> String {
        format!("https://{}.dfs.{}", self.account_name, self.endpoint_suffix)
    }
}

/// Non-secret knobs, read from `config.toml` when it exists.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchSettings {
    pub sas_ttl_minutes: i64,
    pub endpoint_suffix: String,
    pub ts_column: String,
    pub drop_leading_columns: usize,
    pub output_dir: PathBuf,
    pub export_prefix: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            sas_ttl_minutes: DEFAULT_SAS_TTL_MINUTES,
            endpoint_suffix: DEFAULT_ENDPOINT_SUFFIX.to_string(),
            ts_column: TS_COLUMN.to_string(),
            drop_leading_columns: DEFAULT_DROP_LEADING_COLUMNS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
        }
    }
}

impl FetchSettings {
    /// Resolves the settings file from `DATALAKE_FETCH_CONFIG`, falling back
    /// to `config.toml` in the working directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            FetchError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Lifetime of signed read URLs. Must be positive and fit a `chrono::Duration`.
    pub fn sas_ttl(&self) -> Result<Duration> {
        let invalid = || {
            FetchError::Config(format!(
                "sas_ttl_minutes must be a positive number of minutes, got {}",
                self.sas_ttl_minutes
            ))
        };
        if self.sas_ttl_minutes <= 0 {
            return Err(invalid());
        }
        Duration::try_minutes(self.sas_ttl_minutes).ok_or_else(invalid)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: FetchSettings = toml::from_str(content)?;
        settings.sas_ttl()?;
        if settings.ts_column.trim().is_empty() {
            return Err(FetchError::Config("ts_column must not be empty".into()));
        }
        Ok(settings)
    }
}
