/// Environment variable names for the data lake credentials.
/// These match the keys expected in the `.env` file.
pub const ENV_ACCOUNT_NAME: &str = "DataLakeAccountName";
pub const ENV_ACCOUNT_KEY: &str = "DataLakeAccountKey";
pub const ENV_DATA_CONTAINER: &str = "DataLakeDataContainer";

/// Overrides the location of the settings file
pub const ENV_CONFIG_PATH: &str = "DATALAKE_FETCH_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// Storage endpoints
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
pub const STORAGE_API_VERSION: &str = "2021-08-06";
pub const DEFAULT_SAS_TTL_MINUTES: i64 = 60;

// Response headers used while listing paths
pub const CONTINUATION_HEADER: &str = "x-ms-continuation";

// Table shape
pub const TS_COLUMN: &str = "ts";
pub const DEFAULT_DROP_LEADING_COLUMNS: usize = 2;

// Export
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_EXPORT_PREFIX: &str = "test_fetch";
