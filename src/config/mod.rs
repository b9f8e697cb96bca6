use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{ConfigError, ConfigResult};
use crate::models::PRODUCT_COLUMNS;

pub const ENV_DB_DRIVER: &str = "DB_DRIVER";
pub const ENV_DB_URL: &str = "DB_URL";
pub const ENV_DB_USERNAME: &str = "DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_TABLE: &str = "DB_TABLE";
pub const ENV_DELIMITER: &str = "DELIMITER";
pub const ENV_NUM_COL: &str = "NUM_COL";
pub const ENV_PROGRESS_INTERVAL: &str = "PROGRESS_INTERVAL";
pub const ENV_OBJECT_STORE: &str = "OBJECT_STORE";
pub const ENV_OBJECT_STORE_ROOT: &str = "OBJECT_STORE_ROOT";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_AWS_ENDPOINT: &str = "AWS_ENDPOINT";

pub const DEFAULT_TABLE: &str = "fashion.product";
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

/// Configuration resolved once per process and handed to each run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub delimiter: char,
    pub expected_columns: usize,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

/// Where source objects are fetched from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Amazon S3 (or compatible); credentials come from the AWS environment
    S3 {
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Local directory; each container is a sub-directory of `root`
    Local { root: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DatabaseDriver {
    Postgres,
    MySql,
    Sqlite,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::S3 {
            region: None,
            endpoint: None,
        }
    }
}

impl DatabaseDriver {
    /// Accepts short names as well as JDBC driver class names
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "org.postgresql.driver" => Ok(Self::Postgres),
            "mysql" | "mariadb" | "com.mysql.jdbc.driver" | "com.mysql.cj.jdbc.driver"
            | "org.mariadb.jdbc.driver" => Ok(Self::MySql),
            "sqlite" | "org.sqlite.jdbc" => Ok(Self::Sqlite),
            other => Err(ConfigError::invalid(
                ENV_DB_DRIVER,
                format!("unsupported database driver '{other}'"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for DatabaseDriver {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DatabaseDriver> for String {
    fn from(driver: DatabaseDriver) -> Self {
        driver.name().to_string()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .finish()
    }
}

impl Config {
    /// Resolve configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::missing(key));

        let database = DatabaseConfig {
            driver: DatabaseDriver::parse(&require(ENV_DB_DRIVER)?)?,
            url: require(ENV_DB_URL)?,
            username: get(ENV_DB_USERNAME),
            password: get(ENV_DB_PASSWORD),
            table: get(ENV_DB_TABLE).unwrap_or_else(default_table),
        };

        let progress_interval = match get(ENV_PROGRESS_INTERVAL) {
            Some(raw) => parse_positive(ENV_PROGRESS_INTERVAL, &raw)?,
            None => DEFAULT_PROGRESS_INTERVAL,
        };
        let ingestion = IngestionConfig {
            delimiter: parse_delimiter(&require(ENV_DELIMITER)?)?,
            expected_columns: parse_positive(ENV_NUM_COL, &require(ENV_NUM_COL)?)?,
            progress_interval,
        };

        let storage = match get(ENV_OBJECT_STORE).as_deref() {
            None | Some("s3") => StorageConfig::S3 {
                region: get(ENV_AWS_REGION),
                endpoint: get(ENV_AWS_ENDPOINT),
            },
            Some("local") => StorageConfig::Local {
                root: PathBuf::from(require(ENV_OBJECT_STORE_ROOT)?),
            },
            Some(other) => {
                return Err(ConfigError::invalid(
                    ENV_OBJECT_STORE,
                    format!("unknown object store '{other}', expected 's3' or 'local'"),
                ))
            }
        };

        let config = Self {
            database,
            ingestion,
            storage,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        validate_table_name(&self.database.table)?;
        if self.ingestion.expected_columns < PRODUCT_COLUMNS.len() {
            return Err(ConfigError::invalid(
                ENV_NUM_COL,
                format!(
                    "must be at least {} to cover the product columns",
                    PRODUCT_COLUMNS.len()
                ),
            ));
        }
        if self.ingestion.progress_interval == 0 {
            return Err(ConfigError::invalid(
                ENV_PROGRESS_INTERVAL,
                "must be at least 1",
            ));
        }
        if matches!(self.ingestion.delimiter, '\n' | '\r') {
            return Err(ConfigError::invalid(
                ENV_DELIMITER,
                "line terminators cannot be used as a delimiter",
            ));
        }
        Ok(())
    }
}

fn parse_delimiter(raw: &str) -> ConfigResult<char> {
    if raw == "\\t" {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::invalid(
            ENV_DELIMITER,
            format!("expected a single character, got '{raw}'"),
        )),
    }
}

fn parse_positive(key: &str, raw: &str) -> ConfigResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::invalid(key, "must be at least 1")),
        Err(e) => Err(ConfigError::invalid(key, format!("'{raw}': {e}"))),
    }
}

/// Table names are spliced into SQL text, so only plain identifiers pass
fn validate_table_name(table: &str) -> ConfigResult<()> {
    let segments: Vec<&str> = table.split('.').collect();
    let well_formed = segments.len() <= 2
        && segments.iter().all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            ENV_DB_TABLE,
            format!("'{table}' is not a valid table identifier"),
        ))
    }
}
