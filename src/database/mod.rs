use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::Connection;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DatabaseConfig, DatabaseDriver};
use crate::errors::{ConnectionError, LoadError, ResourceReleaseError};
use crate::models::ProductRecord;

pub mod products;

pub use products::{insert_statement, ProductWriter};

/// Destination for validated records, owned by one run
#[async_trait]
pub trait RecordSink: Send {
    /// Insert one record. Failures are row-scoped.
    async fn insert(&mut self, record: &ProductRecord) -> Result<(), LoadError>;

    /// Release the underlying connection
    async fn close(self: Box<Self>) -> Result<(), ResourceReleaseError>;
}

/// Opens a [`RecordSink`] for a run
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn RecordSink>, ConnectionError>;
}

/// Connection factory backed by the sqlx `Any` driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlConnectionFactory;

#[async_trait]
impl ConnectionFactory for SqlConnectionFactory {
    async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Box<dyn RecordSink>, ConnectionError> {
        let writer = ProductWriter::connect(config).await?;
        Ok(Box::new(writer))
    }
}

/// Open a single connection for the configured driver
pub async fn connect(config: &DatabaseConfig) -> Result<AnyConnection, ConnectionError> {
    sqlx::any::install_default_drivers();

    let url = connection_url(config)?;
    info!(
        "Connecting to {} database for table {}",
        config.driver, config.table
    );
    warn_on_text_binding(config);

    let conn = AnyConnection::connect(&url)
        .await
        .map_err(|source| ConnectionError::ConnectFailed {
            driver: config.driver.name().to_string(),
            source,
        })?;

    debug!("Database connection established");
    Ok(conn)
}

/// Values are always bound as text. PostgreSQL does not cast a text
/// parameter into an integer or numeric column, so such inserts are rejected.
fn warn_on_text_binding(config: &DatabaseConfig) {
    if config.driver == DatabaseDriver::Postgres {
        warn!(
            "Values are bound as text; numeric columns of {} (cat_id, subcat_id, price) \
             must accept text input on PostgreSQL or every row will be rejected",
            config.table
        );
    }
}

/// Build a driver URL, splicing in credentials for network databases.
///
/// A `jdbc:` prefix is tolerated so existing deployment settings keep working.
pub fn connection_url(config: &DatabaseConfig) -> Result<String, ConnectionError> {
    let raw = config.url.strip_prefix("jdbc:").unwrap_or(&config.url);
    let invalid = |message: &str| ConnectionError::InvalidUrl {
        url: config.url.clone(),
        message: message.to_string(),
    };

    if config.driver == DatabaseDriver::Sqlite {
        return Ok(if raw.starts_with("sqlite:") {
            raw.to_string()
        } else {
            format!("sqlite://{raw}")
        });
    }

    let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

    let scheme_matches = match config.driver {
        DatabaseDriver::Postgres => matches!(url.scheme(), "postgres" | "postgresql"),
        DatabaseDriver::MySql => matches!(url.scheme(), "mysql" | "mariadb"),
        DatabaseDriver::Sqlite => true,
    };
    if !scheme_matches {
        return Err(invalid(&format!(
            "scheme '{}' does not match driver {}",
            url.scheme(),
            config.driver
        )));
    }

    if let Some(username) = &config.username {
        url.set_username(username)
            .map_err(|_| invalid("URL cannot carry a username"))?;
    }
    if let Some(password) = &config.password {
        url.set_password(Some(password))
            .map_err(|_| invalid("URL cannot carry a password"))?;
    }

    Ok(url.to_string())
}
