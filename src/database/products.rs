use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::Connection;
use tracing::debug;

use super::RecordSink;
use crate::config::{DatabaseConfig, DatabaseDriver};
use crate::errors::{ConnectionError, LoadError, ResourceReleaseError};
use crate::models::{ProductRecord, PRODUCT_COLUMNS};

/// Single-row insert for the product table with one placeholder per column.
///
/// `table` must already be a validated identifier; record values are only
/// ever bound, never spliced into the statement.
pub fn insert_statement(driver: DatabaseDriver, table: &str) -> String {
    let placeholders: Vec<String> = (1..=PRODUCT_COLUMNS.len())
        .map(|n| match driver {
            DatabaseDriver::Postgres => format!("${n}"),
            DatabaseDriver::MySql | DatabaseDriver::Sqlite => "?".to_string(),
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        PRODUCT_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

/// Writes product records over one exclusively owned connection
pub struct ProductWriter {
    conn: AnyConnection,
    statement: String,
}

impl ProductWriter {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let conn = super::connect(config).await?;
        Ok(Self::new(conn, config.driver, &config.table))
    }

    pub fn new(conn: AnyConnection, driver: DatabaseDriver, table: &str) -> Self {
        let statement = insert_statement(driver, table);
        debug!("Prepared insert statement: {}", statement);
        Self { conn, statement }
    }

    pub async fn insert_record(&mut self, record: &ProductRecord) -> Result<(), LoadError> {
        let mut query = sqlx::query(&self.statement);
        for value in record.values() {
            query = query.bind(value);
        }

        let result = query.execute(&mut self.conn).await?;
        if result.rows_affected() != 1 {
            return Err(LoadError::new(format!(
                "expected 1 affected row, got {}",
                result.rows_affected()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSink for ProductWriter {
    async fn insert(&mut self, record: &ProductRecord) -> Result<(), LoadError> {
        self.insert_record(record).await
    }

    async fn close(self: Box<Self>) -> Result<(), ResourceReleaseError> {
        let writer = *self;
        writer
            .conn
            .close()
            .await
            .map_err(ResourceReleaseError::Connection)
    }
}
