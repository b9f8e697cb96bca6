//! Storage event handling
//!
//! An upload notification names one object; only the first record of a
//! batch is processed.

use serde::Deserialize;
use tracing::{error, info};

use crate::config::Config;
use crate::database::ConnectionFactory;
use crate::errors::{IngestError, TriggerError};
use crate::ingestor::IngestionOrchestrator;
use crate::models::{ObjectLocation, RunOutcome};
use crate::sources::ObjectSource;

/// S3-style event notification
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl StorageEvent {
    pub fn from_json(raw: &str) -> Result<Self, TriggerError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Location named by the first record, with the key URL-decoded
    pub fn first_location(&self) -> Result<ObjectLocation, TriggerError> {
        let record = self.records.first().ok_or(TriggerError::NoRecords)?;
        if self.records.len() > 1 {
            info!(
                "Event carries {} records, only the first is processed",
                self.records.len()
            );
        }
        let key = decode_key(&record.s3.object.key)?;
        Ok(ObjectLocation::new(record.s3.bucket.name.clone(), key))
    }
}

/// Event keys are form-encoded: `+` is a space, everything else percent-encoded
pub fn decode_key(raw: &str) -> Result<String, TriggerError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| TriggerError::InvalidKey {
            message: e.to_string(),
        })
}

/// Process the object named by `event` and return the run outcome
pub async fn handle_event(
    event: &StorageEvent,
    config: &Config,
    source: &dyn ObjectSource,
    connections: &dyn ConnectionFactory,
) -> RunOutcome {
    let location = match event.first_location() {
        Ok(location) => location,
        Err(e) => {
            error!("Cannot process event: {}", e);
            return RunOutcome::new().finish(Some(IngestError::from(e)));
        }
    };
    process_object(&location, config, source, connections).await
}

/// Open one object and run it through the ingestion pipeline
pub async fn process_object(
    location: &ObjectLocation,
    config: &Config,
    source: &dyn ObjectSource,
    connections: &dyn ConnectionFactory,
) -> RunOutcome {
    info!(
        bucket = %location.container,
        key = %location.key,
        "Processing uploaded catalog export"
    );

    let reader = match source.open(location).await {
        Ok(reader) => reader,
        Err(e) => {
            error!("Could not open source object: {}", e);
            return RunOutcome::new().finish(Some(IngestError::from(e)));
        }
    };

    let outcome = IngestionOrchestrator::new(config, connections)
        .run(reader)
        .await;

    if outcome.is_success() {
        info!("Catalog export {} ingested", location);
    } else {
        error!("Catalog export {} failed to ingest", location);
    }
    outcome
}
