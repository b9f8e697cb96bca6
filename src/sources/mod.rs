//! Object retrieval for source files
//!
//! A source turns an [`ObjectLocation`] into a buffered byte stream. The
//! stream is owned by the run that opened it and released by dropping it.

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{DynObjectStore, ObjectStore};
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::errors::{StreamError, StreamResult};
use crate::models::ObjectLocation;

/// Buffered source stream handed to the orchestrator
pub type ByteStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// Opens stored objects for reading
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn open(&self, location: &ObjectLocation) -> StreamResult<ByteStream>;
}

enum Backend {
    Configured(StorageConfig),
    Shared(Arc<DynObjectStore>),
}

/// [`ObjectSource`] backed by the `object_store` crate
pub struct ObjectStoreSource {
    backend: Backend,
}

impl ObjectStoreSource {
    /// Build stores per container from configuration
    pub fn from_config(storage: StorageConfig) -> Self {
        Self {
            backend: Backend::Configured(storage),
        }
    }

    /// Use one existing store; the container becomes the leading path segment
    pub fn with_store(store: Arc<DynObjectStore>) -> Self {
        Self {
            backend: Backend::Shared(store),
        }
    }

    fn store_for(&self, location: &ObjectLocation) -> StreamResult<(Arc<DynObjectStore>, String)> {
        match &self.backend {
            Backend::Shared(store) => Ok((
                Arc::clone(store),
                format!("{}/{}", location.container, location.key),
            )),
            Backend::Configured(StorageConfig::S3 { region, endpoint }) => {
                let mut builder =
                    AmazonS3Builder::from_env().with_bucket_name(&location.container);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                let store = builder
                    .build()
                    .map_err(|e| StreamError::store_setup(e.to_string()))?;
                Ok((Arc::new(store), location.key.clone()))
            }
            Backend::Configured(StorageConfig::Local { root }) => {
                let dir = root.join(&location.container);
                let store = LocalFileSystem::new_with_prefix(&dir)
                    .map_err(|e| StreamError::open_failed(location.to_string(), e.to_string()))?;
                Ok((Arc::new(store), location.key.clone()))
            }
        }
    }
}

/// Convert an object key into a store path.
///
/// Store paths cannot hold empty segments, so keys such as `a//b.csv` or
/// `dir/` are refused rather than silently read from a different object.
fn object_path(key: &str) -> Result<ObjectPath, String> {
    if key.split('/').any(str::is_empty) {
        return Err(format!(
            "key '{key}' has an empty path segment, which the object store cannot address"
        ));
    }
    ObjectPath::parse(key).map_err(|e| e.to_string())
}

#[async_trait]
impl ObjectSource for ObjectStoreSource {
    async fn open(&self, location: &ObjectLocation) -> StreamResult<ByteStream> {
        let (store, key) = self.store_for(location)?;
        let path = object_path(&key)
            .map_err(|message| StreamError::open_failed(location.to_string(), message))?;

        info!("Fetching object {} from {}", location, store);
        let result = store
            .get(&path)
            .await
            .map_err(|e| StreamError::open_failed(location.to_string(), e.to_string()))?;
        debug!("Object {} is {} bytes", location, result.meta.size);

        let stream = result
            .into_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::new(StreamReader::new(stream)))
    }
}
