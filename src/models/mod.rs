use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{IngestError, LoadError, SchemaError};

/// Insertable columns of the product table, in statement order
pub const PRODUCT_COLUMNS: [&str; 7] = [
    "product_name",
    "gender",
    "description",
    "photo",
    "cat_id",
    "subcat_id",
    "price",
];

/// Fields of one source line, in source order
pub type DecodedFields = Vec<String>;

/// Positional role of a line within the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Header,
    Data,
}

/// A validated product row. Values stay textual until the database sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub gender: String,
    pub description: String,
    pub photo: String,
    pub category_id: String,
    pub subcategory_id: String,
    pub price: String,
}

impl ProductRecord {
    /// Values in the same order as [`PRODUCT_COLUMNS`]
    pub fn values(&self) -> [&str; 7] {
        [
            &self.name,
            &self.gender,
            &self.description,
            &self.photo,
            &self.category_id,
            &self.subcategory_id,
            &self.price,
        ]
    }
}

/// Bucket/container plus key of one stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub container: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new<C: Into<String>, K: Into<String>>(container: C, key: K) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

/// Terminal status reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a data row was not loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionCause {
    Schema(SchemaError),
    Load(LoadError),
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionCause::Schema(e) => write!(f, "schema: {e}"),
            RejectionCause::Load(e) => write!(f, "load: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub line_index: usize,
    pub cause: RejectionCause,
}

/// Aggregate result of processing one file.
///
/// `attempted` counts every data line (everything after the header), so
/// `attempted == loaded + rejected` holds for every finished run.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub attempted: usize,
    pub loaded: usize,
    pub rejected: usize,
    pub status: RunStatus,
    pub rejections: Vec<RowRejection>,
    pub failure: Option<IngestError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunOutcome {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            attempted: 0,
            loaded: 0,
            rejected: 0,
            status: RunStatus::Success,
            rejections: Vec::new(),
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_loaded(&mut self) {
        self.attempted += 1;
        self.loaded += 1;
    }

    pub fn record_rejected(&mut self, line_index: usize, cause: RejectionCause) {
        self.attempted += 1;
        self.rejected += 1;
        self.rejections.push(RowRejection { line_index, cause });
    }

    /// Close the outcome, marking it failed when a fatal error is given
    pub fn finish(mut self, failure: Option<IngestError>) -> Self {
        if failure.is_some() {
            self.status = RunStatus::Failure;
        }
        self.failure = failure;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Rejections caused by a field count mismatch
    pub fn schema_rejections(&self) -> impl Iterator<Item = &SchemaError> {
        self.rejections.iter().filter_map(|r| match &r.cause {
            RejectionCause::Schema(e) => Some(e),
            RejectionCause::Load(_) => None,
        })
    }

    /// Rejections caused by a failed insert
    pub fn load_rejections(&self) -> impl Iterator<Item = &LoadError> {
        self.rejections.iter().filter_map(|r| match &r.cause {
            RejectionCause::Load(e) => Some(e),
            RejectionCause::Schema(_) => None,
        })
    }
}

impl Default for RunOutcome {
    fn default() -> Self {
        Self::new()
    }
}
