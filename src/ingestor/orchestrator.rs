//! End-to-end processing of one source file
//!
//! A run connects, reads the stream line by line (decode, classify, validate,
//! insert), then releases the stream and the connection. Row failures are
//! recorded and skipped; only a failed connection or a failed read ends the
//! run early.

use tokio::io::AsyncBufRead;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::decoder::{classify, decode};
use super::lines::LineReader;
use super::validator::validate;
use crate::config::Config;
use crate::database::{ConnectionFactory, RecordSink};
use crate::errors::{IngestError, StreamError};
use crate::models::{DecodedFields, LineKind, RejectionCause, RunOutcome};

pub struct IngestionOrchestrator<'a> {
    config: &'a Config,
    connections: &'a dyn ConnectionFactory,
}

impl<'a> IngestionOrchestrator<'a> {
    pub fn new(config: &'a Config, connections: &'a dyn ConnectionFactory) -> Self {
        Self {
            config,
            connections,
        }
    }

    /// Process every line of `reader` and report the aggregated outcome.
    ///
    /// The reader and the connection are released on every path out of here.
    pub async fn run<R>(&self, reader: R) -> RunOutcome
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let outcome = RunOutcome::new();
        let span = info_span!("ingestion_run", run_id = %outcome.run_id);
        self.run_inner(reader, outcome).instrument(span).await
    }

    async fn run_inner<R>(&self, reader: R, mut outcome: RunOutcome) -> RunOutcome
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut sink = match self.connections.connect(&self.config.database).await {
            Ok(sink) => sink,
            Err(e) => {
                error!("Could not connect to database, no rows processed: {}", e);
                drop(reader);
                return outcome.finish(Some(IngestError::from(e)));
            }
        };

        info!("Begin reading file");
        let read_result = self.process_lines(reader, sink.as_mut(), &mut outcome).await;

        if let Err(e) = sink.close().await {
            warn!("{}", e);
        } else {
            debug!("Database connection closed");
        }

        let failure = match read_result {
            Ok(()) => {
                info!(
                    "File processing finished: {} attempted, {} loaded, {} rejected",
                    outcome.attempted, outcome.loaded, outcome.rejected
                );
                None
            }
            Err(e) => {
                error!(
                    "Reading aborted after {} rows ({} loaded): {}",
                    outcome.attempted, outcome.loaded, e
                );
                Some(IngestError::from(e))
            }
        };
        outcome.finish(failure)
    }

    async fn process_lines<R>(
        &self,
        reader: R,
        sink: &mut dyn RecordSink,
        outcome: &mut RunOutcome,
    ) -> Result<(), StreamError>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let ingestion = &self.config.ingestion;
        let mut lines = LineReader::new(reader);
        let mut line_index = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(source) => return Err(StreamError::ReadFailed { line_index, source }),
            };

            let fields = decode(&line, ingestion.delimiter);
            match classify(line_index) {
                LineKind::Header => self.log_header(&fields),
                LineKind::Data => self.process_row(line_index, fields, sink, outcome).await,
            }

            if line_index > 0 && line_index % ingestion.progress_interval == 0 {
                info!(
                    "Processed {} rows ({} loaded, {} rejected)",
                    outcome.attempted, outcome.loaded, outcome.rejected
                );
            }
            line_index += 1;
        }

        info!("End of file reached after {} lines", line_index);
        drop(lines);
        debug!("Source stream released");
        Ok(())
    }

    fn log_header(&self, fields: &DecodedFields) {
        info!("Header columns: {}", fields.join(" : "));
        let expected = self.config.ingestion.expected_columns;
        if fields.len() != expected {
            warn!(
                "Header has {} columns but {} are expected; data rows are still checked individually",
                fields.len(),
                expected
            );
        }
    }

    async fn process_row(
        &self,
        line_index: usize,
        fields: DecodedFields,
        sink: &mut dyn RecordSink,
        outcome: &mut RunOutcome,
    ) {
        let record = match validate(fields, self.config.ingestion.expected_columns, line_index) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = line_index, "Row rejected, column count incorrect: {}", e);
                outcome.record_rejected(line_index, RejectionCause::Schema(e));
                return;
            }
        };

        debug!(line = line_index, "Inserting {}", record.values().join(" : "));
        match sink.insert(&record).await {
            Ok(()) => outcome.record_loaded(),
            Err(e) => {
                warn!(line = line_index, "Row rejected by database: {}", e);
                outcome.record_rejected(line_index, RejectionCause::Load(e));
            }
        }
    }
}
