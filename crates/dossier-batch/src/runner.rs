use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dossier_common::{
    consts::{DEFAULT_ROW_DELAY, JOB_TYPE_BATCH_ROW},
    error::{DossierError, Result},
};
use dossier_jobs::{Generator, JobRegistry};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    mapping::FieldMapping,
    sink::PersistenceSink,
    types::{BatchResult, BatchRow, DocumentRecord, RowOutcome},
};

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Pause between consecutive rows.
    pub row_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            row_delay: DEFAULT_ROW_DELAY,
        }
    }
}

/// Drives one generator call per row, strictly one at a time.
#[derive(Clone)]
pub struct BatchRunner {
    generator: Arc<dyn Generator>,
    sink: Option<Arc<dyn PersistenceSink>>,
    mapping: FieldMapping,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            sink: None,
            mapping: FieldMapping::default(),
            config: BatchConfig::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Generates every row in input order and reports each status change to
    /// `on_change`.
    ///
    /// Row `i + 1` is not started before row `i` is completed or errored. A
    /// failed row is recorded and never retried; it does not stop the batch.
    pub async fn run<F>(&self, mut rows: Vec<BatchRow>, mut on_change: F) -> BatchResult
    where
        F: FnMut(&BatchRow),
    {
        let total = rows.len();
        let mut outputs = Vec::with_capacity(total);
        let mut persistence_failures = 0;
        info!(rows = total, "batch started");

        for (index, row) in rows.iter_mut().enumerate() {
            if index > 0 && !self.config.row_delay.is_zero() {
                tokio::time::sleep(self.config.row_delay).await;
            }

            row.mark_processing();
            on_change(row);

            let payload = self.mapping.apply(row);
            match self.generator.generate(payload.clone()).await {
                Ok(output) => {
                    row.mark_completed(output.clone());
                    on_change(row);
                    debug!(row = row.id, "batch row completed");

                    if !self.persist(row.id, payload, output.clone()).await {
                        persistence_failures += 1;
                    }
                    outputs.push(RowOutcome::Success {
                        row_id: row.id,
                        output,
                    });
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(row = row.id, error = %message, "batch row failed");
                    row.mark_error(message.clone());
                    on_change(row);
                    outputs.push(RowOutcome::Error {
                        row_id: row.id,
                        message,
                    });
                }
            }
        }

        let result = BatchResult {
            rows,
            outputs,
            persistence_failures,
        };
        info!(
            success = result.success_count(),
            error = result.error_count(),
            persistence_failures,
            "batch finished"
        );
        result
    }

    /// Hands a single row to the registry instead of running a whole batch.
    pub fn start_single(&self, registry: &JobRegistry, row: &BatchRow) -> Result<String> {
        registry.start_job(
            JOB_TYPE_BATCH_ROW,
            self.mapping.apply(row),
            Arc::clone(&self.generator),
        )
    }

    /// Best-effort save of a generated document. Returns whether it stuck.
    async fn persist(&self, row_id: usize, payload: Value, output: Value) -> bool {
        let Some(sink) = &self.sink else {
            return true;
        };
        let record = DocumentRecord::new(
            row_id,
            self.mapping.document_type().map(str::to_string),
            payload,
            output,
        );
        match sink.save(&record).await {
            Ok(()) => true,
            Err(err) => {
                warn!(row = row_id, record = %record.id, error = %err, "failed to persist generated document");
                false
            }
        }
    }
}

/// Runs a whole batch as the generator of a single registry job.
///
/// The job input is the JSON array of rows; the job result is the
/// serialized [`BatchResult`].
pub struct BatchGenerator {
    runner: BatchRunner,
}

impl BatchGenerator {
    pub fn new(runner: BatchRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Generator for BatchGenerator {
    async fn generate(&self, input: Value) -> Result<Value> {
        let rows: Vec<BatchRow> = serde_json::from_value(input)
            .map_err(|err| DossierError::InvalidArgument(format!("invalid batch rows: {err}")))?;
        let result = self
            .runner
            .run(rows, |row| debug!(row = row.id, status = ?row.status, "batch row update"))
            .await;
        serde_json::to_value(&result).map_err(|err| {
            DossierError::InternalError(format!("failed to serialize batch result: {err}"))
        })
    }
}
