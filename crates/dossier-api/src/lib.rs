pub mod handlers;
pub mod router;
pub mod types;

use std::sync::Arc;

use dossier_batch::{BatchConfig, BatchRunner, FieldMapping, PersistenceSink};
use dossier_jobs::{Generator, JobRegistry};

pub use router::api_router;

/// Everything the HTTP handlers share.
#[derive(Clone)]
pub struct ApiState {
    registry: JobRegistry,
    generator: Arc<dyn Generator>,
    sink: Option<Arc<dyn PersistenceSink>>,
    batch_config: BatchConfig,
}

impl ApiState {
    pub fn new(registry: JobRegistry, generator: Arc<dyn Generator>) -> Self {
        Self {
            registry,
            generator,
            sink: None,
            batch_config: BatchConfig::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_batch_config(mut self, config: BatchConfig) -> Self {
        self.batch_config = config;
        self
    }

    pub fn registry(&self) -> JobRegistry {
        self.registry.clone()
    }

    pub fn generator(&self) -> Arc<dyn Generator> {
        Arc::clone(&self.generator)
    }

    pub fn batch_runner(&self, document_type: Option<String>) -> BatchRunner {
        let mut mapping = FieldMapping::new();
        if let Some(document_type) = document_type {
            mapping = mapping.with_document_type(document_type);
        }

        let runner = BatchRunner::new(self.generator())
            .with_mapping(mapping)
            .with_config(self.batch_config);
        match &self.sink {
            Some(sink) => runner.with_sink(Arc::clone(sink)),
            None => runner,
        }
    }
}
