use async_trait::async_trait;
use dossier_batch::{DocumentRecord, PersistenceSink};
use dossier_common::error::{DossierError, Result};

use crate::generator::service_message;

/// Persistence sink that POSTs each document record to an HTTP endpoint.
pub struct HttpSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PersistenceSink for HttpSink {
    async fn save(&self, record: &DocumentRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|err| {
                DossierError::Persistence(format!(
                    "failed to send document {} to {}: {err}",
                    record.id, self.endpoint
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = service_message(&response.text().await.unwrap_or_default());
            return Err(DossierError::Persistence(format!(
                "document sink {} returned status {status}{}",
                self.endpoint,
                detail.map(|message| format!(": {message}")).unwrap_or_default()
            )));
        }

        Ok(())
    }
}
