mod config;

use std::sync::Arc;

use clap::Parser;
use dossier_api::ApiState;
use dossier_batch::{
    BatchConfig, BatchRunner, FieldMapping, FileSink, PersistenceSink, RowStatus, build_archive,
    read_rows_from_path,
};
use dossier_jobs::{Generator, JobRegistry, JobStore};
use dossier_remote::{HttpGenerator, HttpSink};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{BatchArgs, Cli, Command, RemoteArgs, ServeArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::from_default_env().add_directive("dossier=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Batch(args) => batch(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let addr = args.addr();
    let store = JobStore::open(args.job_store_root()).await?;
    info!(path = %store.path().display(), "job store opened");
    let registry = JobRegistry::with_store(store).await;

    let mut state = ApiState::new(registry, generator(&args.remote))
        .with_batch_config(BatchConfig {
            row_delay: args.remote.row_delay(),
        });
    if let Some(sink) = sink(&args.remote) {
        state = state.with_sink(sink);
    }

    let app = dossier_api::api_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("dossier server listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn batch(args: BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rows = read_rows_from_path(&args.input).await?;
    if rows.is_empty() {
        warn!(input = %args.input.display(), "batch input has no rows");
    }

    let mut mapping = FieldMapping::from_pairs(&args.mappings)?;
    if let Some(document_type) = args.document_type {
        mapping = mapping.with_document_type(document_type);
    }

    let mut runner = BatchRunner::new(generator(&args.remote))
        .with_mapping(mapping)
        .with_config(BatchConfig {
            row_delay: args.remote.row_delay(),
        });
    if let Some(sink) = sink(&args.remote) {
        runner = runner.with_sink(sink);
    }

    let total = rows.len();
    let result = runner
        .run(rows, |row| match row.status {
            RowStatus::Processing => info!(row = row.id, total, "generating row"),
            RowStatus::Error => warn!(
                row = row.id,
                error = row.error.as_deref().unwrap_or_default(),
                "row failed"
            ),
            RowStatus::Pending | RowStatus::Completed => {}
        })
        .await;

    let archive = build_archive(&result)?;
    tokio::fs::write(&args.output, archive).await?;
    info!(
        output = %args.output.display(),
        success = result.success_count(),
        error = result.error_count(),
        persistence_failures = result.persistence_failures,
        "batch archive written"
    );

    Ok(())
}

fn generator(remote: &RemoteArgs) -> Arc<dyn Generator> {
    Arc::new(HttpGenerator::new(
        remote.generator_url.clone(),
        remote.generator_api_key.clone(),
    ))
}

fn sink(remote: &RemoteArgs) -> Option<Arc<dyn PersistenceSink>> {
    if let Some(url) = remote.sink_url() {
        info!(endpoint = url, "http document sink enabled");
        return Some(Arc::new(HttpSink::new(url.to_string())));
    }
    let dir = remote.sink_dir.as_ref()?;
    info!(path = %dir.display(), "file document sink enabled");
    Some(Arc::new(FileSink::new(dir.clone())))
}
