use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dossier", about = "Background document generation jobs and CSV batches")]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, env = "DOSSIER_LOG_JSON", global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP job API.
    Serve(ServeArgs),
    /// Run one CSV batch to completion and write its archive.
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "DOSSIER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "DOSSIER_PORT", default_value = "8080")]
    pub port: u16,

    #[arg(long, env = "DOSSIER_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

impl ServeArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn job_store_root(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// CSV file with a header row.
    #[arg(long, env = "DOSSIER_INPUT")]
    pub input: PathBuf,

    /// Where the ZIP archive is written.
    #[arg(long, env = "DOSSIER_OUTPUT", default_value = "batch.zip")]
    pub output: PathBuf,

    #[arg(long, env = "DOSSIER_DOCUMENT_TYPE")]
    pub document_type: Option<String>,

    /// Column rename in `column=field` form. Repeatable.
    #[arg(long = "map", value_name = "COLUMN=FIELD")]
    pub mappings: Vec<String>,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Generator, sink and pacing options shared by both subcommands.
#[derive(Args, Debug)]
pub struct RemoteArgs {
    #[arg(long, env = "DOSSIER_GENERATOR_URL")]
    pub generator_url: String,

    #[arg(long, env = "DOSSIER_GENERATOR_API_KEY", hide_env_values = true)]
    pub generator_api_key: Option<String>,

    #[arg(long, env = "DOSSIER_SINK_URL", conflicts_with = "sink_dir")]
    pub sink_url: Option<String>,

    /// Directory receiving one JSON file per generated document.
    #[arg(long, env = "DOSSIER_SINK_DIR")]
    pub sink_dir: Option<PathBuf>,

    #[arg(long, env = "DOSSIER_ROW_DELAY_MS", default_value_t = 1000)]
    pub row_delay_ms: u64,
}

impl RemoteArgs {
    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }

    pub fn sink_url(&self) -> Option<&str> {
        self.sink_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
