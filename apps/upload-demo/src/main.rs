//! Drives the upload coordinator against the in-memory engine and prints the
//! event stream as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tusbridge_client::{ClientConfig, TusClient};
use tusbridge_protocol::{EventKind, UploadEvent, UploadIdRequest, UploadRequest};
use tusbridge_transfer::MemoryEngine;

#[derive(Parser, Debug)]
#[command(name = "tusbridge-demo", version, about = "Upload files through the tusbridge coordinator")]
struct Args {
    /// Files (paths or file:// URIs) to upload.
    #[arg(required = true)]
    files: Vec<String>,

    /// Upload creation URL handed to the engine.
    #[arg(long, default_value = "memory://uploads")]
    endpoint: String,

    /// Per-upload chunk size in bytes.
    #[arg(long)]
    chunk_size: Option<i64>,

    /// Maximum concurrent uploads. Overrides the config file.
    #[arg(long)]
    pool_size: Option<usize>,

    /// Config file. Defaults to the per-user location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated latency per chunk, in milliseconds.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Pause the first upload after this many progress events, then resume it.
    #[arg(long)]
    pause_after: Option<usize>,

    /// Abort the first upload after this many progress events.
    #[arg(long)]
    abort_after: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tusbridge=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
    .context("failed to load client configuration")?;
    if let Some(size) = args.pool_size {
        config.pool_size = size;
    }
    tracing::info!(
        pool_size = config.pool_size,
        chunk_size = config.default_chunk_size,
        "configuration loaded"
    );

    let mut engine = MemoryEngine::new();
    if args.delay_ms > 0 {
        engine = engine.with_chunk_delay(Duration::from_millis(args.delay_ms));
    }
    let client = TusClient::with_file_resolver(Arc::new(engine.clone()), &config)?;
    let mut events = client.events();

    let mut ids = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let request = UploadRequest {
            uri: file.clone(),
            endpoint: args.endpoint.clone(),
            chunk_size: args.chunk_size,
            ..Default::default()
        };
        match client.upload(request).await {
            Ok(response) => {
                tracing::info!(upload_id = %response.upload_id, file = %file, "upload queued");
                ids.push(response.upload_id);
            }
            Err(e) => {
                let rejection = e.to_rejection();
                println!("{}", serde_json::to_string(&rejection)?);
            }
        }
    }
    if ids.is_empty() {
        anyhow::bail!("no upload could be started");
    }

    let first = UploadIdRequest::new(&ids[0]);
    let mut first_progress = 0usize;
    let mut terminals = 0usize;
    let mut failed = 0usize;

    while terminals < ids.len() {
        let Some(event) = events.recv().await else {
            break;
        };
        println!("{}", serde_json::to_string(&event)?);

        match &event {
            UploadEvent::Progress(p) if p.upload_id == first.upload_id => {
                first_progress += 1;
                if args.pause_after == Some(first_progress) {
                    let paused = client.pause(&first)?;
                    tracing::info!(message = %paused.message, "first upload paused");
                    tokio::time::sleep(Duration::from_millis(250)).await;
                    let resumed = client.resume(&first)?;
                    tracing::info!(message = %resumed.message, "first upload resumed");
                }
                if args.abort_after == Some(first_progress) {
                    if let Err(e) = client.abort(&first).await {
                        println!("{}", serde_json::to_string(&e.to_rejection())?);
                    }
                }
            }
            _ => {}
        }

        if event.is_terminal() {
            terminals += 1;
            if event.kind() == EventKind::Error {
                failed += 1;
            }
        }
    }

    client.shutdown().await;

    for upload in engine.uploads().await {
        tracing::info!(
            url = %upload.url,
            bytes = upload.offset(),
            sha256 = %upload.checksum(),
            finished = upload.finished,
            "stored upload"
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} upload(s) failed");
    }
    Ok(())
}
