//! Artifact prewarm binary.
//!
//! Usage: `shutter-prewarm [DIR]` (defaults to the current directory).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shutter_media::{MediaTranscoder, ToolRunner};
use shutter_worker::{list_directory, ArtifactService, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("shutter=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting shutter-prewarm");

    if let Ok(addr) = std::env::var("SHUTTER_METRICS_ADDR") {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid SHUTTER_METRICS_ADDR: {}", addr))?;
        shutter_worker::metrics::init_metrics(addr).context("failed to start metrics listener")?;
        info!(%addr, "Metrics listener started");
    }

    let config = ServiceConfig::from_env();
    info!("Service config: {:?}", config);

    let transcoder = MediaTranscoder::default();
    for tool in [shutter_media::still::vips_executable(), "ffmpeg"] {
        if let Err(e) = ToolRunner::new(tool).locate() {
            warn!("{}", e);
        }
    }

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let entries = list_directory(&dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;

    let service = Arc::new(ArtifactService::start(config, Arc::new(transcoder)));

    let mut tasks = tokio::task::JoinSet::new();
    for entry in entries.into_iter().filter(|e| e.has_artifact()) {
        let service = Arc::clone(&service);
        let path = dir.join(&entry.name);
        tasks.spawn(async move {
            let result = service.get_or_create_artifact(&path).await;
            (path, result)
        });
    }

    let (mut ready, mut failed) = (0usize, 0usize);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((path, Ok(artifact))) => {
                ready += 1;
                info!(source = %path.display(), artifact = %artifact.display(), "Artifact ready");
            }
            Ok((path, Err(e))) => {
                failed += 1;
                warn!(source = %path.display(), retryable = e.is_retryable(), "Artifact failed: {}", e);
            }
            Err(e) => {
                failed += 1;
                error!("Request task failed: {}", e);
            }
        }
    }

    let stats = service.stats();
    service.shutdown().await;

    info!(
        ready,
        failed,
        generations = stats.started_generations,
        coalesced = stats.coalesced_requests,
        coalescing_ratio = stats.coalescing_ratio(),
        "Prewarm complete"
    );
    Ok(())
}
