use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vidsift::{
    FfmpegLogLevel,
    server::{self, AppState, ServerConfig},
};

/// Upload a video, get per-frame analyses back.
#[derive(Debug, Parser)]
#[command(name = "vidsift-server", version)]
struct Args {
    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Directory for uploads and sampled frames.
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Frames sampled per upload.
    #[arg(long)]
    frame_count: Option<u64>,

    /// Vision model name.
    #[arg(long)]
    model: Option<String>,

    /// Seconds allowed for sampling one upload.
    #[arg(long)]
    sample_timeout_secs: Option<u64>,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long)]
    ffmpeg_log_level: Option<FfmpegLogLevel>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(upload_dir) = self.upload_dir {
            config.upload_dir = upload_dir;
        }
        if let Some(frame_count) = self.frame_count {
            config.frame_count = frame_count;
        }
        if let Some(model) = self.model {
            config.vision.model = model;
        }
        if let Some(seconds) = self.sample_timeout_secs {
            config.sample_timeout = Duration::from_secs(seconds);
        }
        if let Some(level) = self.ffmpeg_log_level {
            config.ffmpeg_log_level = level;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    args.apply(&mut config);

    config.validate()?;
    config.prepare_upload_dir()?;
    vidsift::set_ffmpeg_log_level(config.ffmpeg_log_level);

    let state = AppState::with_vision_client(&config).context("failed to build vision client")?;
    let app = server::router(Arc::new(state), config.max_upload_bytes);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(
        %address,
        upload_dir = %config.upload_dir.display(),
        frames = config.frame_count,
        model = %config.vision.model,
        "vidsift-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
