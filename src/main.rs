//! Optical Stream server
//!
//! Opens a camera and serves it over HTTP at `/stream` and `/snapshot`.

use clap::Parser;
use optical_stream::{
    capture::{self, HINT_HEIGHT, HINT_WIDTH},
    cli::Cli,
    metrics::StreamMetrics,
    StreamServer,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Optical Stream v{}", optical_stream::VERSION);
    info!(
        listen = %config.server.listen,
        port = config.server.port,
        device = config.capture.device,
        flip_horizontal = config.stream.flip_horizontal,
        flip_vertical = config.stream.flip_vertical,
        rotate = %config.stream.rotate,
        quality = config.stream.quality,
        framerate = config.stream.framerate,
        manual_focus = config.capture.manual_focus,
        "Starting server"
    );
    if config.stream.framerate == 0 {
        warn!("Framerate is 0: stream clients are served as fast as the camera allows");
    }

    let mut camera = match capture::open_device(config.capture.device) {
        Ok(camera) => camera,
        Err(e) => {
            error!("Failed to open camera: {}", e);
            std::process::exit(1);
        }
    };
    capture::apply_settings(
        camera.as_mut(),
        HINT_WIDTH,
        HINT_HEIGHT,
        config.capture.manual_focus,
    );

    let metrics = match StreamMetrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            error!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    let server = StreamServer::new(capture::share_boxed(camera), Arc::new(config), metrics);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run(shutdown).await {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Done");
}
