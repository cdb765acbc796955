mod cli;
mod config;
mod enforcement;
mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use arc_licensing::{LicenseManager, RedisUsageTracker, Verifier};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Commands},
    config::Config,
    handlers::{build_router, AppState},
};

#[tokio::main]
async fn main() {
    // Default to WARN when RUST_LOG is not set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    let result = match cli.command {
        Some(Commands::Inspect {
            license_file,
            public_key,
        }) => cli::run_inspect(&license_file, &public_key),
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        None => serve(config).await,
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting arc license gate on port {}", config.port);

    let mut verifier = Verifier::from_file(&config.public_key_path)
        .context("failed to load license public key")?;
    if let Some(issuer) = &config.license_issuer {
        verifier = verifier.with_issuer(issuer.clone());
    }
    if let Some(audience) = &config.license_audience {
        verifier = verifier.with_audience(audience.clone());
    }
    let manager = Arc::new(LicenseManager::new(verifier));

    match manager.load_license_file(&config.license_file) {
        Ok(Some(license)) => info!(
            license_id = %license.license_id,
            path = %config.license_file.display(),
            "license loaded"
        ),
        Ok(None) => {}
        // An unusable license file leaves the gate in restricted mode.
        Err(err) => warn!(
            error = %err,
            path = %config.license_file.display(),
            "failed to load license; running in restricted mode"
        ),
    }

    let tracker = RedisUsageTracker::connect(&config.redis_url)
        .await
        .context("failed to connect to Redis")?;

    let metrics = if config.metrics_enabled {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install Prometheus metrics recorder")?,
        )
    } else {
        None
    };

    let app = build_router(AppState {
        manager,
        tracker: Arc::new(tracker),
        metrics,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!("arc license gate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
