mod airtable;
mod assistant;
mod base_url;
mod bootstrap;
mod error;
mod firefly;
mod gong;
mod health;
mod news;
mod routes;
mod salesforce;
mod slack;
mod state;
#[cfg(test)]
mod test_support;
mod trends;
mod wordpress;
mod writer;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use opshub_core::config::{AppConfig, LoadOptions};
use tokio::{net::TcpListener, sync::watch};

fn init_logging(config: &AppConfig) {
    use opshub_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging comes up before bootstrap so config-dependent wiring is traced.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        "opshub-server listening"
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = wait_for_shutdown().await {
            tracing::warn!(error = %error, "shutdown signal listener failed");
        }
        let _ = stop_tx.send(true);
    });

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let mut drain_rx = stop_rx.clone();
    let drain_deadline = async move {
        let _ = drain_rx.wait_for(|stopping| *stopping).await;
        tracing::info!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "draining open connections"
        );
        tokio::time::sleep(grace).await;
    };

    let mut signal_rx = stop_rx;
    let server = axum::serve(listener, routes::app(app.state)).with_graceful_shutdown(async move {
        let _ = signal_rx.wait_for(|stopping| *stopping).await;
    });

    tokio::select! {
        result = server.into_future() => result?,
        () = drain_deadline => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                "graceful shutdown window elapsed; dropping open connections"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopped", correlation_id = "shutdown", "opshub-server stopped");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
