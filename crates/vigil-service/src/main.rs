//! Service entrypoint: settings, signals, health listener, lifecycle.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vigil_service::{health, HealthState, Service};
use vigil_settings::loader;

#[derive(Parser)]
#[command(name = "vigil", about = "EventSub VIP watcher")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => loader::load_settings_from_path(path)?,
        None => loader::load_settings()?,
    };

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let service = Service::new(settings.clone());
    info!(instance_id = %service.instance_id(), "vigil starting");

    let health_addr = format!(
        "{}:{}",
        settings.service.health_host, settings.service.health_port
    );
    let listener = tokio::net::TcpListener::bind(&health_addr).await?;
    info!(addr = %health_addr, "health endpoint listening");
    let health_state = HealthState::new(
        service.status(),
        service.instance_id().to_string(),
        service.started_at(),
    );
    let health_cancel = cancel.clone();
    let health_handle =
        tokio::spawn(async move { health::serve(listener, health_state, health_cancel).await });

    let result = service.run(cancel.clone()).await;
    cancel.cancel();
    let _ = health_handle.await;

    if let Err(e) = result {
        error!(error = %e, "service failed");
        return Err(e.into());
    }
    Ok(())
}

/// Cancel on Ctrl-C or SIGTERM.
fn spawn_signal_handler(cancel: CancellationToken) {
    let _ = tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    let _ = signal.recv().await;
                }
                Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => info!("received Ctrl-C, shutting down"),
            () = terminate => info!("received SIGTERM, shutting down"),
        }
        cancel.cancel();
    });
}
