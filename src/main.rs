//! Resilience daemon.
//!
//! Loads the configuration, builds the circuit registry and load balancer,
//! serves the admin API and applies configuration changes as they land.
//!
//! ```text
//!   resilience.toml ──▶ loader ──▶ bootstrap ──▶ CircuitRegistry + LoadBalancer
//!         │                            ▲                   │
//!         └── watcher (notify) ────────┘                   ▼
//!                                                      admin API (axum)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use service_resilience::admin::{setup_admin_router, AdminState};
use service_resilience::config::loader::load_or_default;
use service_resilience::config::watcher::ConfigWatcher;
use service_resilience::observability::{logging, metrics};
use service_resilience::Resilience;

#[derive(Parser)]
#[command(name = "service-resilience")]
#[command(about = "Circuit breaking and load balancing for internal service calls", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "resilience.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!("service-resilience v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let resilience = Resilience::from_config(&config);

    // Hot reload
    let (watcher, mut updates) = ConfigWatcher::new(&args.config, config.clone());
    let _watcher = if args.config.exists() {
        match watcher.run() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let reload_target = resilience.clone();
    let mut current = config.clone();
    tokio::spawn(async move {
        while let Some(next) = updates.recv().await {
            reload_target.apply_config(Some(&current), &next);
            current = next;
        }
    });

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let app = setup_admin_router(AdminState::new(resilience, config.admin.api_key.clone()));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        shutdown_signal().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
