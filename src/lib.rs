#[macro_use]
extern crate tracing;

use eyre::{
    Result,
    WrapErr as _,
};
use sapawarga_exporter_collector::{
    MetricRegistry,
    MySqlSource,
    Scheduler,
};
use sapawarga_exporter_config::Config;
use std::{
    future::Future,
    sync::Arc,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

const WORKSPACE_TARGETS: &[&str] = &[
    "sapawarga_exporter",
    "sapawarga_exporter_collector",
    "sapawarga_exporter_config",
    "sapawarga_exporter_http",
];

pub fn init_errors() -> Result<()> {
    color_eyre::install()
}

/// `RUST_LOG` wins when set. Otherwise everything logs at `info`, and `verbose` raises the
/// exporter's own crates to `debug`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let mut directives = vec!["info".to_string()];
            if verbose {
                directives.extend(WORKSPACE_TARGETS.iter().map(|target| format!("{target}=debug")));
            }
            EnvFilter::try_new(directives.join(",")).wrap_err("Invalid log filter")?
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .wrap_err("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// Connects to the database, starts every cadence group and the metrics endpoint, and runs
/// until a shutdown signal arrives or, under the `exit` failure policy, a refresh fails.
pub async fn run(config: Config) -> Result<()> {
    let registry = MetricRegistry::new();
    let source = MySqlSource::connect(&config.database)
        .await
        .wrap_err_with(|| format!("Failed to connect to {}:{}", config.database.host, config.database.port))?;
    let scheduler = Scheduler::from_config(&config, &registry, Arc::new(source))?;

    let listener = TcpListener::bind(config.listen_address)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", config.listen_address))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    let server = tokio::spawn(sapawarga_exporter_http::serve(listener, registry, shutdown.clone()));

    let outcome = scheduler.run(shutdown.clone()).await;
    shutdown.cancel();

    server
        .await
        .wrap_err("Metrics server task panicked")?
        .wrap_err("Metrics server failed")?;

    outcome.wrap_err("Refresh scheduler stopped")
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Cannot listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    wait_for_shutdown(shutdown, tokio::signal::ctrl_c(), terminate).await;
}

/// Cancels `shutdown` once either signal arrives. A signal whose handler cannot be installed is
/// logged and ignored; the other one is still awaited.
async fn wait_for_shutdown(
    shutdown: CancellationToken,
    ctrl_c: impl Future<Output = std::io::Result<()>>,
    terminate: impl Future<Output = ()>,
) {
    let interrupt = async move {
        if let Err(err) = ctrl_c.await {
            warn!("Cannot listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        biased;
        _ = shutdown.cancelled() => return,
        _ = interrupt => {}
        _ = terminate => {}
    }

    info!("Shutdown requested");
    shutdown.cancel();
}
