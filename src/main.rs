use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod grpc;
mod messaging;
mod metrics;
mod storage;
mod utils;

use config::Config;
use domain::account::AccountService;
use grpc::AccountGrpcHandler;
use messaging::{EventDispatcher, EventSink, KafkaProducerFactory, SinkConfig};
use metrics::{InfraState, Metrics};
use storage::PgAccountStore;
use utils::RetryPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,account_service=debug"))
        )
        .init();

    tracing::info!("🚀 Starting account service");

    let config = Config::from_env().context("invalid configuration")?;

    // === 1. PostgreSQL ===
    tracing::info!(
        host = %config.postgres.host,
        port = config.postgres.port,
        dbname = %config.postgres.dbname,
        "Connecting to PostgreSQL..."
    );
    let store = Arc::new(PgAccountStore::connect_lazy(&config.postgres));
    store
        .wait_until_ready(&RetryPolicy::default())
        .await
        .context("database did not become ready")?;
    store.ensure_schema().await.context("failed to prepare schema")?;

    // === 2. Prometheus metrics + infra endpoints ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let infra_state = InfraState {
        registry: Arc::new(metrics.registry().clone()),
        store: store.clone(),
    };
    let infra_port = config.infra_port;
    std::thread::spawn(move || {
        let system = actix_web::rt::System::new();
        if let Err(e) = system.block_on(metrics::start_infra_server(infra_state, infra_port)) {
            tracing::error!("Infra server error: {}", e);
        }
    });

    // === 3. Event publication (Kafka) ===
    tracing::info!(brokers = %config.kafka.brokers, "Configuring event sink");
    let sink = Arc::new(EventSink::new(
        KafkaProducerFactory::new(&config.kafka),
        SinkConfig {
            channel_buffer: config.publisher.channel_buffer,
            max_pending_deliveries: config.publisher.channel_buffer,
            close_timeout: config.publisher.close_timeout,
        },
        metrics.clone(),
    ));
    let dispatcher = EventDispatcher::new(sink.clone(), config.publisher.max_in_flight, metrics.clone());

    // === 4. Account service over gRPC ===
    let service = Arc::new(AccountService::new(store.clone(), dispatcher.clone()));
    let handler = AccountGrpcHandler::new(service, metrics.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));

    let served = grpc::serve(addr, handler, shutdown_signal()).await;

    // === 5. Graceful shutdown ===
    finish(served, async {
        tracing::info!(in_flight = dispatcher.in_flight(), "⏳ Waiting for in-flight events...");
        dispatcher.wait_idle(config.publisher.close_timeout).await;
        tracing::info!(topics = ?sink.active_topics().await, "Closing event sink");
        sink.close().await;
        store.close().await;

        tracing::info!("👋 Account service stopped");
    })
    .await
}

/// Run the shutdown steps whether or not the server exited cleanly, then
/// surface the server's error.
async fn finish<E, F>(served: Result<(), E>, shutdown: F) -> anyhow::Result<()>
where
    E: std::error::Error + Send + Sync + 'static,
    F: std::future::Future<Output = ()>,
{
    if let Err(e) = &served {
        tracing::error!(error = %e, "gRPC server failed");
    }

    shutdown.await;

    served.context("gRPC server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
