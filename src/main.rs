//! Subscription Hub server binary.
//!
//! Startup order: configuration, logging, tenant catalog, storage, gateway,
//! retention sweep, HTTP server. Any failure before binding aborts the
//! process with a non-zero exit.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_hub::adapters::http::{app_router, SubscriptionAppState};
use subscription_hub::adapters::{
    HttpPaymentGateway, InMemoryPendingChargeRepository, InMemorySubscriptionLedger,
    InMemoryWebhookEventRepository, MockPaymentGateway, PostgresPendingChargeRepository,
    PostgresSubscriptionLedger, PostgresWebhookEventRepository, RetryingGateway,
};
use subscription_hub::application::{KeyedLocks, PurgeStaleRecordsHandler};
use subscription_hub::config::{
    AppConfig, DatabaseConfig, GatewayConfig, RetentionConfig, StorageBackend,
};
use subscription_hub::ports::{
    PaymentGateway, PendingChargeRepository, SubscriptionLedger, WebhookEventRepository,
};

struct Stores {
    ledger: Arc<dyn SubscriptionLedger>,
    pending_charges: Arc<dyn PendingChargeRepository>,
    webhook_events: Arc<dyn WebhookEventRepository>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let directory = config.load_tenants()?;
    tracing::info!(
        tenants = directory.len(),
        path = %config.tenants.path,
        "Tenant catalog loaded"
    );

    let stores = build_stores(&config.database).await?;
    let gateway = build_gateway(&config.gateway)?;

    spawn_retention_sweep(&config.retention, &stores);

    let state = SubscriptionAppState {
        directory,
        gateway,
        ledger: stores.ledger,
        pending_charges: stores.pending_charges,
        webhook_events: stores.webhook_events,
        locks: Arc::new(KeyedLocks::new()),
        event_types: config.gateway.event_type_map(),
    };
    let app = app_router(state, config.server.request_limits());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_stores(config: &DatabaseConfig) -> Result<Stores, Box<dyn Error>> {
    if config.backend() == StorageBackend::InMemory {
        tracing::warn!("No database url configured, using in-memory storage");
        return Ok(Stores {
            ledger: Arc::new(InMemorySubscriptionLedger::new()),
            pending_charges: Arc::new(InMemoryPendingChargeRepository::new()),
            webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
        });
    }

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .connect(&config.url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Stores {
        ledger: Arc::new(PostgresSubscriptionLedger::new(pool.clone())),
        pending_charges: Arc::new(PostgresPendingChargeRepository::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
    })
}

fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn PaymentGateway>, Box<dyn Error>> {
    if config.mock {
        tracing::warn!("Using mock payment gateway");
        return Ok(Arc::new(MockPaymentGateway::new()));
    }

    let http: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(config.timeout())?);
    Ok(Arc::new(RetryingGateway::new(http, config.retry_policy())))
}

fn spawn_retention_sweep(config: &RetentionConfig, stores: &Stores) {
    let handler = PurgeStaleRecordsHandler::new(
        stores.webhook_events.clone(),
        stores.pending_charges.clone(),
    );
    let cmd = config.purge_command();
    let period = config.sweep_interval();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match handler.handle(cmd).await {
                Ok(result) => tracing::info!(
                    webhook_events_deleted = result.webhook_events_deleted,
                    pending_charges_deleted = result.pending_charges_deleted,
                    "Retention sweep finished"
                ),
                Err(e) => tracing::warn!(error = %e, "Retention sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
