//! Fitness Tracker Backend
//!
//! Starts the HTTP API and the outbox relay. Both stop on Ctrl+C or
//! SIGTERM; the relay finishes its current batch first.

use anyhow::Result;
use fitness_tracker_backend::{
    config, db,
    messaging::{EventBus, OutboxRelay, OutboxRelayConfig, PgOutboxStore, RedisEventBus},
    modules, routes,
    state::AppState,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        admins = config.admin.admin_emails.len(),
        google_oauth = config.google_oauth.is_configured(),
        "Starting Fitness Tracker Backend"
    );

    if config::AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    let metrics = install_metrics_recorder();

    info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database).await?;

    // Production runs migrations as a separate job
    if !config::AppConfig::is_production() {
        db::run_migrations(&db_pool).await?;
    }

    let redis_conn = if config.redis.enabled {
        connect_redis(&config.redis.url).await
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = spawn_relay(&db_pool, &config, redis_conn, shutdown_rx);

    let state = AppState::new(db_pool, config.clone());
    let mut app = routes::create_router(state);
    if let Some(handle) = metrics {
        app = app.merge(routes::metrics_routes(handle));
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(relay) = relay {
        if let Err(e) = relay.await {
            error!(error = %e, "Outbox relay task failed");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Start the outbox relay with the in-process bus and, when Redis is
/// available, the Redis mirror
fn spawn_relay(
    pool: &PgPool,
    config: &config::AppConfig,
    redis_conn: Option<ConnectionManager>,
    shutdown: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    if !config.outbox.enabled {
        warn!("Outbox relay disabled; integration events will not be delivered");
        return None;
    }

    let mut buses: Vec<Arc<dyn EventBus>> = vec![Arc::new(modules::in_process_bus(pool, config))];
    if let Some(conn) = redis_conn {
        buses.push(Arc::new(RedisEventBus::new(
            conn,
            config.outbox.channel_prefix.clone(),
        )));
    }

    let relay = OutboxRelay::new(
        Arc::new(PgOutboxStore::new(pool.clone())),
        buses,
        OutboxRelayConfig::from(&config.outbox),
    );
    Some(tokio::spawn(relay.run(shutdown)))
}

/// Connect to Redis with graceful fallback
///
/// Returns None if Redis is unavailable; events are then only delivered
/// in-process.
async fn connect_redis(url: &str) -> Option<ConnectionManager> {
    info!("Connecting to Redis...");

    match redis::Client::open(url) {
        Ok(client) => match ConnectionManager::new(client).await {
            Ok(conn) => {
                info!("Redis connection established");
                Some(conn)
            }
            Err(e) => {
                warn!("Failed to connect to Redis: {}. Event mirroring disabled.", e);
                None
            }
        },
        Err(e) => {
            warn!("Invalid Redis URL: {}. Event mirroring disabled.", e);
            None
        }
    }
}

fn install_metrics_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed; /metrics disabled");
            None
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "fitness_tracker_backend=info,tower_http=info".into()
        } else {
            "fitness_tracker_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Validate configuration for production deployment
fn validate_production_config(config: &config::AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    let secret = config.jwt.secret_key.expose_secret();
    if secret.contains("development") || secret.len() < 32 {
        errors.push("JWT secret must be at least 32 characters and not contain 'development'");
    }

    if config.jwt.issuer.trim().is_empty() || config.jwt.audience.trim().is_empty() {
        errors.push("JWT issuer and audience must be set");
    }

    if config.admin.admin_emails.is_empty() {
        warn!("No admin emails configured - the messaging dashboard will be unreachable");
    }

    if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }

    if !errors.is_empty() {
        for err in &errors {
            error!("Configuration error: {}", err);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
