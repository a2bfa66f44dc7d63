use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use rbac_admin_api::config::config;
use rbac_admin_api::database::repositories::online_user;
use rbac_admin_api::database::{seed, DatabaseManager};
use rbac_admin_api::jobs::{OnlineUserCleanupJob, RefreshTokenPurgeJob, Scheduler};
use rbac_admin_api::presence::{spawn_writer, EventPublisher, PgPresenceStore, PresenceHub};
use rbac_admin_api::server::{app, AppState};

#[derive(Parser)]
#[command(name = "rbac-admin-api")]
#[command(about = "RBAC administration API server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP and WebSocket server (default)")]
    Serve,

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Insert built-in permissions, roles, menus and the admin account")]
    Seed,

    #[command(about = "Mark connections with stale heartbeats offline once")]
    CleanupOnline,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate => DatabaseManager::migrate().await.map_err(Into::into),
        Command::Seed => seed::run().await.map(|report| {
            tracing::info!(?report, "Seed complete");
        }),
        Command::CleanupOnline => OnlineUserCleanupJob::from_config(&config().presence)
            .sweep()
            .await
            .map(|affected| {
                tracing::info!(affected, "Online user cleanup complete");
            }),
    };

    DatabaseManager::close().await;
    result
}

async fn serve() -> anyhow::Result<()> {
    let config = config();
    tracing::info!("Starting RBAC Admin API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        if rbac_admin_api::is_production!() {
            tracing::error!("JWT_SECRET is not set; logins will fail until it is configured");
        } else {
            tracing::warn!("JWT_SECRET is not set");
        }
    }

    prepare_database().await;

    let (events, rx) = EventPublisher::channel(config.presence.event_buffer);
    let writer = spawn_writer(rx, PgPresenceStore);
    let hub = Arc::new(PresenceHub::new(events));

    let mut scheduler = Scheduler::new();
    scheduler.spawn(Arc::new(OnlineUserCleanupJob::from_config(&config.presence)));
    scheduler.spawn(Arc::new(RefreshTokenPurgeJob));
    tracing::info!("Started {} background jobs", scheduler.job_count());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("RBAC Admin API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app(AppState::new(hub)).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown().await;

    // The writer exits once the last hub handle is dropped with the router
    if tokio::time::timeout(Duration::from_secs(5), writer).await.is_err() {
        tracing::warn!("Presence writer did not drain within 5s");
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Migrations, seed and stale presence reset. Failures are logged so the
/// server still comes up and `/health` can report the database as degraded.
async fn prepare_database() {
    let config = config();

    if config.database.run_migrations {
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::error!("Migrations failed: {}", e);
            return;
        }
    }

    if config.seed.enabled {
        match seed::run().await {
            Ok(report) => tracing::info!(?report, "Seed complete"),
            Err(e) => tracing::error!("Seeding failed: {:#}", e),
        }
    }

    // Connections from a previous process are gone
    match DatabaseManager::pool().await {
        Ok(pool) => match online_user::mark_all_offline(&pool).await {
            Ok(0) => {}
            Ok(affected) => tracing::info!(affected, "Reset presence rows left online"),
            Err(e) => tracing::warn!("Could not reset presence rows: {}", e),
        },
        Err(e) => tracing::warn!("Database unavailable at startup: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
