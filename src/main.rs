use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use orderpay::config::Config;
use orderpay::db::{AppState, create_pool, init_db, queries};
use orderpay::handlers;
use orderpay::models::{CreateOrder, CreateUser};
use orderpay::payments::PaystackClient;

/// Lifetime of the session created by `--seed`.
const SEED_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Parser, Debug)]
#[command(name = "orderpay")]
#[command(about = "Paystack payment initialization and webhook confirmation for storefront orders")]
struct Cli {
    /// Seed the database with dev data (user, session, order)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with a user, a session, and a pending order.
/// Only runs in dev mode and when no users exist yet.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .expect("Failed to count users");
    if existing > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let user = queries::create_user(
        &conn,
        &CreateUser {
            email: "dev@orderpay.local".to_string(),
            name: "Dev Customer".to_string(),
        },
    )
    .expect("Failed to create dev user");

    let token = queries::generate_session_token();
    queries::create_session(&conn, &user.id, &token, SEED_SESSION_TTL_SECS)
        .expect("Failed to create dev session");

    let order = queries::create_order(
        &conn,
        &CreateOrder {
            user_id: user.id.clone(),
            total: 100.0,
            shipping_address_id: None,
        },
    )
    .expect("Failed to create dev order");

    let pricing = order.pricing();

    tracing::info!("User: {} (id: {})", user.email, user.id);
    tracing::info!("Session token: {}", token);
    tracing::info!(
        "Order: {} ({} {:.2}, charged as {})",
        order.id,
        state.currency,
        pricing.total,
        pricing.amount_minor
    );
    tracing::info!("");
    tracing::info!("Checkout page: /checkout/{}", order.id);
    tracing::info!("  (send the token as cookie session_token or Authorization: Bearer)");
    tracing::info!("============================================");
}

/// Spawns a background task that periodically deletes expired sessions.
/// Runs every 5 minutes.
fn spawn_cleanup_task(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(5 * 60);

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => match queries::purge_expired_sessions(&conn) {
                    Ok(count) => {
                        if count > 0 {
                            tracing::debug!("Cleaned up {} expired sessions", count);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to cleanup sessions: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to get db connection for cleanup: {}", e);
                }
            }
        }
    });

    tracing::info!("Background cleanup task started (runs every 5 minutes)");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderpay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        gateway: PaystackClient::new(&config.secret_key, &config.gateway_base_url),
        currency: config.currency.clone(),
        public_base_url: config.public_base_url.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set ORDERPAY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    spawn_cleanup_task(state.clone());

    let app = handlers::app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Orderpay server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
