//! ShadowHacker identity API server.
//!
//! Reads configuration from the environment (and `.env`), runs migrations
//! and serves the HTTP API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use shadow_api::config::ApiConfig;
use shadow_core::auth::password::hash_password;
use shadow_core::notify::{LogNotifier, Notifier, WebhookNotifier};
use shadow_core::store::{AdminStore, IdentityStore, MemoryStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "shadow_api_server", about = "ShadowHacker identity API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/shadowhacker"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all state in process memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    memory_store: bool,

    /// With `--memory-store`, create this admin account at startup using
    /// the password from `SHADOW_ADMIN_PASSWORD`.
    #[arg(long, requires = "memory_store")]
    seed_admin: Option<String>,
}

type Stores = (Arc<dyn IdentityStore>, Arc<dyn AdminStore>);

async fn open_stores(args: &Args) -> Result<Stores, Box<dyn std::error::Error>> {
    if args.memory_store {
        warn!("using in-memory store; all accounts are lost on exit");
        let store = Arc::new(MemoryStore::new());
        if let Some(username) = &args.seed_admin {
            let password = std::env::var("SHADOW_ADMIN_PASSWORD")
                .map_err(|_| "SHADOW_ADMIN_PASSWORD is required with --seed-admin")?;
            store.insert_admin(username, &hash_password(&password)?).await?;
            info!(username, "seeded admin account");
        }
        let identities: Arc<dyn IdentityStore> = store.clone();
        let admins: Arc<dyn AdminStore> = store;
        return Ok((identities, admins));
    }

    info!(max_connections = args.max_connections, "configuring connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    shadow_api::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let identities: Arc<dyn IdentityStore> = store.clone();
    let admins: Arc<dyn AdminStore> = store;
    Ok((identities, admins))
}

fn notifier(config: &ApiConfig) -> Result<Arc<dyn Notifier>, Box<dyn std::error::Error>> {
    Ok(match &config.notify_webhook_url {
        Some(url) => {
            info!(url = %url, "notifications go to webhook");
            Arc::new(WebhookNotifier::new(url.as_str())?)
        }
        None => Arc::new(LogNotifier),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shadow_api=debug,shadow_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind_addr) = &args.bind_addr {
        config.bind_addr = bind_addr.clone();
    }
    config.pg_connection_url = args.database_url.clone();
    if config.google.is_none() {
        info!("Google sign-in disabled (GOOGLE_CLIENT_ID/SECRET/REDIRECT_URI unset)");
    }

    let (identities, admins) = open_stores(&args).await?;
    let notifier = notifier(&config)?;
    let state = shadow_api::AppState::new(config.clone(), identities, admins, notifier)?;

    let _limiter_cleanup = state.admin.limiter().spawn_cleanup_task();
    let _oauth_cleanup = state.oauth_state.spawn_cleanup_task();

    let app = shadow_api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
