//! digipath-api - teaching session catalogue service
//!
//! Serves the admin content API and the public catalogue over HTTP.
//! Settings resolve as command line, then `DIGIPATH_*` environment, then
//! TOML config file, then compiled defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use digipath_common::config::{config_file_path, load_toml_config, Settings, SettingsOverrides};
use digipath_common::db::{ensure_admin_user, init_database, seed_default_tags};
use digipath_api::{build_router, AppState};
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for digipath-api
#[derive(Parser, Debug)]
#[command(name = "digipath-api")]
#[command(about = "Teaching session catalogue service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "DIGIPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding the database
    #[arg(short, long, env = "DIGIPATH_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "DIGIPATH_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DIGIPATH_PORT")]
    port: Option<u16>,

    /// Database file, relative to the root folder unless absolute
    #[arg(long, env = "DIGIPATH_DATABASE")]
    database: Option<PathBuf>,

    /// Log filter (e.g. "info" or "digipath_api=debug"); RUST_LOG wins
    #[arg(long, env = "DIGIPATH_LOG_LEVEL")]
    log_level: Option<String>,

    /// HS256 signing secret for admin tokens
    #[arg(long, env = "DIGIPATH_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Bootstrap admin email
    #[arg(long, env = "DIGIPATH_ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Bootstrap admin password
    #[arg(long, env = "DIGIPATH_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Allowed CORS origins, comma separated ("*" for any)
    #[arg(long, env = "DIGIPATH_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Option<Vec<String>>,

    /// Seed the default tag taxonomy into an empty database
    #[arg(long, env = "DIGIPATH_SEED_DEFAULT_TAGS")]
    seed_default_tags: Option<bool>,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            root_folder: self.root_folder.clone(),
            bind: self.bind.clone(),
            port: self.port,
            database: self.database.clone(),
            log_level: self.log_level.clone(),
            jwt_secret: self.jwt_secret.clone(),
            admin_email: self.admin_email.clone(),
            admin_password: self.admin_password.clone(),
            cors_origins: self.cors_origins.clone(),
            seed_default_tags: self.seed_default_tags,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config(args.config.as_deref());

    let log_level = args
        .log_level
        .clone()
        .or_else(|| toml_config.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting DigiPath API (digipath-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match config_file_path(args.config.as_deref()) {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let settings = Settings::resolve(args.overrides(), toml_config).context("Invalid configuration")?;
    info!("Root folder: {}", settings.root_folder.display());
    info!("Database path: {}", settings.database_path.display());

    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    if settings.seed_default_tags {
        seed_default_tags(&pool)
            .await
            .context("Failed to seed default tags")?;
    }

    match &settings.bootstrap_admin {
        Some(admin) => {
            ensure_admin_user(&pool, admin)
                .await
                .context("Failed to create bootstrap admin")?;
        }
        None => {
            let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
                .fetch_one(&pool)
                .await
                .context("Failed to count admin accounts")?;
            if admins == 0 {
                warn!("No admin accounts exist; set admin_email and admin_password to create one");
            }
        }
    }

    let state = AppState::from_settings(pool, &settings);
    let mut app = build_router(state).layer(TraceLayer::new_for_http());
    if let Some(cors) = cors_layer(&settings.cors_origins) {
        app = app.layer(cors);
    }

    let addr = format!("{}:{}", settings.bind, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("digipath-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// CORS layer for the configured origins; none configured means same-origin only
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    if origins.iter().any(|o| o.trim() == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
