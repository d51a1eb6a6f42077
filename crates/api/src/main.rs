use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use imageai_core::storage::LocalBlobStore;
use imageai_genai::GeminiClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imageai_api::auth::dev::DevTokenVerifier;
use imageai_api::auth::firebase::FirebaseVerifier;
use imageai_api::auth::VerifierChain;
use imageai_api::config::{ServerConfig, PROCESSED_BASE_URL};
use imageai_api::router::build_app_router;
use imageai_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = imageai_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    imageai_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    imageai_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Outbound HTTP ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    // --- Storage ---
    let assets = Arc::new(LocalBlobStore::new(
        &config.storage.assets_dir,
        &config.storage.assets_base_url,
    ));
    let processed = Arc::new(LocalBlobStore::new(
        &config.storage.processed_dir,
        PROCESSED_BASE_URL,
    ));
    tracing::info!(
        assets_dir = %config.storage.assets_dir.display(),
        processed_dir = %config.storage.processed_dir.display(),
        "Blob storage ready",
    );

    // --- Image generation ---
    if config.gemini.api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; image processing requests will fail");
    }
    let generator = Arc::new(GeminiClient::with_client(
        http.clone(),
        config.gemini.base_url.clone(),
        config.gemini.api_key.clone(),
        config.gemini.model.clone(),
    ));

    // --- Identity ---
    let dev_auth = config
        .auth
        .dev
        .clone()
        .map(|dev| Arc::new(DevTokenVerifier::new(dev)));
    let mut verifier = VerifierChain::new();
    if let Some(dev) = &dev_auth {
        tracing::warn!("Development login is enabled");
        verifier = verifier.with(dev.clone());
    }
    if let Some(project_id) = config.auth.firebase_project_id.clone() {
        tracing::info!(project_id = %project_id, "Firebase token verification enabled");
        verifier = verifier.with(Arc::new(FirebaseVerifier::new(
            http.clone(),
            project_id,
            &config.auth,
        )));
    }
    if verifier.is_empty() {
        tracing::warn!("No identity verifier configured; every authenticated route will return 401");
    }

    // --- App state ---
    let state = AppState {
        pool,
        assets,
        processed,
        generator,
        verifier: Arc::new(verifier),
        dev_auth,
    };

    // --- Router ---
    let app = build_app_router(state, &config)?;

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// `EnvFilter` from `RUST_LOG`, JSON output when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "imageai_api=debug,imageai_core=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
