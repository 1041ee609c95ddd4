use blog_backend::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    db::Database,
    media::{MediaService, MediaState, S3MediaClient},
    repository::{PostgresRepository, RepositoryState},
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database handle, media host, then the
/// HTTP server with graceful shutdown.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_backend=debug,tower_http=info,axum=trace".into());

    // 3. Pretty logs locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database handle. The pool opens on first use, so the server starts even
    // while Postgres is still coming up.
    let db = Arc::new(Database::new(
        &config.db_url,
        config.db_max_connections,
        Duration::from_secs(config.db_acquire_timeout_secs),
    ));
    let repo = Arc::new(PostgresRepository::new(db.clone())) as RepositoryState;

    // 5. Media host (S3/MinIO)
    let s3_client = S3MediaClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
        &config.media_public_url,
        Duration::from_secs(config.media_timeout_secs),
    );

    // LOCAL-ONLY: provision the MinIO bucket.
    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await;
    }
    let media = Arc::new(s3_client) as MediaState;

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState::new(repo, media, config);

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {addr}: {e}"));

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    db.close().await;
    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
