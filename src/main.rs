use fintrack_auth::{
    build_router,
    config::AppConfig,
    observability::init_tracing,
    services::{
        AuthService, EmailService, JwtService, OtpStore, PgUserDirectory, SystemClock,
        UserDirectory,
    },
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration - fail fast if invalid
    let config = AppConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database initialized successfully");

    let clock = Arc::new(SystemClock);
    let directory: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool));
    let email = Arc::new(EmailService::new(&config.smtp)?);
    let jwt = JwtService::new(&config.jwt.secret, clock.clone());
    let otp_store = Arc::new(OtpStore::new(
        clock,
        std::time::Duration::from_secs(config.otp.sweep_interval_seconds),
    ));

    let auth_service = AuthService::new(
        directory.clone(),
        email,
        jwt.clone(),
        otp_store,
        chrono::Duration::minutes(config.otp.expiry_minutes),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        directory,
        auth_service,
        jwt,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
