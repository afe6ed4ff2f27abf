//! PremiAds 函数服务入口

use std::sync::Arc;

use anyhow::{Context, bail};
use premiads_functions::{
    auth::{IdentityAdminClient, JwtManager},
    build_router,
    state::{AppState, Repositories},
};
use premiads_shared::{
    config::{AppConfig, AuthConfig},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "premiads-functions";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load(SERVICE_NAME).context("failed to load configuration")?;
    let _guard = observability::init(&config.observability, &config.service_name).await?;

    info!(
        environment = %config.environment,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    if config.auth.jwt_secret == AuthConfig::default().jwt_secret {
        if config.is_production() {
            bail!("PREMIADS_AUTH__JWT_SECRET must be set in production environment");
        }
        warn!("Using default JWT secret - set PREMIADS_AUTH__JWT_SECRET for production");
    }

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let identity = Arc::new(IdentityAdminClient::new(&config.identity)?);
    let state = AppState::new(
        JwtManager::new(&config.auth),
        Repositories::postgres(&db),
        identity,
        &config.rewards,
        Some(db.clone()),
    );

    if config.cors.allows_any() && config.is_production() {
        warn!("CORS allows any origin in production");
    }
    let app = build_router(state, &config.cors);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到 SIGTERM 或 Ctrl+C 后停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
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
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
