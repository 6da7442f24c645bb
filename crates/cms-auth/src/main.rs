//! CMS 인증 API 서버.
//!
//! 설정을 로드하고 인증 라우터와 헬스 체크를 제공하는 Axum 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method, StatusCode};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use cms_auth::{create_router, seed_superadmin, AuthState, MemoryUserStore};
use cms_core::{init_logging, AppConfig, LogConfig, ServerConfig};

/// 만료된 재설정 토큰 정리 주기
const RESET_PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// CORS 레이어 생성.
///
/// `server.cors_origins`가 비어 있으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = server
        .cors_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        warn!("No valid CORS origins configured, allowing any origin (development mode)");
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// 설정에 맞는 저장소로 공유 상태 생성.
///
/// `database.url`이 있고 `postgres` feature가 켜져 있으면 PostgreSQL,
/// 아니면 인메모리 저장소를 사용합니다.
async fn build_state(config: &AppConfig) -> anyhow::Result<AuthState> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database.url {
        let store = cms_auth::PgUserStore::connect(url, config.database.max_connections).await?;
        store.migrate().await?;
        return Ok(AuthState::new(&config.security, Arc::new(store))?);
    }

    #[cfg(not(feature = "postgres"))]
    if config.database.url.is_some() {
        warn!("database.url is set but the postgres feature is disabled, using in-memory store");
    }

    info!("Using in-memory user store");
    Ok(AuthState::new(
        &config.security,
        Arc::new(MemoryUserStore::new()),
    )?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default()?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let state = Arc::new(build_state(&config).await?);
    seed_superadmin(&state, &config.bootstrap).await?;

    // 만료된 재설정 토큰 주기적 정리
    let resets = state.resets.clone();
    let purge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(RESET_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match resets.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired reset tokens purged"),
                Err(e) => error!(error = %e, "failed to purge expired reset tokens"),
            }
        }
    });

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(cors_layer(&config.server));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Auth server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
