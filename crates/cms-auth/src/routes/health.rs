//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템(Kubernetes 등)에서 사용됩니다.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::state::AuthState;

/// 상세 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 전체 서비스 상태 ("healthy" | "unhealthy")
    pub status: String,
    /// API 버전
    pub version: String,
    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
    /// 사용자 저장소 상태 ("up" | "down")
    pub store: String,
}

/// 간단한 헬스 체크 (liveness probe용).
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// 상세 헬스 체크 (readiness probe용).
///
/// GET /health/ready
pub async fn health_ready(State(state): State<Arc<AuthState>>) -> impl IntoResponse {
    let (status, store, code) = match state.users.health_check().await {
        Ok(()) => ("healthy", "up", StatusCode::OK),
        Err(e) => {
            tracing::warn!(error = %e, "user store health check failed");
            ("unhealthy", "down", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        store: store.to_string(),
    };

    (code, Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(health_ready))
}
