//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 저장소 포함 헬스 체크 (readiness)
//! - `/auth/*` - 회원가입, 로그인, 비밀번호 재설정, 현재 사용자, 조직 구성원

pub mod auth;
pub mod health;

pub use auth::{
    auth_router, ApiJson, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
    LoginResponse, MeResponse, MemberResponse, RegisterRequest, RegisterResponse,
    ResetPasswordRequest, ResetPasswordResponse,
};
pub use health::{health_router, HealthResponse};

use axum::Router;
use std::sync::Arc;

use crate::state::AuthState;

/// 전체 API 라우터 생성.
pub fn create_router(state: Arc<AuthState>) -> Router {
    Router::new()
        .nest("/health", health_router())
        .nest("/auth", auth_router(&state))
        .with_state(state)
}
