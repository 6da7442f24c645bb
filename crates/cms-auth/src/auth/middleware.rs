//! Axum용 인증 미들웨어.
//!
//! `Authorization: Bearer <token>` 헤더를 검증하고, 성공하면 [`Identity`]를
//! 요청 확장에 붙인 뒤 다음 단계로 넘깁니다. 실패하면 파이프라인을 중단하고
//! 401을 반환합니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(codec.clone(), authenticate));
//!
//! async fn me(Authenticated(identity): Authenticated) -> impl IntoResponse {
//!     format!("Hello, {}!", identity.subject_id())
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::{Identity, TokenCodec};
use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Authorization 헤더에서 Bearer 토큰 추출.
///
/// 헤더가 없거나, 다른 스킴이거나, 토큰 부분이 비어 있으면 `None`.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// 인증 게이트 미들웨어.
///
/// 토큰 검증이 끝난 뒤에만 [`Identity`]를 한 번에 삽입하므로 실패하거나
/// 중간에 취소된 요청에는 부분적인 주체 정보가 남지 않습니다.
pub async fn authenticate(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer(req.headers()).ok_or_else(|| {
        tracing::debug!(reason = "missing or malformed authorization header", "authentication failed");
        AuthError::Unauthenticated
    })?;

    let identity = codec.validate(token).map_err(|e| {
        tracing::debug!(reason = %e, "authentication failed");
        AuthError::Unauthenticated
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// 인증된 주체 추출기.
///
/// [`authenticate`] 미들웨어 뒤의 핸들러에서 사용합니다. 미들웨어 없이
/// 사용되면 주체가 없으므로 401을 반환합니다.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::Unauthenticated)
    }
}
