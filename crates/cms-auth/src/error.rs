//! 인증 계층의 요청 단위 에러.
//!
//! 모든 에러는 현재 요청에만 영향을 주며 자동으로 재시도되지 않습니다.
//! HTTP 응답으로 변환될 때 본문은 다음 형식을 따릅니다:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "UNAUTHORIZED",
//!     "message": "인증이 필요합니다"
//!   }
//! }
//! ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// 에러 응답 본문의 `error` 필드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "UNAUTHORIZED", "FORBIDDEN")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: ApiErrorResponse,
}

/// 인증/인가 에러.
///
/// `Unauthenticated`는 어떤 검사(헤더, 서명, 만료, 클레임)가 실패했는지
/// 드러내지 않습니다. 상세 사유는 debug 로그로만 남깁니다.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 토큰 없음/형식 오류/서명 불일치/만료
    #[error("인증이 필요합니다")]
    Unauthenticated,
    /// 인증은 되었으나 역할/권한/조직 범위 부족
    #[error("권한이 부족합니다")]
    Forbidden,
    /// 재설정 토큰이 없거나 만료됨 (구분하지 않음)
    #[error("유효하지 않거나 만료된 토큰입니다")]
    InvalidOrExpired,
    /// 구조적으로 잘못된 입력
    #[error("잘못된 요청: {0}")]
    MalformedRequest(String),
    /// 대상 리소스 없음
    #[error("대상을 찾을 수 없습니다")]
    NotFound,
    /// 이미 존재하는 리소스
    #[error("이미 존재합니다: {0}")]
    Conflict(String),
    /// 저장소 등 내부 실패
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP 상태 코드와 에러 코드.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::InvalidOrExpired => (StatusCode::BAD_REQUEST, "INVALID_OR_EXPIRED_TOKEN"),
            AuthError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "MALFORMED_REQUEST"),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AuthError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // 내부 에러 상세는 클라이언트에 노출하지 않음
        let message = match &self {
            AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error while handling auth request");
                "내부 에러가 발생했습니다".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorBody {
            error: ApiErrorResponse::new(code, message),
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AuthError::Conflict(what),
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Backend(detail) => AuthError::Internal(detail),
        }
    }
}

impl From<cms_core::CmsError> for AuthError {
    fn from(err: cms_core::CmsError) -> Self {
        match err {
            cms_core::CmsError::InvalidInput(msg) => AuthError::MalformedRequest(msg),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::MalformedRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::MalformedRequest(errors.to_string())
    }
}

/// 인증 핸들러 Result 타입 별칭.
pub type AuthResult<T> = Result<T, AuthError>;
