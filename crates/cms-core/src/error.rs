//! CMS 백엔드의 공통 에러 타입.
//!
//! 인증 계층의 요청 단위 에러(`AuthError`)와 달리, 이 모듈의 에러는
//! 설정 로드나 저장소 연결처럼 프로세스 수준 작업에서 발생합니다.

use thiserror::Error;

/// 공통 에러.
#[derive(Debug, Error)]
pub enum CmsError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 공통 Result 타입.
pub type CmsResult<T> = Result<T, CmsError>;

impl CmsError {
    /// 호출자의 입력이 원인인 에러인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CmsError::InvalidInput(_))
    }
}

impl From<config::ConfigError> for CmsError {
    fn from(err: config::ConfigError) -> Self {
        CmsError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CmsError {
    fn from(err: serde_json::Error) -> Self {
        CmsError::Serialization(err.to_string())
    }
}
