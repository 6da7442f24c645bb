//! CMS 인증/인가 계층.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Argon2id + pepper 비밀번호 해싱
//! - HS256 Bearer 토큰 발급/검증 (선택적 폐기 목록)
//! - 일회용 비밀번호 재설정 토큰
//! - Axum 인증 게이트 및 역할/권한/조직 범위 인가 게이트
//! - 인증 REST 엔드포인트와 헬스 체크
//! - 설정 기반 초기 superadmin 생성
//!
//! # 모듈 구성
//!
//! - [`auth`]: 해셔, 토큰 코덱, 재설정 토큰, 게이트
//! - [`bootstrap`]: 초기 관리자 계정
//! - [`store`]: 자격 증명 저장소 계약과 구현체
//! - [`state`]: 공유 상태 (AuthState)
//! - [`routes`]: REST API 엔드포인트
//! - [`error`]: 요청 단위 에러 (AuthError)

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;

pub use auth::{
    authenticate, authorize, ensure_org_scope, Authenticated, CredentialHasher, Gate, Identity,
    ResetTokenService, Role, TokenCodec,
};
pub use bootstrap::{seed_superadmin, SeedOutcome};
pub use error::{ApiErrorResponse, AuthError, AuthResult};
pub use routes::create_router;
pub use state::AuthState;
pub use store::{CredentialStore, MemoryUserStore, ResetTokenStore, StoreError, UserStore};
#[cfg(feature = "postgres")]
pub use store::PgUserStore;
