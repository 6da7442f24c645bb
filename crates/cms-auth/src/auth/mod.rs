//! 인증 및 권한 부여.
//!
//! 자체 발급 Bearer 토큰 기반 인증과 역할/권한/조직 범위 기반 인가를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`CredentialHasher`]: Argon2id + pepper 비밀번호 해싱
//! - [`TokenCodec`]: HS256 토큰 발급/검증
//! - [`ResetTokenService`]: 일회용 비밀번호 재설정 토큰
//! - [`authenticate`]: 인증 게이트 미들웨어
//! - [`Gate`] / [`authorize`]: 인가 게이트 미들웨어
//!
//! # 요청 흐름
//!
//! ```text
//! 요청 → authenticate (401) → authorize* (403) → 핸들러 (Authenticated 추출)
//! ```

mod authorize;
mod identity;
mod jwt;
mod middleware;
mod password;
mod permissions;
mod reset;
mod roles;

pub use authorize::{
    authorize, ensure_org_scope, require_org_admin_or_superadmin, require_permission,
    require_role, Gate,
};
pub use identity::Identity;
pub use jwt::{IssuedToken, RevocationList, TokenClaims, TokenCodec, TokenError};
pub use middleware::{authenticate, extract_bearer, Authenticated};
pub use password::{
    hash_password, validate_password_strength, verify_password, CredentialHasher, PasswordError,
};
pub use permissions::{any_permission_matches, permission_matches, WILDCARD};
pub use reset::{generate_reset_token, IssuedResetToken, ResetTokenService, RESET_TOKEN_BYTES};
pub use roles::{validate_roles, Role};
