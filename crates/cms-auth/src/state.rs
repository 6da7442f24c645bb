//! 모든 핸들러에서 공유되는 인증 상태.
//!
//! 프로세스 시작 시 [`SecurityConfig`]로 한 번 만들어지고 `Arc`로 공유됩니다.
//! 서명 키, pepper, 저장소 핸들은 전역 변수가 아니라 이 값을 통해서만 전달됩니다.

use std::sync::Arc;

use cms_core::SecurityConfig;

use crate::auth::{CredentialHasher, PasswordError, ResetTokenService, TokenCodec};
use crate::store::UserStore;

/// 인증 계층 공유 상태.
#[derive(Clone)]
pub struct AuthState {
    /// 토큰 발급/검증
    pub codec: Arc<TokenCodec>,
    /// 비밀번호 해싱
    pub hasher: Arc<CredentialHasher>,
    /// 사용자 저장소
    pub users: Arc<dyn UserStore>,
    /// 비밀번호 재설정 흐름
    pub resets: Arc<ResetTokenService>,
    /// forgot-password 응답에 재설정 토큰 포함 여부 (개발/테스트 전용)
    pub expose_reset_token: bool,
}

impl AuthState {
    /// 보안 설정과 저장소로 상태 생성.
    ///
    /// # Errors
    ///
    /// Argon2 파라미터가 잘못되었으면 `PasswordError::InvalidParams`
    pub fn new<S>(config: &SecurityConfig, users: Arc<S>) -> Result<Self, PasswordError>
    where
        S: UserStore + 'static,
    {
        let hasher = CredentialHasher::from_config(config)?;
        Ok(Self::from_parts(
            TokenCodec::from_config(config),
            hasher,
            users,
            config,
        ))
    }

    /// 미리 만든 코덱/해셔로 상태 생성.
    ///
    /// 폐기 목록이 연결된 코덱이나 테스트용 저비용 해셔를 넣을 때 사용합니다.
    pub fn from_parts<S>(
        codec: TokenCodec,
        hasher: CredentialHasher,
        users: Arc<S>,
        config: &SecurityConfig,
    ) -> Self
    where
        S: UserStore + 'static,
    {
        let resets = ResetTokenService::from_config(users.clone(), config);

        Self {
            codec: Arc::new(codec),
            hasher: Arc::new(hasher),
            users,
            resets: Arc::new(resets),
            expose_reset_token: config.expose_reset_token,
        }
    }
}
