//! 비밀번호 재설정 토큰 흐름.
//!
//! 재설정 토큰은 32바이트 암호학적 난수를 hex로 인코딩한 64자 문자열입니다.
//! 사용자당 하나만 유효하며, 발급 후 설정된 수명(기본 30분) 동안 한 번만
//! 사용할 수 있습니다.
//!
//! 토큰이 없는 경우와 만료된 경우는 모두 [`AuthError::InvalidOrExpired`]로
//! 합쳐집니다. 토큰 값은 로그에 남기지 않습니다.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cms_core::{SecurityConfig, UserId};
use rand::{rngs::OsRng, RngCore};

use crate::error::AuthError;
use crate::store::ResetTokenStore;

/// 재설정 토큰 엔트로피 (바이트)
pub const RESET_TOKEN_BYTES: usize = 32;

/// 새 재설정 토큰 생성.
///
/// # Returns
///
/// 64자 소문자 hex 문자열
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 발급된 재설정 토큰.
#[derive(Debug, Clone)]
pub struct IssuedResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// 재설정 토큰 서비스.
pub struct ResetTokenService {
    store: Arc<dyn ResetTokenStore>,
    ttl: Duration,
}

impl ResetTokenService {
    pub fn new(store: Arc<dyn ResetTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// 보안 설정의 수명으로 서비스 생성.
    pub fn from_config(store: Arc<dyn ResetTokenStore>, config: &SecurityConfig) -> Self {
        Self::new(store, Duration::minutes(config.reset_token_ttl_minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 재설정 토큰 발급 (현재 시각 기준).
    pub async fn request_reset(&self, user_id: UserId) -> Result<IssuedResetToken, AuthError> {
        self.request_reset_at(user_id, Utc::now()).await
    }

    /// 주어진 시각 기준으로 재설정 토큰 발급.
    ///
    /// 같은 사용자의 이전 토큰은 무효가 됩니다.
    pub async fn request_reset_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedResetToken, AuthError> {
        let token = generate_reset_token();
        let expires_at = now + self.ttl;

        self.store
            .put_reset_token(user_id, &token, expires_at)
            .await?;

        tracing::info!(subject_id = %user_id, %expires_at, "password reset token issued");
        Ok(IssuedResetToken { token, expires_at })
    }

    /// 재설정 토큰 소비 (현재 시각 기준).
    pub async fn consume(&self, token: &str, new_password_hash: &str) -> Result<UserId, AuthError> {
        self.consume_at(token, new_password_hash, Utc::now()).await
    }

    /// 주어진 시각 기준으로 재설정 토큰 소비.
    ///
    /// 성공하면 새 해시가 적용되고 토큰은 삭제됩니다.
    pub async fn consume_at(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MalformedRequest("token is required".to_string()));
        }

        match self
            .store
            .consume_reset_token(token, now, new_password_hash)
            .await?
        {
            Some(user_id) => {
                tracing::info!(subject_id = %user_id, "password reset completed");
                Ok(user_id)
            }
            None => {
                tracing::debug!("password reset rejected: token unknown or expired");
                Err(AuthError::InvalidOrExpired)
            }
        }
    }

    /// 만료된 토큰 정리.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.store.purge_expired_reset_tokens(Utc::now()).await?)
    }
}
