//! 자격 증명 저장소 계약.
//!
//! 인증 계층은 저장소 구현에 의존하지 않고 아래 trait만 사용합니다.
//!
//! - [`CredentialStore`]: 사용자 생성, 조회, 역할 변경
//! - [`ResetTokenStore`]: 비밀번호 재설정 토큰 저장 및 원자적 소비
//!
//! 구현체는 메모리 저장소([`MemoryUserStore`])와 PostgreSQL 저장소
//! (`postgres` feature, `PgUserStore`)가 있습니다.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryUserStore;
#[cfg(feature = "postgres")]
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cms_core::UserId;

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("이미 존재합니다: {0}")]
    Duplicate(String),
    #[error("레코드를 찾을 수 없습니다")]
    NotFound,
    #[error("저장소 에러: {0}")]
    Backend(String),
}

/// 저장소 Result 타입 별칭.
pub type StoreResult<T> = Result<T, StoreError>;

/// 저장된 사용자 레코드.
///
/// `password_hash`와 재설정 토큰을 포함하므로 응답으로 직렬화하지 않습니다.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub organization_id: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 신규 사용자 입력.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub organization_id: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// 이메일 정규화 (앞뒤 공백 제거 + 소문자).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 사용자 자격 증명 저장소.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 사용자 생성. 이메일이 이미 있으면 `StoreError::Duplicate`.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord>;

    /// 이메일로 조회 (대소문자 무시).
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// ID로 조회.
    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>>;

    /// 조직 소속 사용자 목록 (이메일 순).
    async fn list_by_organization(&self, organization_id: &str) -> StoreResult<Vec<UserRecord>>;

    /// 역할과 권한을 통째로 교체.
    ///
    /// 사용자가 없으면 `StoreError::NotFound`.
    async fn update_roles(
        &self,
        id: UserId,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> StoreResult<UserRecord>;

    /// 저장소 연결 상태 확인.
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// 비밀번호 재설정 토큰 저장소.
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    /// 재설정 토큰 저장. 사용자당 하나만 유지되며 이전 토큰을 덮어씁니다.
    ///
    /// 사용자가 없으면 `StoreError::NotFound`.
    async fn put_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// 재설정 토큰 소비.
    ///
    /// 토큰 일치 + `now < expires_at` 확인, 새 해시 적용, 토큰 삭제를 하나의
    /// 원자적 조건부 갱신으로 수행합니다. 같은 토큰으로 동시에 호출되면
    /// 최대 하나만 `Some`을 받습니다.
    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> StoreResult<Option<UserId>>;

    /// 만료된 재설정 토큰 정리.
    ///
    /// # Returns
    ///
    /// 정리된 토큰 수
    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// 인증 계층이 필요로 하는 저장소 전체.
pub trait UserStore: CredentialStore + ResetTokenStore {}

impl<T: CredentialStore + ResetTokenStore> UserStore for T {}
