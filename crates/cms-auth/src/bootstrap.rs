//! 초기 superadmin 계정 생성.
//!
//! 역할은 관리자만 바꿀 수 있으므로 첫 관리자는 설정으로 만듭니다.
//! 계정은 `superadmin`, `org_admin` 역할과 `*` 권한을 가집니다.

use cms_core::{BootstrapConfig, UserId};
use secrecy::ExposeSecret;
use tracing::info;

use crate::auth::{validate_password_strength, Role, WILDCARD};
use crate::error::{AuthError, AuthResult};
use crate::state::AuthState;
use crate::store::{NewUser, StoreError};

/// 초기 관리자 생성 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// 설정이 비어 있어 건너뜀
    Disabled,
    /// 새로 생성됨
    Created(UserId),
    /// 같은 이메일의 계정이 이미 있음 (변경하지 않음)
    AlreadyExists,
}

/// 설정된 superadmin 계정을 만듭니다.
///
/// # Errors
///
/// 비밀번호가 강도 검사를 통과하지 못하면 `MalformedRequest`,
/// 저장소 실패는 `Internal`
pub async fn seed_superadmin(
    state: &AuthState,
    config: &BootstrapConfig,
) -> AuthResult<SeedOutcome> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(SeedOutcome::Disabled);
    };
    if !config.is_enabled() {
        return Ok(SeedOutcome::Disabled);
    }

    if state.users.find_by_email(email).await?.is_some() {
        info!("bootstrap admin already exists");
        return Ok(SeedOutcome::AlreadyExists);
    }

    validate_password_strength(password.expose_secret())
        .map_err(|msg| AuthError::MalformedRequest(format!("bootstrap.admin_password: {}", msg)))?;
    let password_hash = state
        .hasher
        .hash(password.expose_secret())
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    let created = state
        .users
        .create_user(NewUser {
            email: email.clone(),
            password_hash,
            organization_id: Some(config.organization_id.clone()),
            roles: vec![
                Role::Superadmin.to_string(),
                Role::OrgAdmin.to_string(),
            ],
            permissions: vec![WILDCARD.to_string()],
        })
        .await;

    match created {
        Ok(user) => {
            info!(subject_id = %user.id, organization_id = %config.organization_id, "bootstrap admin created");
            Ok(SeedOutcome::Created(user.id))
        }
        // 동시에 시작된 다른 인스턴스가 먼저 만든 경우
        Err(StoreError::Duplicate(_)) => Ok(SeedOutcome::AlreadyExists),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use argon2::Params;
    use chrono::Duration;
    use cms_core::SecurityConfig;
    use secrecy::SecretString;

    use super::*;
    use crate::auth::{CredentialHasher, TokenCodec};
    use crate::store::MemoryUserStore;

    const SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn state() -> AuthState {
        let config = SecurityConfig::new(SECRET, "pepper");
        let params = Params::new(1024, 1, 1, None).unwrap();
        let hasher = CredentialHasher::new(SecretString::from("pepper".to_string()), params).unwrap();
        AuthState::from_parts(
            TokenCodec::new(SECRET.as_bytes(), Duration::hours(1)),
            hasher,
            Arc::new(MemoryUserStore::new()),
            &config,
        )
    }

    #[tokio::test]
    async fn test_seed_creates_superadmin_once() {
        let state = state();
        let config = BootstrapConfig::admin("Admin@Example.com", "Admin1234");

        let SeedOutcome::Created(id) = seed_superadmin(&state, &config).await.unwrap() else {
            panic!("expected a new admin");
        };

        let admin = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(admin.email, "admin@example.com");
        assert_eq!(admin.organization_id.as_deref(), Some("default"));
        assert_eq!(admin.roles, vec!["superadmin", "org_admin"]);
        assert_eq!(admin.permissions, vec!["*"]);
        assert!(state.hasher.verify("Admin1234", &admin.password_hash));

        assert_eq!(
            seed_superadmin(&state, &config).await.unwrap(),
            SeedOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_seed_disabled_without_credentials() {
        let state = state();
        assert_eq!(
            seed_superadmin(&state, &BootstrapConfig::default()).await.unwrap(),
            SeedOutcome::Disabled
        );
        assert!(state
            .users
            .find_by_email("admin@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_seed_rejects_weak_password() {
        let state = state();
        let config = BootstrapConfig::admin("admin@example.com", "short");
        assert!(matches!(
            seed_superadmin(&state, &config).await,
            Err(AuthError::MalformedRequest(_))
        ));
    }
}
