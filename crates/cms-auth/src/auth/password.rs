//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id 기반 비밀번호 해싱 및 검증.
//!
//! 해싱 입력은 `password + pepper`입니다. pepper는 해시 저장소 밖에 보관되는
//! 애플리케이션 전역 비밀 값이므로, 해시가 유출되어도 pepper 없이는
//! 오프라인 대입 공격을 할 수 없습니다. 솔트와 비용 파라미터는 PHC 문자열에
//! 함께 저장되며 검증 시 해시에서 다시 읽어 옵니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use cms_core::SecurityConfig;
use secrecy::{ExposeSecret, SecretString};

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("잘못된 Argon2 파라미터: {0}")]
    InvalidParams(String),
}

/// 비밀번호와 pepper를 이어 붙인 해싱 입력.
///
/// drop 시 메모리에서 지워집니다.
fn peppered(password: &str, pepper: &str) -> SecretString {
    SecretString::from(format!("{}{}", password, pepper))
}

fn hash_with(argon2: &Argon2<'_>, password: &str, pepper: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let input = peppered(password, pepper);

    let hash = argon2
        .hash_password(input.expose_secret().as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

fn verify_with(argon2: &Argon2<'_>, password: &str, pepper: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::debug!("stored password digest is not a valid PHC string");
            return false;
        }
    };

    let input = peppered(password, pepper);
    // 비교는 argon2 내부의 상수 시간 경로에서 수행됨
    argon2
        .verify_password(input.expose_secret().as_bytes(), &parsed)
        .is_ok()
}

/// 비밀번호 해싱 (기본 Argon2id 파라미터).
///
/// # Returns
///
/// PHC 형식의 해시 문자열 (솔트 포함)
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("my_secure_password", "pepper").unwrap();
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str, pepper: &str) -> Result<String, PasswordError> {
    hash_with(&Argon2::default(), password, pepper)
}

/// 비밀번호 검증.
///
/// 해시에 내장된 솔트/파라미터로 다시 계산하며, 정확히 일치할 때만 `true`입니다.
/// 해시 형식이 잘못되었으면 `false`를 반환합니다.
pub fn verify_password(password: &str, pepper: &str, digest: &str) -> bool {
    verify_with(&Argon2::default(), password, pepper, digest)
}

/// 설정 기반 비밀번호 해셔.
///
/// pepper와 작업 비용(메모리, 반복, 병렬도)을 프로세스 시작 시 한 번 받아 보관합니다.
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    pepper: SecretString,
    /// 존재하지 않는 계정 로그인 시 검증 시간을 맞추기 위한 해시
    dummy_digest: String,
}

impl CredentialHasher {
    /// 새 해셔 생성.
    pub fn new(pepper: SecretString, params: Params) -> Result<Self, PasswordError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_digest = hash_with(&argon2, "dummy-password", pepper.expose_secret())?;

        Ok(Self {
            argon2,
            pepper,
            dummy_digest,
        })
    }

    /// 보안 설정에서 해셔 생성.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        let pepper = SecretString::from(config.pepper.expose_secret().to_owned());
        Self::new(pepper, params)
    }

    /// 비밀번호 해싱.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash_with(&self.argon2, password, self.pepper.expose_secret())
    }

    /// 비밀번호 검증.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        verify_with(&self.argon2, password, self.pepper.expose_secret(), digest)
    }

    /// 결과를 버리는 검증.
    ///
    /// 사용자가 없을 때도 실제 검증과 같은 비용을 치르게 해서
    /// 응답 시간으로 계정 존재 여부를 추측할 수 없게 합니다.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_digest);
    }
}

/// 비밀번호 강도 검증.
///
/// # 요구사항
///
/// - 최소 8자 이상
/// - 최소 1개의 숫자 포함
/// - 최소 1개의 영문자 포함
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("비밀번호는 최소 8자 이상이어야 합니다");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("비밀번호에 최소 1개의 숫자가 포함되어야 합니다");
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("비밀번호에 최소 1개의 영문자가 포함되어야 합니다");
    }

    Ok(())
}
