//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정은 기본값 → TOML 파일 → `CMS__` 접두사 환경 변수 순으로 덮어씁니다.
//!
//! 서명 키나 pepper 같은 비밀 값은 [`SecretString`]으로 보관되어
//! `Debug` 출력이나 로그에 노출되지 않습니다.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;

use crate::error::{CmsError, CmsResult};

/// HS256 서명 키의 최소 길이 (바이트)
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// 애플리케이션 설정.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 인증/보안 설정
    pub security: SecurityConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 초기 관리자 설정
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 허용할 CORS origin 목록 (비어 있으면 모든 origin 허용)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: default_request_timeout(),
            cors_origins: Vec::new(),
        }
    }
}

/// 인증/보안 설정.
///
/// 프로세스 시작 시 한 번 로드되어 해셔, 토큰 코덱, 재설정 토큰 서비스의
/// 생성자로 전달됩니다.
#[derive(Debug, Deserialize)]
pub struct SecurityConfig {
    /// 토큰 서명 키 (HS256)
    pub jwt_secret: SecretString,
    /// 비밀번호 해싱 전에 덧붙이는 애플리케이션 전역 비밀 값
    pub pepper: SecretString,
    /// 액세스 토큰 수명 (분)
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_minutes: i64,
    /// 비밀번호 재설정 토큰 수명 (분)
    #[serde(default = "default_reset_token_ttl")]
    pub reset_token_ttl_minutes: i64,
    /// Argon2 메모리 비용 (KiB)
    #[serde(default = "default_argon2_memory")]
    pub argon2_memory_kib: u32,
    /// Argon2 반복 횟수
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    /// Argon2 병렬도
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
    /// 재설정 토큰을 응답 본문으로 돌려줄지 여부 (개발/테스트 전용)
    #[serde(default)]
    pub expose_reset_token: bool,
}

fn default_access_token_ttl() -> i64 {
    24 * 60
}
fn default_reset_token_ttl() -> i64 {
    30
}
fn default_argon2_memory() -> u32 {
    19 * 1024
}
fn default_argon2_iterations() -> u32 {
    2
}
fn default_argon2_parallelism() -> u32 {
    1
}

impl SecurityConfig {
    /// 서명 키와 pepper만 지정하고 나머지는 기본값을 사용합니다.
    pub fn new(jwt_secret: impl Into<String>, pepper: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::from(jwt_secret.into()),
            pepper: SecretString::from(pepper.into()),
            access_token_ttl_minutes: default_access_token_ttl(),
            reset_token_ttl_minutes: default_reset_token_ttl(),
            argon2_memory_kib: default_argon2_memory(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            expose_reset_token: false,
        }
    }

    /// 설정 값 검증.
    ///
    /// # Errors
    ///
    /// 서명 키가 너무 짧거나 수명 값이 0 이하이면 `CmsError::Config`를 반환합니다.
    pub fn validate(&self) -> CmsResult<()> {
        let secret_len = self.jwt_secret.expose_secret().len();
        if secret_len < MIN_JWT_SECRET_LEN {
            return Err(CmsError::Config(format!(
                "security.jwt_secret는 최소 {}바이트 이상이어야 합니다 (현재 {}바이트)",
                MIN_JWT_SECRET_LEN, secret_len
            )));
        }
        if self.access_token_ttl_minutes <= 0 {
            return Err(CmsError::Config(
                "security.access_token_ttl_minutes는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.reset_token_ttl_minutes <= 0 {
            return Err(CmsError::Config(
                "security.reset_token_ttl_minutes는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.pepper.expose_secret().is_empty() {
            tracing::warn!("security.pepper is empty; password hashes rely on salt only");
        }
        Ok(())
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 데이터베이스 설정.
///
/// `url`이 없으면 인메모리 저장소로 동작합니다.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL
    #[serde(default)]
    pub url: Option<String>,
    /// 최대 연결 수
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// 초기 superadmin 계정 설정.
///
/// `admin_email`과 `admin_password`가 모두 있을 때만 시작 시 계정을 만듭니다.
/// 같은 이메일의 계정이 이미 있으면 아무것도 바꾸지 않습니다.
#[derive(Debug, Deserialize)]
pub struct BootstrapConfig {
    /// 관리자 이메일
    #[serde(default)]
    pub admin_email: Option<String>,
    /// 관리자 초기 비밀번호
    #[serde(default)]
    pub admin_password: Option<SecretString>,
    /// 관리자가 속할 조직 ID
    #[serde(default = "default_bootstrap_organization")]
    pub organization_id: String,
}

fn default_bootstrap_organization() -> String {
    "default".to_string()
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            admin_password: None,
            organization_id: default_bootstrap_organization(),
        }
    }
}

impl BootstrapConfig {
    /// 관리자 이메일과 비밀번호로 설정 생성.
    pub fn admin(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            admin_email: Some(email.into()),
            admin_password: Some(SecretString::from(password.into())),
            ..Self::default()
        }
    }

    /// 이메일과 비밀번호가 모두 설정되었는지 확인.
    pub fn is_enabled(&self) -> bool {
        self.admin_email.as_deref().is_some_and(|e| !e.trim().is_empty())
            && self
                .admin_password
                .as_ref()
                .is_some_and(|p| !p.expose_secret().is_empty())
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CmsResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("security.pepper", "")?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("CMS")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.security.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CmsResult<Self> {
        Self::load("config/default.toml")
    }
}
