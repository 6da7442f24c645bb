//! Bearer 토큰 처리.
//!
//! [`Identity`]를 서명된(HS256) 시간 제한 토큰으로 인코딩하고, 토큰을 다시
//! 검증해 [`Identity`]로 복원합니다.
//!
//! 검증 순서는 고정입니다:
//!
//! 1. 서명 검증 (실패한 토큰의 클레임은 해석하지 않음)
//! 2. 만료 검사 (`now >= exp`이면 만료)
//!
//! `iat`/`exp`는 초 단위입니다. `exp`는 `발급 시각 + ttl`을 초 단위로 올림하므로
//! 토큰은 `발급 시각 + ttl` 이전에 만료되지 않고, 길어야 1초 미만 더 유효합니다.
//! 3. 클레임 형식 검사 (`sub`는 비어 있지 않은 문자열이어야 함)
//! 4. (선택) 폐기 목록 검사
//!
//! 토큰 클레임:
//!
//! | 클레임            | 타입           | 비고                     |
//! |-------------------|----------------|--------------------------|
//! | `sub`             | string         | 필수, subject_id         |
//! | `organization_id` | string         | 선택                     |
//! | `roles`           | array<string>  | 선택, 기본값 빈 배열     |
//! | `permissions`     | array<string>  | 선택, 기본값 빈 배열     |
//! | `iat`             | unix timestamp | issued_at                |
//! | `exp`             | unix timestamp | 필수, expires_at         |
//! | `jti`             | string         | 선택, 폐기 목록 키       |
//!
//! 검증 시에는 `subject_id`/`user_id`, `issued_at`, `expires_at` 이름도 받습니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use cms_core::SecurityConfig;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Identity;

/// 토큰 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - 사용자 ID
    #[serde(alias = "subject_id", alias = "user_id")]
    pub sub: String,
    /// 소속 조직 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// 역할 목록
    #[serde(default)]
    pub roles: Vec<String>,
    /// 권한 목록
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    #[serde(default, alias = "issued_at")]
    pub iat: i64,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    #[serde(alias = "expires_at")]
    pub exp: i64,
    /// JWT ID - 토큰 고유 식별자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenClaims {
    /// 주체 정보로 Claims 생성.
    ///
    /// `exp`는 `issued_at + ttl`을 초 단위로 올림한 값입니다.
    pub fn for_identity(identity: &Identity, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: identity.subject_id().to_string(),
            organization_id: identity.organization_id().map(str::to_string),
            roles: identity.roles().iter().cloned().collect(),
            permissions: identity.permissions().iter().cloned().collect(),
            iat: issued_at.timestamp(),
            exp: ceil_timestamp(issued_at + ttl),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// 주어진 시각에 만료되었는지 확인 (경계 포함).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    fn into_identity(self) -> Identity {
        let identity = Identity::new(self.sub)
            .with_roles(self.roles)
            .with_permissions(self.permissions);

        match self.organization_id {
            Some(org) => identity.with_organization(org),
            None => identity,
        }
    }
}

/// 초 단위 Unix timestamp로 올림.
fn ceil_timestamp(at: DateTime<Utc>) -> i64 {
    if at.timestamp_subsec_nanos() > 0 {
        at.timestamp() + 1
    } else {
        at.timestamp()
    }
}

/// 발급된 토큰.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// 인코딩된 토큰 문자열
    pub token: String,
    /// 토큰 고유 식별자
    pub token_id: String,
    /// 발급 시간 (Unix timestamp)
    pub issued_at: i64,
    /// 만료 시간 (Unix timestamp)
    pub expires_at: i64,
}

impl IssuedToken {
    /// 토큰에 기록된 수명 (초).
    ///
    /// 발급 시각이 초 경계가 아니면 요청한 ttl보다 1초 길 수 있습니다.
    pub fn expires_in(&self) -> i64 {
        self.expires_at - self.issued_at
    }
}

/// 토큰 처리 에러.
///
/// 인증 게이트는 이 구분을 모두 `Unauthenticated`로 합칩니다.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("토큰 수명은 1초 이상이어야 합니다")]
    InvalidTtl,
    #[error("서명이 일치하지 않습니다")]
    InvalidSignature,
    #[error("잘못된 토큰 형식")]
    Malformed,
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("잘못된 토큰 클레임")]
    MalformedClaims,
    #[error("폐기된 토큰")]
    Revoked,
    #[error("토큰 폐기 목록이 설정되지 않았습니다")]
    RevocationDisabled,
}

/// 토큰 폐기 목록.
///
/// 토큰 ID(`jti`)를 키로 토큰 자체의 만료 시각까지만 보관합니다.
/// 만료된 항목은 조회 시 정리됩니다.
#[derive(Debug, Default)]
pub struct RevocationList {
    entries: Mutex<HashMap<String, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 토큰 ID 폐기.
    pub fn revoke(&self, token_id: impl Into<String>, expires_at: i64) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token_id.into(), expires_at);
    }

    /// 폐기 여부 확인.
    pub fn is_revoked(&self, token_id: &str, now: i64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(token_id) {
            Some(&expires_at) if now < expires_at => true,
            Some(_) => {
                entries.remove(token_id);
                false
            }
            None => false,
        }
    }

    /// 만료된 항목 정리.
    ///
    /// # Returns
    ///
    /// 제거된 항목 수
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, expires_at| now < *expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 토큰 코덱.
///
/// 서명 키와 기본 수명은 프로세스 시작 시 한 번 설정되며 호출마다 바뀌지 않습니다.
/// 폐기 목록이 없으면 토큰 유효성은 서명과 내장된 만료 시각만으로 결정됩니다.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    revocations: Option<Arc<RevocationList>>,
}

impl TokenCodec {
    /// 대칭 키로 코덱 생성.
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // 만료는 직접 검사 (경계 포함, leeway 없음)
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            default_ttl,
            revocations: None,
        }
    }

    /// 보안 설정에서 코덱 생성.
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            config.jwt_secret.expose_secret().as_bytes(),
            Duration::minutes(config.access_token_ttl_minutes),
        )
    }

    /// 폐기 목록 연결.
    pub fn with_revocation(mut self, revocations: Arc<RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    /// 기본 토큰 수명.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 토큰 발급 (현재 시각 기준).
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, ttl, Utc::now())
    }

    /// 주어진 시각을 발급 시간으로 토큰 발급.
    pub fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if ttl < Duration::seconds(1) {
            return Err(TokenError::InvalidTtl);
        }

        let claims = TokenClaims::for_identity(identity, now, ttl);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            token_id: claims.jti.unwrap_or_default(),
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// 토큰 검증 (현재 시각 기준).
    pub fn validate(&self, token: &str) -> Result<Identity, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// 주어진 시각 기준으로 토큰 검증.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let claims = self.decode_claims(token, now.timestamp())?;
        Ok(claims.into_identity())
    }

    /// 토큰 폐기.
    ///
    /// 유효한 토큰만 폐기할 수 있으며, 폐기 목록이 연결되어 있어야 합니다.
    pub fn revoke(&self, token: &str) -> Result<(), TokenError> {
        let revocations = self
            .revocations
            .as_ref()
            .ok_or(TokenError::RevocationDisabled)?;

        let claims = self.decode_claims(token, Utc::now().timestamp())?;
        let token_id = claims.jti.ok_or(TokenError::MalformedClaims)?;
        revocations.revoke(token_id, claims.exp);
        Ok(())
    }

    fn decode_claims(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        // 1. 서명 (클레임은 아직 타입 없는 JSON 객체)
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;
        let raw = data.claims;

        // 2. 만료
        let exp = raw
            .get("exp")
            .or_else(|| raw.get("expires_at"))
            .and_then(Value::as_i64)
            .ok_or(TokenError::MalformedClaims)?;
        if now >= exp {
            return Err(TokenError::Expired);
        }

        // 3. 클레임 형식
        let claims: TokenClaims =
            serde_json::from_value(Value::Object(raw)).map_err(|_| TokenError::MalformedClaims)?;
        if claims.sub.trim().is_empty() {
            return Err(TokenError::MalformedClaims);
        }

        // 4. 폐기 목록
        if let (Some(revocations), Some(token_id)) = (&self.revocations, &claims.jti) {
            if revocations.is_revoked(token_id, now) {
                return Err(TokenError::Revoked);
            }
        }

        Ok(claims)
    }
}
