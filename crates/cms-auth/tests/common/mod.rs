//! 통합 테스트 공용 헬퍼.

#![allow(dead_code)]

use std::sync::Arc;

use argon2::Params;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use cms_auth::{
    create_router, AuthState, CredentialHasher, CredentialStore, Identity, MemoryUserStore,
    TokenCodec,
};
use cms_auth::store::{NewUser, UserRecord};
use cms_core::SecurityConfig;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";
pub const TEST_PEPPER: &str = "test-pepper";
pub const PASSWORD: &str = "Password1";

/// 테스트 환경: 라우터 + 직접 접근 가능한 저장소/상태
pub struct TestApp {
    pub state: Arc<AuthState>,
    pub store: Arc<MemoryUserStore>,
    pub router: Router,
}

pub fn security_config(expose_reset_token: bool) -> SecurityConfig {
    let mut config = SecurityConfig::new(TEST_SECRET, TEST_PEPPER);
    config.expose_reset_token = expose_reset_token;
    config
}

/// 테스트 속도를 위한 저비용 해셔
pub fn fast_hasher() -> CredentialHasher {
    let params = Params::new(1024, 1, 1, None).unwrap();
    CredentialHasher::new(SecretString::from(TEST_PEPPER.to_string()), params).unwrap()
}

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET.as_bytes(), Duration::hours(24))
}

pub fn test_app(expose_reset_token: bool) -> TestApp {
    let store = Arc::new(MemoryUserStore::new());
    let config = security_config(expose_reset_token);
    let state = Arc::new(AuthState::from_parts(
        test_codec(),
        fast_hasher(),
        store.clone(),
        &config,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

impl TestApp {
    /// 역할/조직이 지정된 사용자 생성
    pub async fn seed_user(
        &self,
        email: &str,
        organization_id: Option<&str>,
        roles: &[&str],
    ) -> UserRecord {
        let password_hash = self.state.hasher.hash(PASSWORD).unwrap();
        self.store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                organization_id: organization_id.map(str::to_string),
                roles: roles.iter().map(|r| r.to_string()).collect(),
                permissions: vec![],
            })
            .await
            .unwrap()
    }

    /// 사용자 레코드에 맞는 토큰 발급
    pub fn token_for(&self, user: &UserRecord) -> String {
        let mut identity = Identity::new(user.id.to_string()).with_roles(user.roles.clone());
        if let Some(org) = &user.organization_id {
            identity = identity.with_organization(org.clone());
        }
        self.state
            .codec
            .issue(&identity, Duration::minutes(5))
            .unwrap()
            .token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(&self.router, request).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn put_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
