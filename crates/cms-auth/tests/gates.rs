//! 인증/인가 게이트 파이프라인 통합 테스트
//!
//! 게이트가 실패하면 다운스트림 핸들러가 호출되지 않아야 합니다.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use chrono::Duration;
use cms_auth::{authenticate, authorize, Authenticated, Gate, Identity, TokenCodec};
use serde_json::{json, Value};

use common::{get_with_token, send, test_codec};

struct Pipeline {
    codec: Arc<TokenCodec>,
    hits: Arc<AtomicUsize>,
    router: Router,
}

/// 게이트 하나를 인증 게이트 뒤에 두는 라우터
fn pipeline(gate: Gate) -> Pipeline {
    let codec = Arc::new(test_codec());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let handler = move |Authenticated(identity): Authenticated| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "subject_id": identity.subject_id() }))
        }
    };

    let router = Router::new()
        .route("/protected", get(handler))
        .route_layer(middleware::from_fn_with_state(gate, authorize))
        .route_layer(middleware::from_fn_with_state(codec.clone(), authenticate));

    Pipeline {
        codec,
        hits,
        router,
    }
}

impl Pipeline {
    fn token(&self, identity: &Identity) -> String {
        self.codec.issue(identity, Duration::minutes(5)).unwrap().token
    }

    async fn call(&self, token: Option<&str>) -> (StatusCode, Value) {
        send(&self.router, get_with_token("/protected", token)).await
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_role_gate_forbidden_for_plain_user() {
    let p = pipeline(Gate::role("org_admin"));
    let token = p.token(&Identity::new("u1").with_roles(["user"]));

    let (status, body) = p.call(Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(p.hits(), 0);
}

#[tokio::test]
async fn test_role_gate_passes_and_identity_reaches_handler() {
    let p = pipeline(Gate::role("org_admin"));
    let token = p.token(&Identity::new("u1").with_roles(["org_admin"]));

    let (status, body) = p.call(Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject_id"], "u1");
    assert_eq!(p.hits(), 1);
}

#[tokio::test]
async fn test_org_admin_or_superadmin_gate() {
    let p = pipeline(Gate::org_admin_or_superadmin());

    let superadmin = p.token(&Identity::new("root").with_roles(["superadmin"]));
    let (status, _) = p.call(Some(&superadmin)).await;
    assert_eq!(status, StatusCode::OK);

    let user = p.token(&Identity::new("u1").with_roles(["user"]));
    let (status, _) = p.call(Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(p.hits(), 1);
}

#[tokio::test]
async fn test_permission_gate() {
    let p = pipeline(Gate::permission("articles:read"));

    let cases = [
        (vec!["articles:read"], StatusCode::OK),
        (vec!["articles:write"], StatusCode::FORBIDDEN),
        (vec!["*"], StatusCode::OK),
        (vec!["articles"], StatusCode::FORBIDDEN),
        (vec!["articles:"], StatusCode::OK),
        (vec!["users:read", "articles:read"], StatusCode::OK),
        (vec![], StatusCode::FORBIDDEN),
    ];

    for (permissions, expected) in cases {
        let token = p.token(&Identity::new("u1").with_permissions(permissions.clone()));
        let (status, _) = p.call(Some(&token)).await;
        assert_eq!(status, expected, "permissions {:?}", permissions);
    }
}

#[tokio::test]
async fn test_authentication_runs_before_authorization() {
    let p = pipeline(Gate::role("user"));

    let (status, body) = p.call(None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = p.call(Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(p.hits(), 0);
}

#[tokio::test]
async fn test_expired_token_never_reaches_gate() {
    let p = pipeline(Gate::role("user"));
    let issued = p
        .codec
        .issue_at(
            &Identity::new("u1").with_roles(["user"]),
            Duration::minutes(1),
            chrono::Utc::now() - Duration::minutes(2),
        )
        .unwrap();

    let (status, _) = p.call(Some(&issued.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(p.hits(), 0);
}

#[tokio::test]
async fn test_gate_without_authentication_fails_closed() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    // 인증 게이트 없이 인가 게이트만 배치
    let router = Router::new()
        .route(
            "/open",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }
            }),
        )
        .route_layer(middleware::from_fn_with_state(
            Gate::permission("articles:read"),
            authorize,
        ));

    let codec = test_codec();
    let token = codec
        .issue(&Identity::new("u1").with_permissions(["*"]), Duration::minutes(5))
        .unwrap()
        .token;

    let (status, _) = send(&router, get_with_token("/open", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extractor_without_middleware_is_unauthenticated() {
    let router: Router = Router::new().route(
        "/me",
        get(|Authenticated(identity): Authenticated| async move {
            identity.subject_id().to_string()
        }),
    );

    let (status, _) = send(&router, get_with_token("/me", Some("anything"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
