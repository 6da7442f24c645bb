//! 비밀번호 재설정 토큰 동시성/만료 통합 테스트

use std::sync::Arc;

use chrono::{Duration, Utc};
use cms_auth::store::{CredentialStore, NewUser};
use cms_auth::{AuthError, MemoryUserStore, ResetTokenService};
use cms_core::UserId;

async fn setup() -> (Arc<MemoryUserStore>, Arc<ResetTokenService>, UserId) {
    let store = Arc::new(MemoryUserStore::new());
    let user = store
        .create_user(NewUser {
            email: "a@example.com".to_string(),
            password_hash: "original-hash".to_string(),
            organization_id: None,
            roles: vec!["user".to_string()],
            permissions: vec![],
        })
        .await
        .unwrap();

    let service = Arc::new(ResetTokenService::new(store.clone(), Duration::minutes(30)));
    (store, service, user.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consume_exactly_one_wins() {
    let (store, service, user_id) = setup().await;
    let issued = service.request_reset(user_id).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        let token = issued.token.clone();
        handles.push(tokio::spawn(async move {
            let hash = format!("hash-{}", i);
            (hash.clone(), service.consume(&token, &hash).await)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (hash, result) = handle.await.unwrap();
        match result {
            Ok(id) => {
                assert_eq!(id, user_id);
                winners.push(hash);
            }
            Err(e) => assert!(matches!(e, AuthError::InvalidOrExpired)),
        }
    }

    assert_eq!(winners.len(), 1);

    // 저장된 해시는 성공한 요청의 것
    let user = store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.password_hash, winners[0]);
    assert!(user.reset_token.is_none());
}

#[tokio::test]
async fn test_two_concurrent_consumes() {
    let (_store, service, user_id) = setup().await;
    let issued = service.request_reset(user_id).await.unwrap();

    let (a, b) = tokio::join!(
        service.consume(&issued.token, "hash-a"),
        service.consume(&issued.token, "hash-b"),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(AuthError::InvalidOrExpired)));
}

#[tokio::test]
async fn test_token_expires_after_window() {
    let (store, service, user_id) = setup().await;
    let issued_at = Utc::now();
    let issued = service.request_reset_at(user_id, issued_at).await.unwrap();

    assert_eq!(issued.expires_at, issued_at + Duration::minutes(30));

    let result = service
        .consume_at(&issued.token, "new-hash", issued_at + Duration::minutes(31))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidOrExpired)));

    let user = store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.password_hash, "original-hash");
}

#[tokio::test]
async fn test_token_valid_just_before_expiry() {
    let (_store, service, user_id) = setup().await;
    let issued_at = Utc::now();
    let issued = service.request_reset_at(user_id, issued_at).await.unwrap();

    let result = service
        .consume_at(
            &issued.token,
            "new-hash",
            issued_at + Duration::minutes(30) - Duration::seconds(1),
        )
        .await;
    assert_eq!(result.unwrap(), user_id);
}

#[tokio::test]
async fn test_expired_tokens_purged() {
    let (_store, service, user_id) = setup().await;
    service
        .request_reset_at(user_id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(service.purge_expired().await.unwrap(), 1);
    assert_eq!(service.purge_expired().await.unwrap(), 0);
}
