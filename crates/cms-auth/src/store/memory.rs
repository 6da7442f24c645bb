//! 메모리 기반 사용자 저장소.
//!
//! 단일 프로세스 개발/테스트용입니다. 재설정 토큰 소비는 쓰기 잠금 하나
//! 안에서 조회, 만료 검사, 해시 적용, 토큰 삭제를 모두 끝냅니다.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cms_core::UserId;
use tokio::sync::RwLock;

use super::{
    normalize_email, CredentialStore, NewUser, ResetTokenStore, StoreError, StoreResult,
    UserRecord,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<String, UserId>,
    by_reset_token: HashMap<String, UserId>,
}

impl Inner {
    /// 사용자의 재설정 토큰과 인덱스를 함께 제거.
    fn clear_reset_token(&mut self, user_id: UserId) {
        if let Some(user) = self.users.get_mut(&user_id) {
            if let Some(token) = user.reset_token.take() {
                self.by_reset_token.remove(&token);
            }
            user.reset_token_expires_at = None;
        }
    }
}

/// 메모리 사용자 저장소.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 사용자 수.
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let email = normalize_email(&user.email);
        let mut inner = self.inner.write().await;

        if inner.by_email.contains_key(&email) {
            return Err(StoreError::Duplicate(email));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(),
            email: email.clone(),
            password_hash: user.password_hash,
            organization_id: user.organization_id,
            roles: user.roles,
            permissions: user.permissions,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        inner.by_email.insert(email, record.id);
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn list_by_organization(&self, organization_id: &str) -> StoreResult<Vec<UserRecord>> {
        let inner = self.inner.read().await;
        let mut users: Vec<UserRecord> = inner
            .users
            .values()
            .filter(|u| u.organization_id.as_deref() == Some(organization_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn update_roles(
        &self,
        id: UserId,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> StoreResult<UserRecord> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.roles = roles;
        user.permissions = permissions;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl ResetTokenStore for MemoryUserStore {
    async fn put_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        inner.clear_reset_token(user_id);

        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.reset_token = Some(token.to_string());
        user.reset_token_expires_at = Some(expires_at);
        user.updated_at = Utc::now();
        inner.by_reset_token.insert(token.to_string(), user_id);
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> StoreResult<Option<UserId>> {
        let mut inner = self.inner.write().await;

        let Some(&user_id) = inner.by_reset_token.get(token) else {
            return Ok(None);
        };

        let live = inner
            .users
            .get(&user_id)
            .and_then(|u| u.reset_token_expires_at)
            .is_some_and(|expires_at| now < expires_at);
        if !live {
            return Ok(None);
        }

        inner.clear_reset_token(user_id);
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.password_hash = new_password_hash.to_string();
        user.updated_at = now;
        Ok(Some(user_id))
    }

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let expired: Vec<UserId> = inner
            .users
            .values()
            .filter(|u| u.reset_token_expires_at.is_some_and(|at| now >= at))
            .map(|u| u.id)
            .collect();

        for user_id in &expired {
            inner.clear_reset_token(*user_id);
        }
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str, org: Option<&str>) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            organization_id: org.map(str::to_string),
            roles: vec!["user".to_string()],
            permissions: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryUserStore::new();
        let created = store.create_user(new_user("Alice@Example.com ", None)).await.unwrap();
        assert_eq!(created.email, "alice@example.com");

        let by_email = store.find_by_email("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");

        assert!(store.find_by_email("bob@example.com").await.unwrap().is_none());
        assert!(store.find_by_id(UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("a@example.com", None)).await.unwrap();
        assert!(matches!(
            store.create_user(new_user("A@EXAMPLE.COM", None)).await,
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_by_organization() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("b@example.com", Some("o1"))).await.unwrap();
        store.create_user(new_user("a@example.com", Some("o1"))).await.unwrap();
        store.create_user(new_user("c@example.com", Some("o2"))).await.unwrap();
        store.create_user(new_user("d@example.com", None)).await.unwrap();

        let members = store.list_by_organization("o1").await.unwrap();
        let emails: Vec<&str> = members.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_update_roles_replaces_both_sets() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("a@example.com", Some("o1"))).await.unwrap();

        let updated = store
            .update_roles(
                user.id,
                vec!["org_admin".to_string()],
                vec!["articles:".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(updated.roles, vec!["org_admin"]);
        assert_eq!(updated.permissions, vec!["articles:"]);

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.roles, vec!["org_admin"]);
        assert_eq!(stored.password_hash, user.password_hash);

        assert!(matches!(
            store.update_roles(UserId::new(), vec![], vec![]).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_token() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("a@example.com", None)).await.unwrap();
        let now = Utc::now();
        let later = now + Duration::minutes(30);

        store.put_reset_token(user.id, "first", later).await.unwrap();
        store.put_reset_token(user.id, "second", later).await.unwrap();

        assert_eq!(store.consume_reset_token("first", now, "h1").await.unwrap(), None);
        assert_eq!(
            store.consume_reset_token("second", now, "h2").await.unwrap(),
            Some(user.id)
        );
    }

    #[tokio::test]
    async fn test_put_for_unknown_user() {
        let store = MemoryUserStore::new();
        assert!(matches!(
            store.put_reset_token(UserId::new(), "t", Utc::now()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_consume_applies_hash_once() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("a@example.com", None)).await.unwrap();
        let now = Utc::now();
        store
            .put_reset_token(user.id, "tok", now + Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(
            store.consume_reset_token("tok", now, "new-hash").await.unwrap(),
            Some(user.id)
        );
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_token_expires_at.is_none());

        assert_eq!(store.consume_reset_token("tok", now, "other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_consume_expired_token() {
        let store = MemoryUserStore::new();
        let user = store.create_user(new_user("a@example.com", None)).await.unwrap();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(30);
        store.put_reset_token(user.id, "tok", expires_at).await.unwrap();

        // 만료 시각 자체도 만료
        assert_eq!(
            store.consume_reset_token("tok", expires_at, "h").await.unwrap(),
            None
        );
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "$argon2id$placeholder");
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryUserStore::new();
        let a = store.create_user(new_user("a@example.com", None)).await.unwrap();
        let b = store.create_user(new_user("b@example.com", None)).await.unwrap();
        let now = Utc::now();

        store.put_reset_token(a.id, "old", now - Duration::minutes(1)).await.unwrap();
        store.put_reset_token(b.id, "fresh", now + Duration::minutes(10)).await.unwrap();

        assert_eq!(store.purge_expired_reset_tokens(now).await.unwrap(), 1);
        assert_eq!(
            store.consume_reset_token("fresh", now, "h").await.unwrap(),
            Some(b.id)
        );
    }
}
