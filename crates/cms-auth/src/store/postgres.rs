//! PostgreSQL 사용자 저장소.
//!
//! 재설정 토큰 소비는 `UPDATE ... WHERE reset_token = $1 AND
//! reset_token_expires_at > $2 RETURNING id` 한 문장으로 수행되므로
//! 동시에 같은 토큰을 소비해도 한 행만 갱신됩니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cms_core::UserId;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{
    normalize_email, CredentialStore, NewUser, ResetTokenStore, StoreError, StoreResult,
    UserRecord,
};

const USER_COLUMNS: &str = "id, email, password_hash, organization_id, roles, permissions, \
     reset_token, reset_token_expires_at, created_at, updated_at";

/// users 테이블 row.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    organization_id: Option<String>,
    roles: Vec<String>,
    permissions: Vec<String>,
    reset_token: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            organization_id: row.organization_id,
            roles: row.roles,
            permissions: row.permissions,
            reset_token: row.reset_token,
            reset_token_expires_at: row.reset_token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// PostgreSQL 사용자 저장소.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// 데이터베이스에 연결합니다.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(backend)?;

        info!("Database connection established");
        Ok(Self { pool })
    }

    /// 기존 연결 풀 재사용.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 스키마 마이그레이션 실행.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let email = normalize_email(&user.email);
        let query = format!(
            "INSERT INTO users (id, email, password_hash, organization_id, roles, permissions) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );

        let row: UserRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(&email)
            .bind(&user.password_hash)
            .bind(&user.organization_id)
            .bind(&user.roles)
            .bind(&user.permissions)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate(email.clone())
                } else {
                    backend(e)
                }
            })?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(Into::into))
    }

    async fn list_by_organization(&self, organization_id: &str) -> StoreResult<Vec<UserRecord>> {
        let query = format!(
            "SELECT {} FROM users WHERE organization_id = $1 ORDER BY email",
            USER_COLUMNS
        );
        let rows: Vec<UserRow> = sqlx::query_as(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_roles(
        &self,
        id: UserId,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> StoreResult<UserRecord> {
        let query = format!(
            "UPDATE users SET roles = $2, permissions = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(*id.as_uuid())
            .bind(&roles)
            .bind(&permissions)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl ResetTokenStore for PgUserStore {
    async fn put_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(*user_id.as_uuid())
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> StoreResult<Option<UserId>> {
        let id: Option<(Uuid,)> = sqlx::query_as(
            "UPDATE users \
             SET password_hash = $3, reset_token = NULL, reset_token_expires_at = NULL, \
                 updated_at = $2 \
             WHERE reset_token = $1 AND reset_token_expires_at > $2 \
             RETURNING id",
        )
        .bind(token)
        .bind(now)
        .bind(new_password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id.map(|(id,)| UserId::from_uuid(id)))
    }

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL \
             WHERE reset_token IS NOT NULL AND reset_token_expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }
}
