//! 인증 API 엔드포인트.
//!
//! # 라우트
//!
//! | 메서드 | 경로                                     | 게이트                      |
//! |--------|------------------------------------------|-----------------------------|
//! | POST   | `/register`                              | 없음                        |
//! | POST   | `/login`                                 | 없음                        |
//! | POST   | `/forgot-password`                       | 없음                        |
//! | POST   | `/reset-password`                        | 없음                        |
//! | GET    | `/me`                                    | 인증                        |
//! | GET    | `/organizations/{org_id}/members`        | 인증 + org_admin/superadmin |
//! | PUT    | `/users/{id}/roles`                      | 인증 + org_admin/superadmin |

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use cms_core::UserId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{
    authenticate, authorize, ensure_org_scope, validate_password_strength, validate_roles,
    Authenticated, CredentialHasher, Gate, Identity, Role, WILDCARD,
};
use crate::error::{AuthError, AuthResult};
use crate::state::AuthState;
use crate::store::{NewUser, UserRecord};

// ==================== 요청/응답 타입 ====================

/// JSON 본문 추출기. 파싱 실패는 `MalformedRequest`로 변환됩니다.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct ApiJson<T>(pub T);

/// 회원가입 요청.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "올바른 이메일 형식이 아닙니다"))]
    pub email: String,
    pub password: String,
}

/// 회원가입 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: UserId,
    pub email: String,
}

/// 로그인 요청.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// 토큰 수명 (초)
    pub expires_in: i64,
}

/// 현재 사용자 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub organization_id: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// 비밀번호 재설정 요청.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// 비밀번호 재설정 요청 응답.
///
/// 계정 존재 여부와 관계없이 같은 메시지를 돌려줍니다.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    /// `expose_reset_token`이 켜져 있을 때만 포함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

/// 비밀번호 재설정 실행 요청.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

/// 비밀번호 재설정 실행 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    pub status: String,
}

/// 조직 구성원 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: UserId,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<UserRecord> for MemberResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            roles: user.roles,
        }
    }
}

/// 역할/권한 변경 요청.
///
/// 두 목록 모두 기존 값을 통째로 대체합니다.
#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// 역할/권한 변경 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRolesResponse {
    pub id: UserId,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

const FORGOT_PASSWORD_MESSAGE: &str = "if the account exists, a reset token has been issued";

// ==================== 헬퍼 ====================

/// Argon2 해싱은 CPU 작업이므로 blocking 스레드에서 실행.
async fn hash_blocking(hasher: Arc<CredentialHasher>, password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .map_err(|e| AuthError::Internal(e.to_string()))
}

/// 비밀번호 검증. 사용자가 없으면 더미 해시로 같은 비용을 치른 뒤 `false`.
async fn verify_blocking(
    hasher: Arc<CredentialHasher>,
    password: String,
    digest: Option<String>,
) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || match digest {
        Some(digest) => hasher.verify(&password, &digest),
        None => {
            hasher.verify_dummy(&password);
            false
        }
    })
    .await
    .map_err(|e| AuthError::Internal(e.to_string()))
}

fn identity_for(user: &UserRecord) -> Identity {
    let identity = Identity::new(user.id.to_string())
        .with_roles(user.roles.iter().cloned())
        .with_permissions(user.permissions.iter().cloned());

    match &user.organization_id {
        Some(org) => identity.with_organization(org.clone()),
        None => identity,
    }
}

// ==================== 핸들러 ====================

/// 회원가입.
///
/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AuthState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AuthResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;
    validate_password_strength(&req.password)
        .map_err(|msg| AuthError::MalformedRequest(msg.to_string()))?;

    let password_hash = hash_blocking(state.hasher.clone(), req.password).await?;

    let user = state
        .users
        .create_user(NewUser {
            email: req.email,
            password_hash,
            organization_id: None,
            roles: vec![Role::User.to_string()],
            permissions: Vec::new(),
        })
        .await?;

    tracing::info!(subject_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

/// 로그인.
///
/// 존재하지 않는 이메일과 틀린 비밀번호는 같은 401입니다.
///
/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AuthState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AuthResult<Json<LoginResponse>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AuthError::MalformedRequest(
            "email and password are required".to_string(),
        ));
    }

    let user = state.users.find_by_email(&req.email).await?;
    let digest = user.as_ref().map(|u| u.password_hash.clone());

    let verified = verify_blocking(state.hasher.clone(), req.password, digest).await?;
    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::debug!(reason = "invalid credentials", "login failed");
            return Err(AuthError::Unauthenticated);
        }
    };

    let ttl = state.codec.default_ttl();
    let issued = state
        .codec
        .issue(&identity_for(&user), ttl)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    tracing::info!(subject_id = %user.id, "login succeeded");

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: ttl.num_seconds(),
    }))
}

/// 현재 인증된 사용자 정보.
///
/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AuthState>>,
    Authenticated(identity): Authenticated,
) -> AuthResult<Json<MeResponse>> {
    let user_id: UserId = identity.subject_id().parse()?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    Ok(Json(MeResponse {
        id: identity.subject_id().to_string(),
        email: user.email,
        organization_id: identity.organization_id().map(str::to_string),
        roles: identity.roles().iter().cloned().collect(),
        permissions: identity.permissions().iter().cloned().collect(),
    }))
}

/// 비밀번호 재설정 토큰 요청.
///
/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<Arc<AuthState>>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> AuthResult<Json<ForgotPasswordResponse>> {
    if req.email.trim().is_empty() {
        return Err(AuthError::MalformedRequest("email is required".to_string()));
    }

    let reset_token = match state.users.find_by_email(&req.email).await? {
        Some(user) => match state.resets.request_reset(user.id).await {
            Ok(issued) => Some(issued.token),
            // 조회 직후 계정이 삭제된 경우도 없는 이메일과 같은 응답
            Err(AuthError::NotFound) => None,
            Err(e) => return Err(e),
        },
        None => {
            tracing::debug!("password reset requested for unknown email");
            None
        }
    };

    Ok(Json(ForgotPasswordResponse {
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
        reset_token: reset_token.filter(|_| state.expose_reset_token),
    }))
}

/// 비밀번호 재설정 실행.
///
/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AuthState>>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> AuthResult<Json<ResetPasswordResponse>> {
    if req.token.is_empty() || req.new_password.is_empty() {
        return Err(AuthError::MalformedRequest(
            "token and new_password are required".to_string(),
        ));
    }
    validate_password_strength(&req.new_password)
        .map_err(|msg| AuthError::MalformedRequest(msg.to_string()))?;

    let password_hash = hash_blocking(state.hasher.clone(), req.new_password).await?;
    state.resets.consume(&req.token, &password_hash).await?;

    Ok(Json(ResetPasswordResponse {
        status: "password reset".to_string(),
    }))
}

/// 조직 구성원 목록.
///
/// GET /auth/organizations/{org_id}/members
pub async fn list_members(
    State(state): State<Arc<AuthState>>,
    Authenticated(identity): Authenticated,
    Path(org_id): Path<String>,
) -> AuthResult<Json<Vec<MemberResponse>>> {
    ensure_org_scope(&identity, &org_id)?;

    let members = state.users.list_by_organization(&org_id).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

/// 사용자 역할/권한 변경.
///
/// org_admin은 자기 조직 사용자만 바꿀 수 있습니다. `superadmin` 역할과 `*` 권한은
/// superadmin만 부여할 수 있습니다. 변경은 대상 사용자의 다음 로그인부터 반영됩니다.
///
/// PUT /auth/users/{id}/roles
pub async fn update_user_roles(
    State(state): State<Arc<AuthState>>,
    Authenticated(identity): Authenticated,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<UpdateRolesRequest>,
) -> AuthResult<Json<UpdateRolesResponse>> {
    let user_id: UserId = user_id.parse()?;
    validate_roles(req.roles.iter().map(String::as_str))
        .map_err(|unknown| AuthError::MalformedRequest(format!("unknown role: {}", unknown)))?;
    if req.permissions.iter().any(|p| p.trim().is_empty()) {
        return Err(AuthError::MalformedRequest(
            "permissions must not be empty strings".to_string(),
        ));
    }

    // 없는 사용자와 다른 조직 사용자는 org_admin에게 같은 403
    let target = state.users.find_by_id(user_id).await?;
    match target.as_ref().and_then(|u| u.organization_id.as_deref()) {
        Some(org) => ensure_org_scope(&identity, org)?,
        None if identity.is_superadmin() => {}
        None => return Err(AuthError::Forbidden),
    }
    let target = target.ok_or(AuthError::NotFound)?;

    let escalates = req.roles.iter().any(|r| r == Role::Superadmin.as_str())
        || req.permissions.iter().any(|p| p == WILDCARD);
    if escalates && !identity.is_superadmin() {
        tracing::debug!(subject_id = %identity.subject_id(), "superadmin grant denied");
        return Err(AuthError::Forbidden);
    }

    let roles: Vec<String> = req.roles.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let permissions: Vec<String> = req
        .permissions
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let updated = state.users.update_roles(target.id, roles, permissions).await?;

    tracing::info!(
        subject_id = %updated.id,
        changed_by = %identity.subject_id(),
        roles = ?updated.roles,
        "user roles updated"
    );

    Ok(Json(UpdateRolesResponse {
        id: updated.id,
        roles: updated.roles,
        permissions: updated.permissions,
    }))
}

// ==================== 라우터 ====================

/// 인증 라우터 생성.
///
/// 보호된 라우트에는 인증 게이트가 `route_layer`로 붙습니다.
pub fn auth_router(state: &AuthState) -> Router<Arc<AuthState>> {
    let org_admin = Router::new()
        .route("/organizations/{org_id}/members", get(list_members))
        .route("/users/{id}/roles", put(update_user_roles))
        .route_layer(middleware::from_fn_with_state(
            Gate::org_admin_or_superadmin(),
            authorize,
        ));

    let protected = Router::new()
        .route("/me", get(me))
        .merge(org_admin)
        .route_layer(middleware::from_fn_with_state(
            state.codec.clone(),
            authenticate,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .merge(protected)
}
