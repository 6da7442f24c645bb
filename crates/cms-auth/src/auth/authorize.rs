//! 인가 게이트.
//!
//! 인증 게이트가 붙인 [`Identity`]에 대한 세 가지 독립적인 검사를 제공합니다:
//!
//! - 역할 보유 ([`Gate::Role`])
//! - `org_admin` 또는 `superadmin` ([`Gate::OrgAdminOrSuperadmin`])
//! - 권한 일치 ([`Gate::Permission`], 정확/와일드카드/네임스페이스 접두사)
//!
//! 주체가 없으면 항상 `Forbidden`입니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let admin_routes = Router::new()
//!     .route("/organizations/{org_id}/members", get(list_members))
//!     .route_layer(middleware::from_fn_with_state(
//!         Gate::org_admin_or_superadmin(),
//!         authorize,
//!     ))
//!     .route_layer(middleware::from_fn_with_state(codec, authenticate));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::{Identity, Role};
use crate::error::AuthError;

/// 인가 게이트 종류.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// 지정한 역할을 보유해야 함
    Role(String),
    /// `org_admin` 또는 `superadmin` 중 하나를 보유해야 함
    OrgAdminOrSuperadmin,
    /// 지정한 권한을 충족해야 함
    Permission(String),
}

impl Gate {
    pub fn role(role: impl Into<String>) -> Self {
        Gate::Role(role.into())
    }

    pub fn org_admin_or_superadmin() -> Self {
        Gate::OrgAdminOrSuperadmin
    }

    pub fn permission(permission: impl Into<String>) -> Self {
        Gate::Permission(permission.into())
    }

    /// 게이트 검사.
    pub fn check(&self, identity: Option<&Identity>) -> Result<(), AuthError> {
        let identity = identity.ok_or_else(|| {
            tracing::debug!(gate = ?self, "authorization denied: no identity in request");
            AuthError::Forbidden
        })?;

        match self {
            Gate::Role(role) => require_role(identity, role),
            Gate::OrgAdminOrSuperadmin => require_org_admin_or_superadmin(identity),
            Gate::Permission(permission) => require_permission(identity, permission),
        }
    }
}

/// 인가 게이트 미들웨어.
pub async fn authorize(
    State(gate): State<Gate>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    gate.check(req.extensions().get::<Identity>())?;
    Ok(next.run(req).await)
}

fn deny(identity: &Identity, requirement: &str) -> AuthError {
    tracing::debug!(
        subject_id = %identity.subject_id(),
        requirement = %requirement,
        "authorization denied"
    );
    AuthError::Forbidden
}

/// 역할 보유 검사.
pub fn require_role(identity: &Identity, role: &str) -> Result<(), AuthError> {
    if identity.has_role(role) {
        Ok(())
    } else {
        Err(deny(identity, role))
    }
}

/// `org_admin` 또는 `superadmin` 검사.
pub fn require_org_admin_or_superadmin(identity: &Identity) -> Result<(), AuthError> {
    if identity.has_any_role(&[Role::OrgAdmin, Role::Superadmin]) {
        Ok(())
    } else {
        Err(deny(identity, "org_admin|superadmin"))
    }
}

/// 권한 검사.
pub fn require_permission(identity: &Identity, permission: &str) -> Result<(), AuthError> {
    if identity.has_permission(permission) {
        Ok(())
    } else {
        Err(deny(identity, permission))
    }
}

/// 조직 범위 검사.
///
/// `superadmin`은 모든 조직에 접근할 수 있고, 그 외에는 주체의 조직이
/// 대상 조직과 같아야 합니다.
pub fn ensure_org_scope(identity: &Identity, organization_id: &str) -> Result<(), AuthError> {
    if identity.is_superadmin() || identity.belongs_to(organization_id) {
        Ok(())
    } else {
        Err(deny(identity, "organization scope"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_gate() {
        let user = Identity::new("u1").with_roles(["user"]);
        assert!(matches!(
            Gate::role("org_admin").check(Some(&user)),
            Err(AuthError::Forbidden)
        ));
        assert!(Gate::role("user").check(Some(&user)).is_ok());
    }

    #[test]
    fn test_org_admin_or_superadmin_gate() {
        let gate = Gate::org_admin_or_superadmin();

        let superadmin = Identity::new("u1").with_roles(["superadmin"]);
        let org_admin = Identity::new("u2").with_roles(["org_admin"]);
        let user = Identity::new("u3").with_roles(["user"]);

        assert!(gate.check(Some(&superadmin)).is_ok());
        assert!(gate.check(Some(&org_admin)).is_ok());
        assert!(gate.check(Some(&user)).is_err());
    }

    #[test]
    fn test_permission_gate() {
        let identity = Identity::new("u1").with_permissions(["articles:read"]);
        assert!(Gate::permission("articles:read").check(Some(&identity)).is_ok());
        assert!(Gate::permission("articles:write").check(Some(&identity)).is_err());

        let bare = Identity::new("u2").with_permissions(["articles"]);
        assert!(Gate::permission("articles:read").check(Some(&bare)).is_err());

        let namespace = Identity::new("u3").with_permissions(["articles:"]);
        assert!(Gate::permission("articles:read").check(Some(&namespace)).is_ok());
    }

    #[test]
    fn test_missing_identity_fails_closed() {
        for gate in [
            Gate::role("user"),
            Gate::org_admin_or_superadmin(),
            Gate::permission("articles:read"),
        ] {
            assert!(matches!(gate.check(None), Err(AuthError::Forbidden)));
        }
    }

    #[test]
    fn test_ensure_org_scope() {
        let member = Identity::new("u1").with_organization("o1").with_roles(["org_admin"]);
        assert!(ensure_org_scope(&member, "o1").is_ok());
        assert!(matches!(
            ensure_org_scope(&member, "o2"),
            Err(AuthError::Forbidden)
        ));

        let superadmin = Identity::new("u2").with_roles(["superadmin"]);
        assert!(ensure_org_scope(&superadmin, "o2").is_ok());

        let orphan = Identity::new("u3");
        assert!(ensure_org_scope(&orphan, "o1").is_err());
    }
}
