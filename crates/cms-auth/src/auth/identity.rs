//! 요청 단위 인증 주체.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::permissions::any_permission_matches;
use super::roles::Role;

/// 검증된 토큰에서 복원된 인증 주체.
///
/// 인증 게이트가 토큰 검증에 성공했을 때만 만들어지며, 요청 확장(extensions)에
/// 한 번 삽입된 뒤로는 변경되지 않습니다. 저장되지 않고 매 요청마다
/// 토큰 클레임에서 다시 만들어집니다.
///
/// `roles`/`permissions`는 토큰에 없으면 빈 집합입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    subject_id: String,
    organization_id: Option<String>,
    roles: BTreeSet<String>,
    permissions: BTreeSet<String>,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            organization_id: None,
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    /// 역할 보유 여부 (정확히 일치).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// 주어진 역할 중 하나라도 보유하는지 확인.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_str()))
    }

    /// 요구 권한 충족 여부 (정확히 일치, 와일드카드, 네임스페이스 접두사).
    pub fn has_permission(&self, required: &str) -> bool {
        any_permission_matches(&self.permissions, required)
    }

    pub fn is_superadmin(&self) -> bool {
        self.has_role(Role::Superadmin.as_str())
    }

    /// 같은 조직 소속인지 확인. 조직이 없는 주체는 어떤 조직에도 속하지 않습니다.
    pub fn belongs_to(&self, organization_id: &str) -> bool {
        self.organization_id.as_deref() == Some(organization_id)
    }
}
