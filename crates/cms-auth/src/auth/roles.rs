//! 역할 기반 접근 제어 (RBAC).
//!
//! 토큰의 `roles` 클레임은 문자열 집합이지만, 시스템이 알고 있는 역할은
//! 아래 세 가지뿐입니다. 역할 부여 시에는 [`validate_roles`]로 어휘를 검사합니다.

use serde::{Deserialize, Serialize};

/// 사용자 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 일반 사용자
    User,
    /// 조직 관리자 - 자기 조직 범위의 관리 권한
    OrgAdmin,
    /// 최고 관리자 - 모든 조직에 대한 권한
    Superadmin,
}

impl Role {
    /// 토큰/저장소에 쓰이는 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::OrgAdmin => "org_admin",
            Role::Superadmin => "superadmin",
        }
    }

    /// 문자열에서 역할 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "org_admin" => Some(Role::OrgAdmin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// 역할 목록이 알려진 어휘만 포함하는지 검증.
///
/// # Returns
///
/// 유효하면 Ok(()), 알 수 없는 역할이 있으면 그 역할 이름과 함께 Err
pub fn validate_roles<'a, I>(roles: I) -> Result<(), String>
where
    I: IntoIterator<Item = &'a str>,
{
    match roles.into_iter().find(|r| Role::parse(r).is_none()) {
        Some(unknown) => Err(unknown.to_string()),
        None => Ok(()),
    }
}
