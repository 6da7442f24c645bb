//! 권한 문자열 매칭.
//!
//! 권한은 `:`로 구분되는 네임스페이스 문자열입니다 (예: `articles:read`).
//! 부여된 권한 `p`는 다음 중 하나이면 요구 권한 `r`을 충족합니다:
//!
//! - `p == r` (정확히 일치)
//! - `p == "*"` (와일드카드)
//! - `p`가 `:`로 끝나고 `r`이 `p`로 시작 (네임스페이스 접두사)
//!
//! 네임스페이스 권한은 구분자까지 포함해 부여해야 합니다. `articles:`는
//! `articles:read`를 충족하지만 `articles`는 충족하지 않습니다.

/// 모든 권한을 의미하는 와일드카드
pub const WILDCARD: &str = "*";

/// 네임스페이스 구분자
pub const SEPARATOR: char = ':';

/// 부여된 권한 하나가 요구 권한을 충족하는지 확인.
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted.is_empty() {
        return false;
    }
    if granted == WILDCARD || granted == required {
        return true;
    }

    // 구분자만으로 된 권한은 네임스페이스가 아님
    granted.len() > 1
        && granted.ends_with(SEPARATOR)
        && required.len() > granted.len()
        && required.starts_with(granted)
}

/// 부여된 권한 중 하나라도 요구 권한을 충족하는지 확인.
pub fn any_permission_matches<'a, I>(granted: I, required: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    granted
        .into_iter()
        .any(|p| permission_matches(p, required))
}
