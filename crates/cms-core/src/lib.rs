//! # CMS Core
//!
//! CMS 백엔드 전반에서 공유되는 기반 타입을 제공합니다:
//! - 설정 관리 (파일 + 환경 변수)
//! - 로깅 인프라
//! - 공통 에러 타입
//! - 식별자 타입

pub mod config;
pub mod error;
pub mod id;
pub mod logging;

pub use config::*;
pub use error::*;
pub use id::*;
pub use logging::*;
