//! # KFC Core
//!
//! KFC 데이터 클라이언트 전반에서 사용되는 기본 타입을 제공합니다:
//! - 라이브러리 공통 에러 및 에러 코드
//! - 로깅 인프라

pub mod error;
pub mod logging;

pub use error::*;
pub use logging::*;
