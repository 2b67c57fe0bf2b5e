//! Rate limiting 에러 타입.

use kfc_core::KfcError;
use thiserror::Error;

use crate::config::RateLimitConfig;

/// Rate limiting 관련 에러.
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    /// 잘못된 설정 값
    #[error("Invalid rate limit config: {field} {reason}")]
    InvalidConfig {
        /// 문제가 된 필드
        field: &'static str,
        /// 사유
        reason: String,
    },

    /// 잘못된 인자 (토큰 개수 등)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 대기 시간 초과
    #[error(
        "Rate limit timeout exceeded for {source_name} after {elapsed_ms}ms, \
         need to wait additional {required_wait_ms}ms (limit {}ms)",
        .config.wait_timeout_ms()
    )]
    Timeout {
        /// API 소스 이름 (KRX, Naver, OPENDART)
        source_name: String,
        /// 적용 중인 설정
        config: RateLimitConfig,
        /// acquire 호출 이후 경과 시간
        elapsed_ms: u64,
        /// 추가로 필요했던 대기 시간
        required_wait_ms: u64,
    },
}

/// Rate limiting 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, RateLimitError>;

impl RateLimitError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        RateLimitError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// 나중에 다시 시도하면 성공할 수 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RateLimitError::Timeout { .. })
    }
}

impl From<RateLimitError> for KfcError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Timeout { ref source_name, .. } => KfcError::RateLimitExceeded {
                source_name: source_name.clone(),
                message: err.to_string(),
            },
            RateLimitError::InvalidArgument(msg) => KfcError::InvalidInput(msg),
            RateLimitError::InvalidConfig { .. } => KfcError::Config(err.to_string()),
        }
    }
}
