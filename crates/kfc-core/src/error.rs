//! 라이브러리 공통 에러 타입.
//!
//! 모든 에러는 [`ErrorCode`]와 메시지로 구성됩니다.
//! 에러 코드는 카테고리별로 번호대가 구분되어 있습니다:
//! - 1000번대: 네트워크 오류
//! - 4000번대: Rate Limit 오류
//! - 5000번대: 검증 오류

use thiserror::Error;

/// 에러 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 네트워크 연결 실패
    NetworkConnectionFailed,
    /// 네트워크 타임아웃
    NetworkTimeout,
    /// HTTP 요청 실패
    HttpRequestFailed,
    /// HTTP 오류 응답 (4xx, 5xx)
    HttpErrorResponse,
    /// API 호출 제한 초과
    RateLimitExceeded,
    /// 잘못된 파라미터
    InvalidParameter,
    /// 잘못된 설정
    InvalidConfiguration,
}

impl ErrorCode {
    /// 숫자 코드.
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::NetworkConnectionFailed => 1001,
            ErrorCode::NetworkTimeout => 1002,
            ErrorCode::HttpRequestFailed => 1003,
            ErrorCode::HttpErrorResponse => 1004,
            ErrorCode::RateLimitExceeded => 4001,
            ErrorCode::InvalidParameter => 5001,
            ErrorCode::InvalidConfiguration => 5002,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// KFC 라이브러리 에러.
#[derive(Debug, Error)]
pub enum KfcError {
    /// 네트워크 연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 네트워크 타임아웃
    #[error("Network timeout: {0}")]
    Timeout(String),

    /// HTTP 요청 구성/전송 실패
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// HTTP 오류 응답
    #[error("HTTP {status} from {source_name}: {message}")]
    HttpStatus {
        /// 응답 상태 코드
        status: u16,
        /// API 소스 이름
        source_name: String,
        /// 응답 본문 요약
        message: String,
    },

    /// 요청 한도 초과 (rate limiter 대기 타임아웃)
    #[error("Rate limit exceeded for {source_name}: {message}")]
    RateLimitExceeded {
        /// API 소스 이름 (KRX, Naver, OPENDART)
        source_name: String,
        /// 상세 메시지
        message: String,
    },

    /// 잘못된 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

/// KFC 작업을 위한 Result 타입.
pub type KfcResult<T> = Result<T, KfcError>;

impl KfcError {
    /// 에러 코드 반환.
    pub fn code(&self) -> ErrorCode {
        match self {
            KfcError::Network(_) => ErrorCode::NetworkConnectionFailed,
            KfcError::Timeout(_) => ErrorCode::NetworkTimeout,
            KfcError::Request(_) => ErrorCode::HttpRequestFailed,
            KfcError::HttpStatus { .. } => ErrorCode::HttpErrorResponse,
            KfcError::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            KfcError::InvalidInput(_) => ErrorCode::InvalidParameter,
            KfcError::Config(_) => ErrorCode::InvalidConfiguration,
        }
    }

    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// 5xx 응답과 429는 재시도 가능, 나머지 4xx는 불가능.
    pub fn is_retryable(&self) -> bool {
        match self {
            KfcError::Network(_) | KfcError::Timeout(_) | KfcError::RateLimitExceeded { .. } => {
                true
            }
            KfcError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Rate limit 관련 에러인지 확인합니다.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, KfcError::RateLimitExceeded { .. })
            || matches!(self, KfcError::HttpStatus { status: 429, .. })
    }
}
