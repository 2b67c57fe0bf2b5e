//! Rate Limiting 설정.
//!
//! [`RateLimitConfig`]는 생성 시점에 검증되며 이후 변경할 수 없습니다.
//! serde 역직렬화도 같은 검증을 거치므로, 잘못된 설정 파일로는
//! 설정 값을 만들 수 없습니다.

use serde::{Deserialize, Serialize};

use crate::error::RateLimitError;
use crate::source::DataSource;

fn default_capacity() -> u32 {
    50
}
fn default_refill_rate() -> u32 {
    50
}
fn default_enabled() -> bool {
    true
}
fn default_wait_timeout_ms() -> u64 {
    60_000
} // 60초

/// 단일 소스의 Token Bucket 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRateLimitConfig")]
pub struct RateLimitConfig {
    /// 버킷 최대 용량 (토큰 수)
    capacity: u32,
    /// 초당 충전되는 토큰 수
    refill_rate: u32,
    /// Rate limiting 활성화 여부
    enabled: bool,
    /// 토큰 획득 최대 대기 시간 (밀리초)
    wait_timeout_ms: u64,
}

/// 검증 전 설정 값 (역직렬화 전용).
#[derive(Debug, Deserialize)]
struct RawRateLimitConfig {
    #[serde(default = "default_capacity")]
    capacity: u32,
    #[serde(default = "default_refill_rate")]
    refill_rate: u32,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default = "default_wait_timeout_ms")]
    wait_timeout_ms: u64,
}

impl TryFrom<RawRateLimitConfig> for RateLimitConfig {
    type Error = RateLimitError;

    fn try_from(raw: RawRateLimitConfig) -> Result<Self, Self::Error> {
        Self::new(raw.capacity, raw.refill_rate, raw.enabled, raw.wait_timeout_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_rate: default_refill_rate(),
            enabled: default_enabled(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

impl RateLimitConfig {
    /// 검증된 설정 생성.
    ///
    /// `capacity`, `refill_rate`, `wait_timeout_ms` 중 하나라도 0이면 실패합니다.
    pub fn new(
        capacity: u32,
        refill_rate: u32,
        enabled: bool,
        wait_timeout_ms: u64,
    ) -> Result<Self, RateLimitError> {
        if capacity == 0 {
            return Err(RateLimitError::invalid_config(
                "capacity",
                "must be greater than 0",
            ));
        }
        if refill_rate == 0 {
            return Err(RateLimitError::invalid_config(
                "refill_rate",
                "must be greater than 0",
            ));
        }
        if wait_timeout_ms == 0 {
            return Err(RateLimitError::invalid_config(
                "wait_timeout_ms",
                "must be greater than 0",
            ));
        }

        Ok(Self {
            capacity,
            refill_rate,
            enabled,
            wait_timeout_ms,
        })
    }

    /// 초당 요청 수(RPS) 기준 설정. 용량과 충전 속도가 같습니다.
    pub fn per_second(rps: u32) -> Result<Self, RateLimitError> {
        Self::new(rps, rps, true, default_wait_timeout_ms())
    }

    /// Rate limiting 비활성화 설정 (수치는 기본값).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// 버킷 최대 용량.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 초당 충전 토큰 수.
    pub fn refill_rate(&self) -> u32 {
        self.refill_rate
    }

    /// 활성화 여부.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 최대 대기 시간 (밀리초).
    pub fn wait_timeout_ms(&self) -> u64 {
        self.wait_timeout_ms
    }
}

impl std::fmt::Display for RateLimitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "capacity={}, refill_rate={}/s, enabled={}, wait_timeout={}ms",
            self.capacity, self.refill_rate, self.enabled, self.wait_timeout_ms
        )
    }
}

fn krx_default() -> RateLimitConfig {
    RateLimitingSettings::krx_default()
}
fn naver_default() -> RateLimitConfig {
    RateLimitingSettings::naver_default()
}
fn opendart_default() -> RateLimitConfig {
    RateLimitingSettings::opendart_default()
}

/// 모든 데이터 소스의 Rate Limiting 설정.
///
/// # 소스별 기본값
///
/// - **KRX**: 25 RPS. 실측 결과 25 RPS까지 전부 성공, 30 RPS부터 실패가 시작됩니다.
/// - **Naver**: 50 RPS
/// - **OPENDART**: 50 RPS. 별도로 일일 40,000건 할당량이 있지만 여기서는 다루지 않습니다.
///
/// 이 설정은 [`RateLimiterRegistry`](crate::RateLimiterRegistry)가 소스별 limiter를
/// **처음 생성할 때만** 사용됩니다. 이미 생성된 limiter에는 영향을 주지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitingSettings {
    /// KRX API 설정
    #[serde(default = "krx_default")]
    pub krx: RateLimitConfig,
    /// Naver API 설정
    #[serde(default = "naver_default")]
    pub naver: RateLimitConfig,
    /// OPENDART API 설정
    #[serde(default = "opendart_default")]
    pub opendart: RateLimitConfig,
}

impl Default for RateLimitingSettings {
    fn default() -> Self {
        Self {
            krx: Self::krx_default(),
            naver: Self::naver_default(),
            opendart: Self::opendart_default(),
        }
    }
}

impl RateLimitingSettings {
    /// KRX 기본 설정 (capacity=25, refill_rate=25/s).
    pub fn krx_default() -> RateLimitConfig {
        RateLimitConfig {
            capacity: 25,
            refill_rate: 25,
            ..Default::default()
        }
    }

    /// Naver 기본 설정 (capacity=50, refill_rate=50/s).
    pub fn naver_default() -> RateLimitConfig {
        RateLimitConfig::default()
    }

    /// OPENDART 기본 설정 (capacity=50, refill_rate=50/s).
    pub fn opendart_default() -> RateLimitConfig {
        RateLimitConfig::default()
    }

    /// 모든 소스 Rate limiting 비활성화.
    pub fn unlimited() -> Self {
        Self {
            krx: RateLimitConfig::disabled(),
            naver: RateLimitConfig::disabled(),
            opendart: RateLimitConfig::disabled(),
        }
    }

    /// 소스별 설정 조회.
    pub fn for_source(&self, source: DataSource) -> &RateLimitConfig {
        match source {
            DataSource::Krx => &self.krx,
            DataSource::Naver => &self.naver,
            DataSource::OpenDart => &self.opendart,
        }
    }
}
