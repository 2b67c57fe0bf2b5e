//! 데이터 소스별 Rate Limiting.
//!
//! 이 crate는 다음을 제공합니다:
//! - Token Bucket 기반 [`TokenBucketRateLimiter`]
//! - 소스(KRX, Naver, OPENDART)별 limiter를 지연 생성/공유하는 [`RateLimiterRegistry`]
//! - 검증된 설정 타입 [`RateLimitConfig`], [`RateLimitingSettings`]
//!
//! 같은 upstream을 호출하는 모든 클라이언트는 registry를 통해 하나의
//! limiter를 공유하므로, 클라이언트 인스턴스가 늘어나도 한도가 배가되지 않습니다.

pub mod config;
pub mod error;
pub mod limiter;
pub mod registry;
pub mod source;

pub use config::{RateLimitConfig, RateLimitingSettings};
pub use error::{RateLimitError, Result};
pub use limiter::{LimiterMetrics, RateLimiter, RateLimiterStatus, TokenBucketRateLimiter};
pub use registry::RateLimiterRegistry;
pub use source::DataSource;
