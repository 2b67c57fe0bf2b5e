//! KRX, Naver, OPENDART용 HTTP 클라이언트 팩토리.
//!
//! 모든 요청은 전송 직전에 해당 소스의 rate limiter에서 토큰을 획득합니다.
//! limiter는 [`RateLimiterRegistry`](kfc_ratelimit::RateLimiterRegistry)를 통해
//! 얻으므로, 같은 registry를 쓰는 클라이언트끼리는 소스별 한도를 공유합니다.

pub mod client;
pub mod config;

pub use client::KfcClient;
pub use config::{ClientConfig, EndpointSettings, HttpSettings, LoggingSettings};
