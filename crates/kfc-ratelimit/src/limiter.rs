//! Token Bucket 기반 Rate Limiter.
//!
//! 버킷은 가득 찬 상태(capacity)로 시작하며, 경과 시간에 비례해
//! `refill_rate` 토큰/초 속도로 충전됩니다. 토큰은 소수점 단위로 누적되고,
//! 외부 API는 정수로 내림한 값만 노출합니다.
//!
//! # 대기 방식
//!
//! 토큰이 부족하면 필요한 만큼의 대기 시간을 계산해 tokio 타이머로 잠든 뒤
//! 다시 확인합니다. 잠든 동안 lock은 잡고 있지 않으며 워커 스레드도 막지 않습니다.
//! 대기 큐가 없으므로 먼저 기다리기 시작한 호출이 먼저 토큰을 얻는다는 보장은 없습니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::{RateLimitError, Result};

/// 이름 없이 생성된 limiter의 소스 이름
const UNKNOWN_SOURCE: &str = "Unknown";

/// 요청 속도 제한 인터페이스.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// 토큰을 소비합니다. 부족하면 충전될 때까지 대기합니다.
    ///
    /// 대기 시간이 설정된 타임아웃을 넘으면 [`RateLimitError::Timeout`]을 반환합니다.
    async fn acquire(&self, tokens_needed: u32) -> Result<()>;

    /// 토큰 1개 소비.
    async fn acquire_one(&self) -> Result<()> {
        self.acquire(1).await
    }

    /// 현재 사용 가능한 토큰 수 (근사값).
    fn available_tokens(&self) -> u32;

    /// 토큰 1개를 얻기까지 예상 대기 시간 (밀리초).
    fn wait_time_ms(&self) -> u64;

    /// 현재 상태 스냅샷.
    fn status(&self) -> RateLimiterStatus;
}

/// Rate Limiter 상태 스냅샷.
///
/// 조회 시점의 값이며, 동시에 진행 중인 acquire와 비교하면 이미 낡았을 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStatus {
    /// 사용 가능한 토큰 수
    pub available_tokens: u32,
    /// 버킷 최대 용량
    pub capacity: u32,
    /// 초당 충전 토큰 수
    pub refill_rate: u32,
    /// 활성화 여부
    pub is_enabled: bool,
    /// 토큰 1개 획득까지 예상 대기 시간 (밀리초)
    pub estimated_wait_ms: u64,
}

/// Rate Limiter 누적 메트릭.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LimiterMetrics {
    /// 성공한 acquire 횟수
    pub acquired: u64,
    /// 지급된 총 토큰 수
    pub tokens_granted: u64,
    /// 한 번 이상 대기한 acquire 횟수
    pub waited: u64,
    /// 타임아웃으로 실패한 acquire 횟수
    pub timeouts: u64,
}

/// 버킷 내부 상태. limiter의 lock 안에서만 변경됩니다.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: f64::from(config.capacity()),
            last_refill: now,
        }
    }

    /// `now` 기준으로 충전했을 때의 토큰 수 (상태 변경 없음).
    fn projected(&self, config: &RateLimitConfig, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * f64::from(config.refill_rate()))
            .min(f64::from(config.capacity()))
    }

    fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        self.tokens = self.projected(config, now);
        self.last_refill = now;
    }

    fn try_take(&mut self, tokens_needed: u32) -> bool {
        let needed = f64::from(tokens_needed);
        if self.tokens >= needed {
            self.tokens -= needed;
            true
        } else {
            false
        }
    }
}

/// 부족한 토큰이 충전되기까지 걸리는 시간 (밀리초, 올림).
fn wait_ms_for(deficit: f64, refill_rate: u32) -> u64 {
    if deficit <= 0.0 {
        return 0;
    }
    (deficit / f64::from(refill_rate) * 1000.0).ceil() as u64
}

/// Token Bucket Rate Limiter.
///
/// # Example
///
/// ```ignore
/// let config = RateLimitConfig::new(25, 25, true, 60_000)?;
/// let limiter = TokenBucketRateLimiter::with_source("KRX", config);
///
/// limiter.acquire(1).await?;
/// // 요청 전송
/// ```
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    /// 소스 이름 (에러 및 로그용)
    source: String,
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
    acquired: AtomicU64,
    tokens_granted: AtomicU64,
    waited: AtomicU64,
    timeouts: AtomicU64,
}

impl TokenBucketRateLimiter {
    /// 소스 이름 없이 생성.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_source(UNKNOWN_SOURCE, config)
    }

    /// 소스 이름을 지정해 생성.
    pub fn with_source(source: impl Into<String>, config: RateLimitConfig) -> Self {
        Self {
            source: source.into(),
            bucket: Mutex::new(Bucket::full(&config, Instant::now())),
            config,
            acquired: AtomicU64::new(0),
            tokens_granted: AtomicU64::new(0),
            waited: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// 소스 이름.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 적용 중인 설정.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 토큰을 소비합니다.
    ///
    /// - 비활성화 상태면 즉시 반환합니다.
    /// - `tokens_needed`가 0이면 [`RateLimitError::InvalidArgument`].
    /// - 호출 시점부터의 경과 시간과 추가 대기 시간의 합이 타임아웃을 넘으면
    ///   토큰을 소비하지 않고 [`RateLimitError::Timeout`].
    /// - 용량보다 많은 토큰은 영원히 모을 수 없으므로 대기 없이 바로
    ///   [`RateLimitError::Timeout`]을 반환합니다.
    ///
    /// 대기 중에 future가 drop되면 토큰은 소비되지 않습니다.
    pub async fn acquire(&self, tokens_needed: u32) -> Result<()> {
        if !self.config.is_enabled() {
            return Ok(());
        }

        if tokens_needed == 0 {
            return Err(RateLimitError::InvalidArgument(
                "tokens_needed must be greater than 0".to_string(),
            ));
        }
        let never_fits = tokens_needed > self.config.capacity();

        let started = Instant::now();
        let mut has_waited = false;

        loop {
            let wait_ms = {
                let mut bucket = self.bucket.lock();
                bucket.refill(&self.config, Instant::now());

                if bucket.try_take(tokens_needed) {
                    None
                } else {
                    Some(wait_ms_for(
                        f64::from(tokens_needed) - bucket.tokens,
                        self.config.refill_rate(),
                    ))
                }
            };

            let Some(wait_ms) = wait_ms else {
                self.acquired.fetch_add(1, Ordering::Relaxed);
                self.tokens_granted
                    .fetch_add(u64::from(tokens_needed), Ordering::Relaxed);
                return Ok(());
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            if never_fits || elapsed_ms + wait_ms > self.config.wait_timeout_ms() {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    source = %self.source,
                    tokens_needed,
                    elapsed_ms,
                    required_wait_ms = wait_ms,
                    timeout_ms = self.config.wait_timeout_ms(),
                    "Rate limit wait timeout"
                );
                return Err(RateLimitError::Timeout {
                    source_name: self.source.clone(),
                    config: self.config,
                    elapsed_ms,
                    required_wait_ms: wait_ms,
                });
            }

            if !has_waited {
                has_waited = true;
                self.waited.fetch_add(1, Ordering::Relaxed);
            }

            debug!(
                source = %self.source,
                tokens_needed,
                wait_ms,
                "Waiting for rate limit tokens"
            );
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }
    }

    /// 현재 사용 가능한 토큰 수.
    ///
    /// 마지막 충전 이후 경과 시간을 반영한 추정치이며 상태는 바꾸지 않습니다.
    pub fn available_tokens(&self) -> u32 {
        self.snapshot_tokens() as u32
    }

    /// 토큰 1개 획득까지 예상 대기 시간 (밀리초).
    pub fn wait_time_ms(&self) -> u64 {
        wait_ms_for(1.0 - self.snapshot_tokens(), self.config.refill_rate())
    }

    /// 상태 스냅샷.
    pub fn status(&self) -> RateLimiterStatus {
        let tokens = self.snapshot_tokens();
        RateLimiterStatus {
            available_tokens: tokens as u32,
            capacity: self.config.capacity(),
            refill_rate: self.config.refill_rate(),
            is_enabled: self.config.is_enabled(),
            estimated_wait_ms: wait_ms_for(1.0 - tokens, self.config.refill_rate()),
        }
    }

    /// 누적 메트릭.
    pub fn metrics(&self) -> LimiterMetrics {
        LimiterMetrics {
            acquired: self.acquired.load(Ordering::Relaxed),
            tokens_granted: self.tokens_granted.load(Ordering::Relaxed),
            waited: self.waited.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    fn snapshot_tokens(&self) -> f64 {
        self.bucket.lock().projected(&self.config, Instant::now())
    }
}

#[async_trait]
impl RateLimiter for TokenBucketRateLimiter {
    async fn acquire(&self, tokens_needed: u32) -> Result<()> {
        TokenBucketRateLimiter::acquire(self, tokens_needed).await
    }

    fn available_tokens(&self) -> u32 {
        TokenBucketRateLimiter::available_tokens(self)
    }

    fn wait_time_ms(&self) -> u64 {
        TokenBucketRateLimiter::wait_time_ms(self)
    }

    fn status(&self) -> RateLimiterStatus {
        TokenBucketRateLimiter::status(self)
    }
}
