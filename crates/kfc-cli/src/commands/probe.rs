//! Rate limiter 부하 시험.
//!
//! 네트워크 없이 하나의 limiter에 동시 acquire를 걸어 실제 처리율과
//! 타임아웃 발생 여부를 확인합니다.

use std::sync::Arc;

use anyhow::{bail, Result};
use kfc_ratelimit::{
    DataSource, LimiterMetrics, RateLimitConfig, RateLimiterRegistry, TokenBucketRateLimiter,
};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info};

/// 부하 시험 설정.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// 대상 소스
    pub source: DataSource,
    /// 전체 acquire 횟수
    pub requests: u32,
    /// 동시 태스크 수
    pub concurrency: u32,
    /// acquire 1회당 토큰 수
    pub tokens: u32,
    /// limiter 설정
    pub limit: RateLimitConfig,
}

/// 부하 시험 결과.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    /// 대상 소스
    pub source: DataSource,
    /// 요청한 acquire 횟수
    pub requests: u32,
    /// 동시 태스크 수
    pub concurrency: u32,
    /// 성공한 acquire 수
    pub successes: u64,
    /// 대기 타임아웃으로 실패한 acquire 수
    pub timeouts: u64,
    /// 전체 소요 시간 (밀리초)
    pub elapsed_ms: u64,
    /// 초당 성공 acquire 수
    pub achieved_rate: f64,
    /// 시험 종료 시점의 limiter 누적 메트릭
    pub metrics: LimiterMetrics,
}

/// 부하 시험 실행.
pub async fn run_probe(config: &ProbeConfig) -> Result<ProbeReport> {
    if config.concurrency == 0 {
        bail!("concurrency must be greater than 0");
    }

    let registry = RateLimiterRegistry::new();
    let limiter = registry.get_limiter(config.source.key(), &config.limit);

    info!(
        source = %config.source,
        requests = config.requests,
        concurrency = config.concurrency,
        limit = %config.limit,
        "Starting rate limiter probe"
    );

    let started = Instant::now();
    let mut tasks = JoinSet::new();
    for worker in 0..config.concurrency {
        let share = worker_share(config.requests, config.concurrency, worker);
        let limiter = Arc::clone(&limiter);
        let tokens = config.tokens;
        tasks.spawn(async move { drive(limiter, share, tokens).await });
    }

    let mut successes = 0;
    let mut timeouts = 0;
    while let Some(joined) = tasks.join_next().await {
        let (ok, timed_out) = joined??;
        successes += ok;
        timeouts += timed_out;
    }

    let elapsed = started.elapsed();
    let secs = elapsed.as_secs_f64();
    let achieved_rate = if secs > 0.0 {
        successes as f64 / secs
    } else {
        successes as f64
    };

    Ok(ProbeReport {
        source: config.source,
        requests: config.requests,
        concurrency: config.concurrency,
        successes,
        timeouts,
        elapsed_ms: elapsed.as_millis() as u64,
        achieved_rate,
        metrics: limiter.metrics(),
    })
}

/// 부하 시험 결과 출력.
pub fn print_report(report: &ProbeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n=== Rate limiter probe: {} ===", report.source);
    println!("요청 수:      {} ({} tasks)", report.requests, report.concurrency);
    println!("성공:         {}", report.successes);
    println!("타임아웃:     {}", report.timeouts);
    println!("대기 발생:    {}", report.metrics.waited);
    println!("소요 시간:    {} ms", report.elapsed_ms);
    println!("처리율:       {:.2} req/s\n", report.achieved_rate);
    Ok(())
}

fn worker_share(requests: u32, concurrency: u32, worker: u32) -> u32 {
    let base = requests / concurrency;
    if worker < requests % concurrency {
        base + 1
    } else {
        base
    }
}

async fn drive(
    limiter: Arc<TokenBucketRateLimiter>,
    count: u32,
    tokens: u32,
) -> Result<(u64, u64)> {
    let mut ok = 0;
    let mut timed_out = 0;
    for _ in 0..count {
        match limiter.acquire(tokens).await {
            Ok(()) => ok += 1,
            Err(e) if e.is_retryable() => {
                debug!(error = %e, "Probe acquire timed out");
                timed_out += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok((ok, timed_out))
}
