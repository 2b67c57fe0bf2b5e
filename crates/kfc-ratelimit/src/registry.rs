//! 소스별 Rate Limiter registry.
//!
//! 같은 소스 키(KRX, Naver, OPENDART)에 대해 limiter를 **한 번만** 생성하고,
//! 이후 모든 호출자에게 같은 인스턴스를 돌려줍니다.
//!
//! # 동작 방식
//!
//! ```text
//! get_limiter("KRX", config)
//!     │
//!     ├─[캐시 적중]──> 기존 인스턴스 반환 (lock 없음, ArcSwap load)
//!     │
//!     └─[캐시 미스]──> KRX 전용 lock 획득
//!                         ├─[재확인 적중]──> 기존 인스턴스 반환
//!                         └─[없음]──> 생성 후 게시, 반환
//! ```
//!
//! # 첫 호출 우선 (first-writer-wins)
//!
//! 소스별 limiter의 설정은 **처음 생성한 호출의 설정으로 고정**됩니다.
//! 이후 다른 설정을 넘겨도 무시되며, 이 경우 경고 로그를 남깁니다.
//!
//! # 전역 registry
//!
//! 애플리케이션 시작 시 [`RateLimiterRegistry::new`]로 하나를 만들어 명시적으로
//! 전달하는 방식을 권장합니다. 프로세스 전체 공유가 필요하면
//! [`RateLimiterRegistry::global`]을 사용합니다.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::{RateLimitConfig, RateLimitingSettings};
use crate::limiter::{RateLimiterStatus, TokenBucketRateLimiter};
use crate::source::DataSource;

type LimiterMap = HashMap<String, Arc<TokenBucketRateLimiter>>;

static GLOBAL_REGISTRY: OnceCell<RateLimiterRegistry> = OnceCell::new();

/// 소스 키별 limiter registry.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    /// 게시된 limiter 스냅샷 (읽기는 lock 없이 수행)
    limiters: ArcSwap<LimiterMap>,
    /// [`DataSource`] 키의 생성 lock. 생성 후 변하지 않으므로 잠금 없이 조회
    source_locks: HashMap<&'static str, Arc<Mutex<()>>>,
    /// 그 외 임의 소스 키의 생성 lock
    init_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterRegistry {
    /// 빈 registry 생성.
    pub fn new() -> Self {
        Self {
            limiters: ArcSwap::from_pointee(HashMap::new()),
            source_locks: DataSource::all()
                .into_iter()
                .map(|source| (source.key(), Arc::new(Mutex::new(()))))
                .collect(),
            init_locks: Mutex::new(HashMap::new()),
        }
    }

    /// 프로세스 전역 registry.
    ///
    /// 첫 호출 시 생성되며 이후 같은 인스턴스를 반환합니다.
    pub fn global() -> &'static RateLimiterRegistry {
        GLOBAL_REGISTRY.get_or_init(RateLimiterRegistry::new)
    }

    /// 소스 키의 limiter를 반환합니다. 없으면 `default_config`로 생성합니다.
    ///
    /// 이미 생성된 limiter가 있으면 `default_config`는 무시됩니다.
    pub fn get_limiter(
        &self,
        source_key: &str,
        default_config: &RateLimitConfig,
    ) -> Arc<TokenBucketRateLimiter> {
        if let Some(existing) = self.limiters.load().get(source_key) {
            warn_if_config_differs(existing, default_config);
            return Arc::clone(existing);
        }

        let key_lock = self.key_lock(source_key);
        let _guard = key_lock.lock();

        // lock 대기 중 다른 호출자가 생성했을 수 있음
        if let Some(existing) = self.limiters.load().get(source_key) {
            warn_if_config_differs(existing, default_config);
            return Arc::clone(existing);
        }

        let limiter = Arc::new(TokenBucketRateLimiter::with_source(
            source_key,
            *default_config,
        ));
        self.limiters.rcu(|current| {
            let mut next = LimiterMap::clone(current);
            next.insert(source_key.to_string(), Arc::clone(&limiter));
            next
        });

        info!(
            source = source_key,
            capacity = default_config.capacity(),
            refill_rate = default_config.refill_rate(),
            enabled = default_config.is_enabled(),
            wait_timeout_ms = default_config.wait_timeout_ms(),
            "Initialized rate limiter"
        );

        limiter
    }

    /// 데이터 소스의 limiter 반환. 없으면 `settings`의 해당 설정으로 생성합니다.
    pub fn limiter_for(
        &self,
        source: DataSource,
        settings: &RateLimitingSettings,
    ) -> Arc<TokenBucketRateLimiter> {
        self.get_limiter(source.key(), settings.for_source(source))
    }

    /// 이미 생성된 limiter 조회 (생성하지 않음).
    pub fn get(&self, source_key: &str) -> Option<Arc<TokenBucketRateLimiter>> {
        self.limiters.load().get(source_key).cloned()
    }

    /// 생성된 limiter 수.
    pub fn len(&self) -> usize {
        self.limiters.load().len()
    }

    /// 생성된 limiter가 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.limiters.load().is_empty()
    }

    /// 생성된 소스 키 목록 (정렬됨).
    pub fn source_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.limiters.load().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 생성된 모든 limiter의 상태 (소스 키 순).
    pub fn statuses(&self) -> Vec<(String, RateLimiterStatus)> {
        let limiters = self.limiters.load();
        let mut statuses: Vec<(String, RateLimiterStatus)> = limiters
            .iter()
            .map(|(key, limiter)| (key.clone(), limiter.status()))
            .collect();
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }

    /// 모든 limiter 제거 (테스트 전용).
    ///
    /// 다른 태스크가 기존 인스턴스로 acquire 중일 때 호출하면 안 됩니다.
    /// 이미 반환된 인스턴스는 계속 동작하지만 registry와의 연결은 끊어집니다.
    pub fn reset_for_testing(&self) {
        self.limiters.store(Arc::new(HashMap::new()));
        warn!("Rate limiter registry reset for testing - all instances cleared");
    }

    /// 소스 키의 생성 lock.
    ///
    /// KRX, Naver, OPENDART는 미리 만들어 둔 lock을 쓰므로 서로 경합하지 않습니다.
    /// 그 외 키는 lock 맵을 잠깐 잡은 뒤 키별 lock을 꺼냅니다.
    fn key_lock(&self, source_key: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.source_locks.get(source_key) {
            return Arc::clone(lock);
        }
        let mut locks = self.init_locks.lock();
        Arc::clone(locks.entry(source_key.to_string()).or_default())
    }
}

fn warn_if_config_differs(existing: &TokenBucketRateLimiter, requested: &RateLimitConfig) {
    if existing.config() != requested {
        warn!(
            source = existing.source(),
            active = %existing.config(),
            ignored = %requested,
            "Rate limiter already initialized; ignoring different config"
        );
    }
}
