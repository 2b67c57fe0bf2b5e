//! Registry 동시성 통합 테스트.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use kfc_ratelimit::{DataSource, RateLimitConfig, RateLimitingSettings, RateLimiterRegistry};

/// 여러 스레드가 동시에 같은 키를 요청해도 인스턴스는 하나만 생성된다.
#[test]
fn test_concurrent_get_limiter_creates_single_instance() {
    let registry = Arc::new(RateLimiterRegistry::new());
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // 스레드마다 다른 설정을 넘겨도 하나만 살아남아야 함
                let config = RateLimitConfig::new(10 + i as u32, 10, true, 1000).unwrap();
                barrier.wait();
                registry.get_limiter("KRX", &config)
            })
        })
        .collect();

    let limiters: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    let first = &limiters[0];
    assert!(limiters.iter().all(|l| Arc::ptr_eq(l, first)));
    assert_eq!(registry.len(), 1);

    let capacity = first.config().capacity();
    assert!((10..10 + threads as u32).contains(&capacity));
}

/// 서로 다른 소스는 동시에 생성되어도 서로 간섭하지 않는다.
#[test]
fn test_concurrent_creation_of_distinct_sources() {
    let registry = Arc::new(RateLimiterRegistry::new());
    let settings = RateLimitingSettings::default();
    let barrier = Arc::new(Barrier::new(DataSource::all().len() * 4));

    let handles: Vec<_> = DataSource::all()
        .into_iter()
        .cycle()
        .take(DataSource::all().len() * 4)
        .map(|source| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let settings = settings.clone();
            thread::spawn(move || {
                barrier.wait();
                (source, registry.limiter_for(source, &settings))
            })
        })
        .collect();

    for handle in handles {
        let (source, limiter) = handle.join().expect("thread panicked");
        assert_eq!(limiter.source(), source.key());
        assert!(Arc::ptr_eq(&limiter, &registry.get(source.key()).unwrap()));
    }

    assert_eq!(registry.len(), 3);
}

/// 여러 태스크가 같은 limiter를 통해 요청하면 전체 처리량이 한도로 제한된다.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_limiter_paces_tasks_across_workers() {
    let registry = Arc::new(RateLimiterRegistry::new());
    let config = RateLimitConfig::new(5, 50, true, 5_000).unwrap();
    let start = std::time::Instant::now();

    let tasks: Vec<_> = (0..15)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                // 각 태스크가 독립적으로 registry에서 limiter를 얻음
                let limiter = registry.get_limiter("Naver", &config);
                limiter.acquire(1).await
            })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        task.expect("task panicked").expect("acquire failed");
    }

    // 5개는 즉시, 나머지 10개는 50/s -> 최소 약 200ms
    assert!(start.elapsed() >= Duration::from_millis(180));

    let limiter = registry.get("Naver").unwrap();
    assert_eq!(limiter.metrics().acquired, 15);
    assert!(limiter.available_tokens() <= 5);
}
