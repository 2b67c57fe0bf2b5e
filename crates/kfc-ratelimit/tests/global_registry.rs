//! 전역 registry 테스트.
//!
//! 전역 상태를 다루므로 이 파일에는 테스트를 하나만 둔다.

use std::sync::Arc;

use kfc_ratelimit::{RateLimitConfig, RateLimiterRegistry};

#[test]
fn test_global_registry_lifecycle() {
    let registry = RateLimiterRegistry::global();
    assert!(std::ptr::eq(registry, RateLimiterRegistry::global()));
    registry.reset_for_testing();

    let config_a = RateLimitConfig::new(10, 10, true, 1000).unwrap();
    let config_b = RateLimitConfig::new(99, 99, true, 1000).unwrap();

    // ABSENT -> PRESENT
    let first = registry.get_limiter("KRX", &config_a);
    let second = RateLimiterRegistry::global().get_limiter("KRX", &config_b);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.status().capacity, 10);

    // PRESENT -> ABSENT -> PRESENT (새 설정 적용)
    registry.reset_for_testing();
    assert!(registry.get("KRX").is_none());

    let third = registry.get_limiter("KRX", &config_b);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.status().capacity, 99);

    registry.reset_for_testing();
}
