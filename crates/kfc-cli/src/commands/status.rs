//! 소스별 rate limiter 상태 출력.

use anyhow::{Context, Result};
use kfc_client::{ClientConfig, KfcClient};
use kfc_ratelimit::{DataSource, RateLimiterRegistry, RateLimiterStatus};
use serde::Serialize;
use tracing::info;

/// 소스 하나의 상태 행.
#[derive(Debug, Serialize)]
pub struct SourceStatus {
    pub source: DataSource,
    #[serde(flatten)]
    pub status: RateLimiterStatus,
    pub wait_timeout_ms: u64,
    pub base_url: String,
}

/// 설정으로 클라이언트를 만들고 각 소스의 상태를 수집합니다.
pub fn collect_status(config: ClientConfig) -> Result<Vec<SourceStatus>> {
    let registry = RateLimiterRegistry::new();
    let client = KfcClient::new(config, &registry).context("Failed to build client")?;

    Ok(client
        .rate_limit_status()
        .into_iter()
        .map(|(source, status)| SourceStatus {
            source,
            status,
            wait_timeout_ms: client.limiter(source).config().wait_timeout_ms(),
            base_url: client.base_url(source).to_string(),
        })
        .collect())
}

/// 상태를 표 또는 JSON으로 출력합니다.
pub fn print_status(config: ClientConfig, json: bool) -> Result<()> {
    let rows = collect_status(config)?;
    info!(sources = rows.len(), "Collected rate limiter status");

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "\n{:<10} {:>8} {:>9} {:>8} {:>8} {:>11}  {}",
        "SOURCE", "ENABLED", "CAPACITY", "REFILL/s", "TOKENS", "TIMEOUT(ms)", "BASE URL"
    );
    println!("{}", "-".repeat(90));
    for row in &rows {
        println!(
            "{:<10} {:>8} {:>9} {:>8} {:>8} {:>11}  {}",
            row.source.key(),
            if row.status.is_enabled { "yes" } else { "no" },
            row.status.capacity,
            row.status.refill_rate,
            row.status.available_tokens,
            row.wait_timeout_ms,
            row.base_url,
        );
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_status_reports_all_sources() {
        let config = ClientConfig::from_toml_str(
            r#"
            [rate_limiting.naver]
            capacity = 3
            refill_rate = 1
            wait_timeout_ms = 500
            "#,
        )
        .unwrap();

        let rows = collect_status(config).unwrap();
        assert_eq!(rows.len(), 3);

        let naver = rows.iter().find(|r| r.source == DataSource::Naver).unwrap();
        assert_eq!(naver.status.capacity, 3);
        assert_eq!(naver.status.available_tokens, 3);
        assert_eq!(naver.wait_timeout_ms, 500);
    }

    #[test]
    fn test_status_json_is_flat() {
        let rows = collect_status(ClientConfig::default()).unwrap();
        let value = serde_json::to_value(&rows).unwrap();

        assert_eq!(value[0]["source"], "KRX");
        assert_eq!(value[0]["capacity"], 25);
        assert_eq!(value[2]["source"], "OPENDART");
    }
}
