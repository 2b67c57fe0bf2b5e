//! Rate limit이 적용된 HTTP 클라이언트.
//!
//! 각 소스(KRX, Naver, OPENDART)로 보내는 요청은 전송 직전에 해당 소스의
//! limiter에서 토큰을 획득합니다. 토큰을 얻지 못하고 대기 타임아웃을 넘기면
//! 요청은 전송되지 않고 [`KfcError::RateLimitExceeded`]가 반환됩니다.
//!
//! # 사용 예
//!
//! ```ignore
//! let registry = RateLimiterRegistry::new();
//! let client = KfcClient::new(ClientConfig::load("kfc.toml")?, &registry)?;
//!
//! let body = client
//!     .post_form(DataSource::Krx, "/comm/bldAttendant/getJsonData.cmd", &[("bld", "...")])
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use kfc_core::{source_span, KfcError, KfcResult};
use kfc_ratelimit::{DataSource, RateLimiterRegistry, RateLimiterStatus, TokenBucketRateLimiter};
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn, Instrument};

use crate::config::{ClientConfig, EndpointSettings};

/// OPENDART 인증키 쿼리 파라미터 이름
const OPENDART_KEY_PARAM: &str = "crtfc_key";

/// 소스별 rate limiter를 공유하는 HTTP 클라이언트.
pub struct KfcClient {
    http: reqwest::Client,
    endpoints: EndpointSettings,
    opendart_api_key: Option<SecretString>,
    krx: Arc<TokenBucketRateLimiter>,
    naver: Arc<TokenBucketRateLimiter>,
    opendart: Arc<TokenBucketRateLimiter>,
}

impl std::fmt::Debug for KfcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KfcClient")
            .field("endpoints", &self.endpoints)
            .field("has_opendart_api_key", &self.opendart_api_key.is_some())
            .field("krx", &self.krx.status())
            .field("naver", &self.naver.status())
            .field("opendart", &self.opendart.status())
            .finish()
    }
}

impl KfcClient {
    /// 클라이언트 생성.
    ///
    /// 세 소스의 limiter를 `registry`에서 가져옵니다. 이미 생성된 limiter가 있으면
    /// 그 인스턴스(와 설정)를 그대로 공유합니다.
    pub fn new(config: ClientConfig, registry: &RateLimiterRegistry) -> KfcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .user_agent(config.http.user_agent.as_str())
            .build()
            .map_err(|e| KfcError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let settings = &config.rate_limiting;
        let krx = registry.limiter_for(DataSource::Krx, settings);
        let naver = registry.limiter_for(DataSource::Naver, settings);
        let opendart = registry.limiter_for(DataSource::OpenDart, settings);

        let opendart_api_key = config.opendart_api_key.map(|key| SecretString::new(key.into()));
        if opendart_api_key.is_none() {
            debug!("OPENDART API key not configured");
        }

        Ok(Self {
            http,
            endpoints: config.endpoints,
            opendart_api_key,
            krx,
            naver,
            opendart,
        })
    }

    /// 전역 registry를 사용하는 클라이언트 생성.
    pub fn from_global(config: ClientConfig) -> KfcResult<Self> {
        Self::new(config, RateLimiterRegistry::global())
    }

    /// 소스의 limiter.
    pub fn limiter(&self, source: DataSource) -> &Arc<TokenBucketRateLimiter> {
        match source {
            DataSource::Krx => &self.krx,
            DataSource::Naver => &self.naver,
            DataSource::OpenDart => &self.opendart,
        }
    }

    /// 소스의 기본 URL.
    pub fn base_url(&self, source: DataSource) -> &str {
        self.endpoints.base_url(source)
    }

    /// 요청 빌더 생성.
    ///
    /// `path`는 소스 기본 URL 뒤에 붙습니다. OPENDART 요청에는 인증키가
    /// 설정되어 있으면 `crtfc_key` 쿼리가 추가됩니다.
    pub fn request(&self, source: DataSource, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(self.base_url(source), path);
        let builder = self.http.request(method, url);

        match (source, &self.opendart_api_key) {
            (DataSource::OpenDart, Some(key)) => {
                builder.query(&[(OPENDART_KEY_PARAM, key.expose_secret())])
            }
            _ => builder,
        }
    }

    /// 토큰 1개를 획득한 뒤 요청을 전송합니다.
    pub async fn execute(&self, source: DataSource, builder: RequestBuilder) -> KfcResult<Response> {
        self.execute_weighted(source, 1, builder).await
    }

    /// 토큰 `tokens`개를 획득한 뒤 요청을 전송합니다.
    ///
    /// 2xx가 아닌 응답은 [`KfcError::HttpStatus`]로 변환됩니다.
    pub async fn execute_weighted(
        &self,
        source: DataSource,
        tokens: u32,
        builder: RequestBuilder,
    ) -> KfcResult<Response> {
        let limiter = self.limiter(source);

        async move {
            limiter.acquire(tokens).await.map_err(KfcError::from)?;

            let response = builder
                .send()
                .await
                .map_err(|e| map_transport_error(source, e))?;

            let status = response.status();
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| status.to_string());
                warn!(source = %source, status = status.as_u16(), "Upstream returned error status");
                return Err(KfcError::HttpStatus {
                    status: status.as_u16(),
                    source_name: source.key().to_string(),
                    message,
                });
            }

            debug!(source = %source, status = status.as_u16(), "Request completed");
            Ok(response)
        }
        .instrument(source_span!("kfc_request", source, tokens = tokens))
        .await
    }

    /// GET 요청 후 응답 본문을 문자열로 반환합니다.
    pub async fn get_text(
        &self,
        source: DataSource,
        path: &str,
        query: &[(&str, &str)],
    ) -> KfcResult<String> {
        let builder = self.request(source, Method::GET, path).query(query);
        let response = self.execute(source, builder).await?;
        read_text(source, response).await
    }

    /// Form POST 요청 후 응답 본문을 문자열로 반환합니다 (KRX 방식).
    pub async fn post_form(
        &self,
        source: DataSource,
        path: &str,
        form: &[(&str, &str)],
    ) -> KfcResult<String> {
        let builder = self.request(source, Method::POST, path).form(form);
        let response = self.execute(source, builder).await?;
        read_text(source, response).await
    }

    /// 모든 소스의 rate limiter 상태.
    pub fn rate_limit_status(&self) -> Vec<(DataSource, RateLimiterStatus)> {
        DataSource::all()
            .into_iter()
            .map(|source| (source, self.limiter(source).status()))
            .collect()
    }
}

fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

fn map_transport_error(source: DataSource, error: reqwest::Error) -> KfcError {
    if error.is_timeout() {
        KfcError::Timeout(format!("{} request timed out: {}", source, error))
    } else if error.is_connect() {
        KfcError::Network(format!("{} connection failed: {}", source, error))
    } else {
        KfcError::Request(format!("{} request failed: {}", source, error))
    }
}

async fn read_text(source: DataSource, response: Response) -> KfcResult<String> {
    response
        .text()
        .await
        .map_err(|e| map_transport_error(source, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.com/api", "list.json"), "https://a.com/api/list.json");
        assert_eq!(join_url("https://a.com/api/", "/list.json"), "https://a.com/api/list.json");
        assert_eq!(join_url("http://data.krx.co.kr", ""), "http://data.krx.co.kr");
    }

    #[test]
    fn test_new_shares_registry_limiters() {
        let registry = RateLimiterRegistry::new();
        let a = KfcClient::new(ClientConfig::default(), &registry).unwrap();
        let b = KfcClient::new(ClientConfig::default(), &registry).unwrap();

        for source in DataSource::all() {
            assert!(Arc::ptr_eq(a.limiter(source), b.limiter(source)));
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_opendart_request_carries_api_key() {
        let registry = RateLimiterRegistry::new();
        let config = ClientConfig::default().with_opendart_api_key("abc123");
        let client = KfcClient::new(config, &registry).unwrap();

        let request = client
            .request(DataSource::OpenDart, Method::GET, "list.json")
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/api/list.json");
        assert_eq!(request.url().query(), Some("crtfc_key=abc123"));

        let krx = client
            .request(DataSource::Krx, Method::POST, "/comm/bldAttendant/getJsonData.cmd")
            .build()
            .unwrap();
        assert!(krx.url().query().is_none());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let registry = RateLimiterRegistry::new();
        let config = ClientConfig::default().with_opendart_api_key("abc123");
        let client = KfcClient::new(config, &registry).unwrap();
        assert!(!format!("{:?}", client).contains("abc123"));
    }

    #[test]
    fn test_rate_limit_status_covers_all_sources() {
        let registry = RateLimiterRegistry::new();
        let client = KfcClient::new(ClientConfig::default(), &registry).unwrap();

        let statuses = client.rate_limit_status();
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].0, DataSource::Krx);
        assert_eq!(statuses[0].1.capacity, 25);
        assert_eq!(statuses[2].1.capacity, 50);
    }
}
