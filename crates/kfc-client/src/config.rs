//! 클라이언트 설정.
//!
//! 설정 파일(TOML)과 환경 변수(`KFC__` 접두사)에서 로드합니다.
//!
//! ```toml
//! opendart_api_key = "..."
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [rate_limiting.krx]
//! capacity = 25
//! refill_rate = 25
//! wait_timeout_ms = 60000
//!
//! [http]
//! timeout_secs = 30
//! ```
//!
//! 환경 변수 예: `KFC__RATE_LIMITING__KRX__CAPACITY=10`

use std::path::Path;

use kfc_core::LogConfig;
use kfc_ratelimit::{DataSource, RateLimitingSettings};
use serde::Deserialize;

/// 클라이언트 설정.
#[derive(Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingSettings,
    /// 소스별 Rate limiting 설정
    #[serde(default)]
    pub rate_limiting: RateLimitingSettings,
    /// HTTP 설정
    #[serde(default)]
    pub http: HttpSettings,
    /// 소스별 API 기본 URL
    #[serde(default)]
    pub endpoints: EndpointSettings,
    /// OPENDART 인증키
    #[serde(default)]
    pub opendart_api_key: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("logging", &self.logging)
            .field("rate_limiting", &self.rate_limiting)
            .field("http", &self.http)
            .field("endpoints", &self.endpoints)
            .field(
                "opendart_api_key",
                &self.opendart_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    /// [`LogConfig`]로 변환.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::from_settings(&self.level, &self.format)
    }
}

/// HTTP 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User-Agent 헤더
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("kfc/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// 소스별 API 기본 URL.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// KRX 정보데이터시스템
    #[serde(default = "default_krx_base_url")]
    pub krx_base_url: String,
    /// 네이버 금융
    #[serde(default = "default_naver_base_url")]
    pub naver_base_url: String,
    /// OPENDART
    #[serde(default = "default_opendart_base_url")]
    pub opendart_base_url: String,
}

fn default_krx_base_url() -> String {
    "http://data.krx.co.kr".to_string()
}
fn default_naver_base_url() -> String {
    "https://finance.naver.com".to_string()
}
fn default_opendart_base_url() -> String {
    "https://opendart.fss.or.kr/api".to_string()
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            krx_base_url: default_krx_base_url(),
            naver_base_url: default_naver_base_url(),
            opendart_base_url: default_opendart_base_url(),
        }
    }
}

impl EndpointSettings {
    /// 소스별 기본 URL.
    pub fn base_url(&self, source: DataSource) -> &str {
        match source {
            DataSource::Krx => &self.krx_base_url,
            DataSource::Naver => &self.naver_base_url,
            DataSource::OpenDart => &self.opendart_base_url,
        }
    }

    /// 모든 소스를 같은 URL로 지정 (테스트 서버용).
    pub fn all_at(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            krx_base_url: base_url.clone(),
            naver_base_url: base_url.clone(),
            opendart_base_url: base_url,
        }
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("KFC")
        .separator("__")
        .try_parsing(true)
}

impl ClientConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 잘못된 rate limit 값(0 등)이 있으면 에러를 반환합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// 환경 변수만으로 설정을 로드합니다.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// TOML 문자열에서 설정을 로드합니다 (환경 변수 미적용).
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Rate limiting 설정을 교체합니다.
    pub fn with_rate_limiting(mut self, settings: RateLimitingSettings) -> Self {
        self.rate_limiting = settings;
        self
    }

    /// 모든 소스의 기본 URL을 교체합니다.
    pub fn with_endpoints(mut self, endpoints: EndpointSettings) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// OPENDART 인증키 지정.
    pub fn with_opendart_api_key(mut self, key: impl Into<String>) -> Self {
        self.opendart_api_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_core::LogFormat;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.rate_limiting, RateLimitingSettings::default());
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.endpoints.base_url(DataSource::Krx), "http://data.krx.co.kr");
        assert!(config.opendart_api_key.is_none());
    }

    #[test]
    fn test_rate_limit_sections() {
        let config = ClientConfig::from_toml_str(
            r#"
            [rate_limiting.krx]
            capacity = 10
            refill_rate = 5
            wait_timeout_ms = 2000

            [rate_limiting.naver]
            enabled = false
            "#,
        )
        .unwrap();

        let krx = config.rate_limiting.for_source(DataSource::Krx);
        assert_eq!(krx.capacity(), 10);
        assert_eq!(krx.refill_rate(), 5);
        assert_eq!(krx.wait_timeout_ms(), 2000);
        assert!(!config.rate_limiting.naver.is_enabled());
        assert_eq!(
            config.rate_limiting.opendart,
            RateLimitingSettings::opendart_default()
        );
    }

    #[test]
    fn test_invalid_rate_limit_rejected() {
        let result = ClientConfig::from_toml_str(
            r#"
            [rate_limiting.opendart]
            refill_rate = 0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_section() {
        let config = ClientConfig::from_toml_str(
            r#"
            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        let log_config = config.logging.to_log_config();
        assert_eq!(log_config.level, "debug");
        assert_eq!(log_config.format, LogFormat::Json);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::default().with_opendart_api_key("super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
