//! 데이터 소스 식별자.

use serde::{Deserialize, Serialize};

/// Rate limiter를 구분하는 upstream API 소스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataSource {
    /// 한국거래소 정보데이터시스템
    #[serde(rename = "KRX")]
    Krx,
    /// 네이버 금융
    #[serde(rename = "Naver")]
    Naver,
    /// 금융감독원 전자공시 Open API
    #[serde(rename = "OPENDART")]
    OpenDart,
}

impl DataSource {
    /// Registry 키로 쓰이는 소스 이름.
    pub fn key(&self) -> &'static str {
        match self {
            DataSource::Krx => "KRX",
            DataSource::Naver => "Naver",
            DataSource::OpenDart => "OPENDART",
        }
    }

    /// 모든 소스 반환.
    pub fn all() -> [DataSource; 3] {
        [DataSource::Krx, DataSource::Naver, DataSource::OpenDart]
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KRX" => Ok(DataSource::Krx),
            "NAVER" => Ok(DataSource::Naver),
            "OPENDART" | "DART" => Ok(DataSource::OpenDart),
            _ => Err(format!(
                "Unknown data source: {}. Supported: KRX, Naver, OPENDART",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(DataSource::Krx.key(), "KRX");
        assert_eq!(DataSource::Naver.to_string(), "Naver");
        assert_eq!(DataSource::OpenDart.to_string(), "OPENDART");
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("krx".parse::<DataSource>().unwrap(), DataSource::Krx);
        assert_eq!("naver".parse::<DataSource>().unwrap(), DataSource::Naver);
        assert_eq!("OpenDart".parse::<DataSource>().unwrap(), DataSource::OpenDart);
        assert_eq!("dart".parse::<DataSource>().unwrap(), DataSource::OpenDart);
        assert!("yahoo".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_key_round_trips_through_from_str() {
        for source in DataSource::all() {
            assert_eq!(source.key().parse::<DataSource>().unwrap(), source);
        }
    }
}
