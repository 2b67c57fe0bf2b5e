//! KFC rate limiter CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 설정 파일 기준 소스별 상태
//! kfc status --config config/kfc.toml
//!
//! # JSON 출력
//! kfc status --json
//!
//! # KRX limiter에 4개 태스크로 100회 acquire
//! kfc probe --source KRX --requests 100 --concurrency 4
//!
//! # 한도를 바꿔서 시험
//! kfc probe --source OPENDART --capacity 5 --refill-rate 2 --timeout-ms 1000
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kfc_client::ClientConfig;
use kfc_ratelimit::{DataSource, RateLimitConfig};
use tracing::info;

mod commands;

use commands::probe::{print_report, run_probe, ProbeConfig};
use commands::status::print_status;

#[derive(Parser)]
#[command(name = "kfc")]
#[command(about = "KFC rate limiter CLI - KRX/Naver/OPENDART 호출 한도 관리", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (없으면 환경 변수만 사용)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON으로 출력
    #[arg(long, global = true, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 소스별 rate limiter 설정과 현재 상태 출력
    Status,

    /// 하나의 limiter에 동시 acquire를 걸어 처리율 측정 (네트워크 없음)
    Probe {
        /// 데이터 소스 (KRX, Naver, OPENDART)
        #[arg(short, long)]
        source: DataSource,

        /// 전체 acquire 횟수
        #[arg(short, long, default_value = "50")]
        requests: u32,

        /// 동시 태스크 수
        #[arg(short = 'n', long, default_value = "4")]
        concurrency: u32,

        /// 버킷 용량 (미지정 시 설정값)
        #[arg(long)]
        capacity: Option<u32>,

        /// 초당 충전량 (미지정 시 설정값)
        #[arg(long)]
        refill_rate: Option<u32>,

        /// 대기 타임아웃 밀리초 (미지정 시 설정값)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// acquire 1회당 토큰 수
        #[arg(short, long, default_value = "1")]
        tokens: u32,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일은 없어도 됨
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    // 설정 파일이 없으면 RUST_LOG/LOG_FORMAT 기준
    if cli.config.is_some() {
        kfc_core::init_logging(config.logging.to_log_config())?;
    } else {
        kfc_core::init_logging_from_env()?;
    }

    match cli.command {
        Commands::Status => {
            info!(config = ?cli.config, "Showing rate limiter status");
            print_status(config, cli.json)?;
        }

        Commands::Probe {
            source,
            requests,
            concurrency,
            capacity,
            refill_rate,
            timeout_ms,
            tokens,
        } => {
            let base = config.rate_limiting.for_source(source);
            let limit = RateLimitConfig::new(
                capacity.unwrap_or(base.capacity()),
                refill_rate.unwrap_or(base.refill_rate()),
                base.is_enabled(),
                timeout_ms.unwrap_or(base.wait_timeout_ms()),
            )?;

            let probe = ProbeConfig {
                source,
                requests,
                concurrency,
                tokens,
                limit,
            };
            let report = run_probe(&probe).await?;
            print_report(&report, cli.json)?;
        }
    }

    Ok(())
}
