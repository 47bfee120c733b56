//! 거래소 어댑터 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 거래소 정보 동기화 및 요약
//! cex sync -e bybit
//!
//! # Bybit 무기한 1시간봉 다운로드
//! cex klines -e bybit -s BTC/USDT:USDT -i 1h -f 2024-01-01 -t 2024-03-31
//!
//! # 최신 펀딩비 200개 다운로드
//! cex funding -e bybit -s BTC/USDT:USDT -n 200
//! ```

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

use commands::download::{
    default_output_path, download_funding, download_klines, parse_date, DownloadConfig, Exchange,
};
use commands::sync::sync_exchange;
use cex_core::Interval;

#[derive(Parser)]
#[command(name = "cex")]
#[command(about = "Unified market data CLI for crypto exchanges", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 거래소 정보 동기화 및 요약 출력
    Sync {
        /// 거래소 (bybit, kucoin, woo)
        #[arg(short, long)]
        exchange: String,
    },

    /// 과거 캔들스틱 다운로드
    Klines {
        /// 거래소 (bybit, kucoin, woo)
        #[arg(short, long)]
        exchange: String,

        /// 정규 상품 식별자 (예: BTC/USDT, BTC/USDT:USDT)
        #[arg(short = 's', long)]
        instrument: String,

        /// 캔들 간격 (1m, 5m, 1h, 1d, ...)
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// 시작 날짜 (YYYY-MM-DD)
        #[arg(short = 'f', long)]
        from: Option<String>,

        /// 종료 날짜 (YYYY-MM-DD)
        #[arg(short = 't', long)]
        to: Option<String>,

        /// 최신 캔들 개수 (범위 대신)
        #[arg(short, long)]
        num: Option<usize>,

        /// 출력 파일 경로 (기본: 자동 생성)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// 과거 펀딩비 다운로드
    Funding {
        /// 거래소 (bybit, kucoin)
        #[arg(short, long)]
        exchange: String,

        /// 정규 상품 식별자 (예: BTC/USDT:USDT)
        #[arg(short = 's', long)]
        instrument: String,

        /// 시작 날짜 (YYYY-MM-DD)
        #[arg(short = 'f', long)]
        from: Option<String>,

        /// 종료 날짜 (YYYY-MM-DD)
        #[arg(short = 't', long)]
        to: Option<String>,

        /// 최신 항목 개수 (범위 대신)
        #[arg(short, long)]
        num: Option<usize>,

        /// 출력 파일 경로 (기본: 자동 생성)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn parse_exchange(s: &str) -> Result<Exchange, String> {
    Exchange::from_str(s)
        .ok_or_else(|| format!("Invalid exchange: {}. Supported: bybit, kucoin, woo", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    cex_core::init_logging_from_env()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { exchange } => {
            let exchange = parse_exchange(&exchange)?;
            if let Err(e) = sync_exchange(exchange).await {
                error!("Sync failed: {}", e);
                return Err(e.into());
            }
        }

        Commands::Klines {
            exchange,
            instrument,
            interval,
            from,
            to,
            num,
            output,
        } => {
            let exchange = parse_exchange(&exchange)?;
            let interval = Interval::parse(&interval).ok_or_else(|| {
                format!("Invalid interval: {}. Supported: 1m..1M", interval)
            })?;

            let start_date = from.as_deref().map(parse_date).transpose()?;
            let end_date = to.as_deref().map(parse_date).transpose()?;

            let output_path = output.unwrap_or_else(|| {
                default_output_path(exchange, &instrument, "klines", Some(interval))
            });

            let config = DownloadConfig {
                exchange,
                instrument,
                interval,
                start_date,
                end_date,
                num,
                output_path: output_path.clone(),
            };

            match download_klines(config).await {
                Ok(count) => {
                    println!("\n데이터 다운로드 완료: {} 캔들", count);
                    println!("저장 위치: {}", output_path);
                }
                Err(e) => {
                    error!("Download failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        Commands::Funding {
            exchange,
            instrument,
            from,
            to,
            num,
            output,
        } => {
            let exchange = parse_exchange(&exchange)?;
            let start_date = from.as_deref().map(parse_date).transpose()?;
            let end_date = to.as_deref().map(parse_date).transpose()?;

            let output_path = output
                .unwrap_or_else(|| default_output_path(exchange, &instrument, "funding", None));

            let config = DownloadConfig {
                exchange,
                instrument,
                interval: Interval::H1, // 펀딩비에는 쓰이지 않음
                start_date,
                end_date,
                num,
                output_path: output_path.clone(),
            };

            match download_funding(config).await {
                Ok(count) => {
                    println!("\n데이터 다운로드 완료: {} 항목", count);
                    println!("저장 위치: {}", output_path);
                }
                Err(e) => {
                    error!("Download failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
