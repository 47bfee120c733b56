//! 과거 시장 데이터 다운로드 명령어.
//!
//! 백필 엔진을 통해 캔들/펀딩비 히스토리를 조회하고 CSV로 저장합니다.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use cex_core::{millis_to_datetime, Candlestick, FundingRate, Interval};
use cex_exchange::connector::{BybitConfig, KucoinConfig, WooConfig};
use cex_exchange::{Bybit, Kucoin, MarketDataSource, Woo};

/// 지원되는 거래소.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Bybit,
    Kucoin,
    Woo,
}

impl Exchange {
    /// 문자열에서 거래소 파싱.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bybit" => Some(Self::Bybit),
            "kucoin" => Some(Self::Kucoin),
            "woo" | "woox" => Some(Self::Woo),
            _ => None,
        }
    }

    /// 거래소 이름 반환.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bybit => "bybit",
            Self::Kucoin => "kucoin",
            Self::Woo => "woo",
        }
    }

    /// 환경 변수 기반 설정으로 게이트웨이를 생성합니다.
    pub fn make_source(&self) -> Result<Box<dyn MarketDataSource>> {
        let source: Box<dyn MarketDataSource> = match self {
            Self::Bybit => Box::new(Bybit::new(BybitConfig::from_env())?),
            Self::Kucoin => Box::new(Kucoin::new(KucoinConfig::new())?),
            Self::Woo => Box::new(Woo::new(WooConfig::new())?),
        };
        Ok(source)
    }
}

/// 다운로드 설정.
pub struct DownloadConfig {
    pub exchange: Exchange,
    pub instrument: String,
    pub interval: Interval,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub num: Option<usize>,
    pub output_path: String,
}

/// 날짜 문자열 파싱 (YYYY-MM-DD).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {}. Expected YYYY-MM-DD", s))
}

/// 날짜 범위를 epoch 밀리초 닫힌 구간으로 변환합니다.
///
/// 시작일은 00:00:00.000, 종료일은 23:59:59.999로 확장합니다.
fn date_range_millis(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> (Option<i64>, Option<i64>) {
    let start = start_date.map(|d| {
        d.and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
            .timestamp_millis()
    });
    let end = end_date.map(|d| {
        d.and_hms_milli_opt(23, 59, 59, 999)
            .expect("end of day is always valid")
            .and_utc()
            .timestamp_millis()
    });
    (start, end)
}

/// 파일 이름에 쓸 수 있게 상품 식별자를 변환합니다.
fn sanitize_instrument(instrument: &str) -> String {
    instrument.replace(['/', ':'], "_")
}

/// 기본 출력 경로를 생성합니다.
pub fn default_output_path(
    exchange: Exchange,
    instrument: &str,
    kind: &str,
    interval: Option<Interval>,
) -> String {
    match interval {
        Some(interval) => format!(
            "data/{}/{}_{}_{}.csv",
            exchange.name(),
            sanitize_instrument(instrument),
            kind,
            interval
        ),
        None => format!(
            "data/{}/{}_{}.csv",
            exchange.name(),
            sanitize_instrument(instrument),
            kind
        ),
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("static template is valid"),
    );
    pb.set_message(message);
    pb
}

async fn synced_source(exchange: Exchange) -> Result<Box<dyn MarketDataSource>> {
    let mut source = exchange.make_source()?;
    let pb = spinner(format!("Syncing {} exchange info...", exchange.name()));
    source.sync_exchange_info().await?;
    pb.finish_with_message(format!(
        "Synced {} instruments from {}",
        source.exchange_info().len(),
        exchange.name()
    ));
    Ok(source)
}

/// 캔들 히스토리를 다운로드하여 CSV로 저장합니다.
pub async fn download_klines(config: DownloadConfig) -> Result<usize> {
    info!(
        "Downloading {} {} candles for {}",
        config.exchange.name(),
        config.interval,
        config.instrument
    );

    let source = synced_source(config.exchange).await?;
    let (start, end) = date_range_millis(config.start_date, config.end_date);

    let pb = spinner(format!("Backfilling {} candles...", config.instrument));
    let candles = source
        .get_history_candlesticks(&config.instrument, config.interval, start, end, config.num)
        .await?;
    pb.finish_with_message(format!("Fetched {} candles", candles.len()));

    save_klines_csv(&config.output_path, &candles)?;
    Ok(candles.len())
}

/// 펀딩비 히스토리를 다운로드하여 CSV로 저장합니다.
pub async fn download_funding(config: DownloadConfig) -> Result<usize> {
    info!(
        "Downloading {} funding history for {}",
        config.exchange.name(),
        config.instrument
    );

    let source = synced_source(config.exchange).await?;
    let (start, end) = date_range_millis(config.start_date, config.end_date);

    let pb = spinner(format!("Backfilling {} funding rates...", config.instrument));
    let rates = source
        .get_history_funding_rate(&config.instrument, start, end, config.num)
        .await?;
    pb.finish_with_message(format!("Fetched {} funding rates", rates.len()));

    save_funding_csv(&config.output_path, &rates)?;
    Ok(rates.len())
}

fn create_writer(output_path: &str) -> Result<BufWriter<File>> {
    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", output_path))?;
    Ok(BufWriter::new(file))
}

fn format_datetime(ts: i64) -> String {
    millis_to_datetime(ts)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// 캔들을 CSV 파일로 저장합니다.
fn save_klines_csv(output_path: &str, candles: &[Candlestick]) -> Result<()> {
    let mut writer = create_writer(output_path)?;

    writeln!(
        writer,
        "timestamp,datetime,open,high,low,close,base_volume,quote_volume"
    )?;
    for candle in candles {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            candle.timestamp,
            format_datetime(candle.timestamp),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.base_volume,
            candle
                .quote_volume
                .map(|v| v.to_string())
                .unwrap_or_default(),
        )?;
    }
    writer.flush()?;

    info!("Saved {} candles to {}", candles.len(), output_path);
    Ok(())
}

/// 펀딩비를 CSV 파일로 저장합니다.
fn save_funding_csv(output_path: &str, rates: &[FundingRate]) -> Result<()> {
    let mut writer = create_writer(output_path)?;

    writeln!(writer, "timestamp,datetime,funding_rate")?;
    for rate in rates {
        writeln!(
            writer,
            "{},{},{}",
            rate.timestamp,
            format_datetime(rate.timestamp),
            rate.funding_rate
        )?;
    }
    writer.flush()?;

    info!("Saved {} funding rates to {}", rates.len(), output_path);
    Ok(())
}
