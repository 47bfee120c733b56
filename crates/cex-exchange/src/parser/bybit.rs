//! Bybit v5 페이로드 정규화.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use cex_core::{
    millis_to_datetime, BookLevel, Candlestick, FundingRate, Interval, MarketKind, OpenInterest,
    OrderBookSnapshot, PricePoint, Ticker,
};
use rust_decimal::Decimal;

use super::{dec_field, opt_dec_field, parse_decimal, parse_millis, str_field};
use crate::connector::bybit::{
    BybitFundingHistory, BybitKlines, BybitOpenInterestResult, BybitOrderbook, BybitTickers,
};
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange_info::{ExchangeInfo, InstrumentMeta};

/// 카테고리별 상품 목록을 정규 식별자 맵으로 변환합니다.
///
/// 거래 중(`Trading`) 상품만 수집합니다. 식별자 규칙:
/// - 현물: `BASE/QUOTE`
/// - 무기한: `BASE/QUOTE:SETTLE`
/// - 만기 선물: `BASE/QUOTE:SETTLE-YYMMDD`
pub fn parse_exchange_info(
    category: &str,
    list: &[Value],
) -> ExchangeResult<HashMap<String, InstrumentMeta>> {
    let mut instruments = HashMap::new();

    for raw in list {
        if str_field(raw, "status")? != "Trading" {
            continue;
        }
        let symbol = str_field(raw, "symbol")?;
        let base = str_field(raw, "baseCoin")?;
        let quote = str_field(raw, "quoteCoin")?;

        let (instrument_id, market) = if category == "spot" {
            (format!("{}/{}", base, quote), MarketKind::Spot)
        } else {
            let settle = str_field(raw, "settleCoin")?;
            let contract_type = str_field(raw, "contractType")?;
            if contract_type.ends_with("Perpetual") {
                (format!("{}/{}:{}", base, quote, settle), MarketKind::Perp)
            } else {
                let expiry = str_field(raw, "deliveryTime")
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(millis_to_datetime)
                    .map(|dt| dt.format("%y%m%d").to_string())
                    .ok_or_else(|| {
                        ExchangeError::Parse(format!("missing deliveryTime for {}", symbol))
                    })?;
                (
                    format!("{}/{}:{}-{}", base, quote, settle, expiry),
                    MarketKind::Futures,
                )
            }
        };

        instruments.insert(
            instrument_id,
            InstrumentMeta {
                exchange_symbol: symbol.to_string(),
                category: category.to_string(),
                market,
                raw_data: raw.clone(),
            },
        );
    }

    Ok(instruments)
}

/// 캔들 행들을 정규화합니다. 행 순서(최신순)는 그대로 유지합니다.
pub fn parse_candlesticks(
    klines: &BybitKlines,
    instrument_id: &str,
    interval: Interval,
) -> ExchangeResult<Vec<Candlestick>> {
    klines
        .list
        .iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(ExchangeError::Parse(format!(
                    "kline row has {} fields, expected at least 6",
                    row.len()
                )));
            }
            Ok(Candlestick {
                instrument_id: instrument_id.to_string(),
                timestamp: parse_millis(&row[0], "kline startTime")?,
                interval,
                open: parse_decimal(&row[1], "kline open")?,
                high: parse_decimal(&row[2], "kline high")?,
                low: parse_decimal(&row[3], "kline low")?,
                close: parse_decimal(&row[4], "kline close")?,
                base_volume: parse_decimal(&row[5], "kline volume")?,
                quote_volume: row
                    .get(6)
                    .map(|s| parse_decimal(s, "kline turnover"))
                    .transpose()?,
            })
        })
        .collect()
}

/// 펀딩비 히스토리를 정규화합니다.
pub fn parse_funding_history(
    history: &BybitFundingHistory,
    instrument_id: &str,
) -> ExchangeResult<Vec<FundingRate>> {
    history
        .list
        .iter()
        .map(|entry| {
            Ok(FundingRate {
                instrument_id: instrument_id.to_string(),
                timestamp: parse_millis(&entry.funding_rate_timestamp, "fundingRateTimestamp")?,
                funding_rate: parse_decimal(&entry.funding_rate, "fundingRate")?,
            })
        })
        .collect()
}

/// 원시 시세 항목 하나를 정규화합니다.
fn build_ticker(
    raw: &Value,
    instrument_id: &str,
    market: MarketKind,
    timestamp: i64,
) -> ExchangeResult<Ticker> {
    let last_price = dec_field(raw, "lastPrice")?;
    let prev_price = opt_dec_field(raw, "prevPrice24h")?;

    Ok(Ticker {
        instrument_id: instrument_id.to_string(),
        market,
        timestamp,
        last_price,
        high_24h: dec_field(raw, "highPrice24h")?,
        low_24h: dec_field(raw, "lowPrice24h")?,
        base_volume: dec_field(raw, "volume24h")?,
        quote_volume: dec_field(raw, "turnover24h")?,
        price_change: prev_price.map(|prev| last_price - prev),
        price_change_percent: opt_dec_field(raw, "price24hPcnt")?
            .map(|pcnt| pcnt * Decimal::from(100)),
    })
}

/// 카테고리 전체 시세를 정규화합니다.
///
/// 거래소 정보에 없는 심볼(상장 폐지 등)은 건너뜁니다.
pub fn parse_tickers(tickers: &BybitTickers, info: &ExchangeInfo) -> ExchangeResult<Vec<Ticker>> {
    let mut results = Vec::with_capacity(tickers.list.len());

    for raw in &tickers.list {
        let symbol = str_field(raw, "symbol")?;
        let Some(instrument_id) = info.id_by_exchange_symbol(&tickers.category, symbol) else {
            debug!(symbol, category = %tickers.category, "Ticker symbol not in exchange info");
            continue;
        };
        let market = info.get(instrument_id)?.market;
        results.push(build_ticker(raw, instrument_id, market, tickers.server_time)?);
    }

    Ok(results)
}

/// 단일 심볼 시세 응답을 정규화합니다.
pub fn parse_raw_ticker(
    tickers: &BybitTickers,
    instrument_id: &str,
    market: MarketKind,
) -> ExchangeResult<Ticker> {
    let raw = tickers
        .list
        .first()
        .ok_or_else(|| ExchangeError::Parse(format!("empty ticker list for {}", instrument_id)))?;
    build_ticker(raw, instrument_id, market, tickers.server_time)
}

/// 시세 응답에서 현재 펀딩비를 추출합니다.
pub fn parse_current_funding_rate(
    tickers: &BybitTickers,
    instrument_id: &str,
) -> ExchangeResult<FundingRate> {
    let raw = tickers
        .list
        .first()
        .ok_or_else(|| ExchangeError::Parse(format!("empty ticker list for {}", instrument_id)))?;

    Ok(FundingRate {
        instrument_id: instrument_id.to_string(),
        timestamp: tickers.server_time,
        funding_rate: dec_field(raw, "fundingRate")?,
    })
}

/// 시세 응답에서 기준 가격(최종/지수/마크)을 추출합니다.
pub fn parse_price_point(
    tickers: &BybitTickers,
    instrument_id: &str,
    field: &str,
) -> ExchangeResult<PricePoint> {
    let raw = tickers
        .list
        .first()
        .ok_or_else(|| ExchangeError::Parse(format!("empty ticker list for {}", instrument_id)))?;

    Ok(PricePoint {
        instrument_id: instrument_id.to_string(),
        timestamp: tickers.server_time,
        price: dec_field(raw, field)?,
    })
}

/// 미결제약정 응답을 정규화합니다 (최신 항목).
pub fn parse_open_interest(
    result: &BybitOpenInterestResult,
    instrument_id: &str,
) -> ExchangeResult<OpenInterest> {
    let entry = result
        .list
        .first()
        .ok_or_else(|| ExchangeError::Parse(format!("empty open interest for {}", instrument_id)))?;

    Ok(OpenInterest {
        instrument_id: instrument_id.to_string(),
        timestamp: parse_millis(&entry.timestamp, "openInterest timestamp")?,
        open_interest: parse_decimal(&entry.open_interest, "openInterest")?,
    })
}

/// 호가창 응답을 정규화합니다.
pub fn parse_orderbook(
    orderbook: &BybitOrderbook,
    instrument_id: &str,
) -> ExchangeResult<OrderBookSnapshot> {
    let parse_side = |levels: &[[String; 2]], side: &str| -> ExchangeResult<Vec<BookLevel>> {
        levels
            .iter()
            .map(|level| {
                Ok(BookLevel {
                    price: parse_decimal(&level[0], side)?,
                    quantity: parse_decimal(&level[1], side)?,
                })
            })
            .collect()
    };

    Ok(OrderBookSnapshot {
        instrument_id: instrument_id.to_string(),
        timestamp: orderbook.ts,
        bids: parse_side(&orderbook.b, "bid")?,
        asks: parse_side(&orderbook.a, "ask")?,
    })
}
