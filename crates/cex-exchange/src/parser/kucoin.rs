//! Kucoin 페이로드 정규화.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use cex_core::{millis_to_datetime, Candlestick, FundingRate, Interval, MarketKind, Ticker};
use rust_decimal::Decimal;

use super::{decimal_from_f64, opt_dec_field, parse_decimal, str_field};
use crate::connector::kucoin::{KucoinAllTickers, KucoinFundingEntry};
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange_info::{ExchangeInfo, InstrumentMeta};

/// 현물 심볼 목록을 정규 식별자 맵으로 변환합니다.
pub fn parse_spot_exchange_info(
    list: &[Value],
) -> ExchangeResult<HashMap<String, InstrumentMeta>> {
    let mut instruments = HashMap::new();

    for raw in list {
        let enabled = raw
            .get("enableTrading")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !enabled {
            continue;
        }
        let symbol = str_field(raw, "symbol")?;
        let base = str_field(raw, "baseCurrency")?;
        let quote = str_field(raw, "quoteCurrency")?;

        instruments.insert(
            format!("{}/{}", base, quote),
            InstrumentMeta {
                exchange_symbol: symbol.to_string(),
                category: "spot".to_string(),
                market: MarketKind::Spot,
                raw_data: raw.clone(),
            },
        );
    }

    Ok(instruments)
}

/// 활성 선물 계약 목록을 정규 식별자 맵으로 변환합니다.
///
/// `expireDate`가 없으면 무기한, 있으면 만기 선물입니다.
pub fn parse_futures_exchange_info(
    list: &[Value],
) -> ExchangeResult<HashMap<String, InstrumentMeta>> {
    let mut instruments = HashMap::new();

    for raw in list {
        if str_field(raw, "status")? != "Open" {
            continue;
        }
        let symbol = str_field(raw, "symbol")?;
        let base = str_field(raw, "baseCurrency")?;
        let quote = str_field(raw, "quoteCurrency")?;
        let settle = str_field(raw, "settleCurrency")?;

        let expiry = raw
            .get("expireDate")
            .and_then(Value::as_i64)
            .and_then(millis_to_datetime);
        let (instrument_id, market) = match expiry {
            None => (format!("{}/{}:{}", base, quote, settle), MarketKind::Perp),
            Some(date) => (
                format!("{}/{}:{}-{}", base, quote, settle, date.format("%y%m%d")),
                MarketKind::Futures,
            ),
        };

        instruments.insert(
            instrument_id,
            InstrumentMeta {
                exchange_symbol: symbol.to_string(),
                category: "futures".to_string(),
                market,
                raw_data: raw.clone(),
            },
        );
    }

    Ok(instruments)
}

/// 현물 캔들 행들을 정규화합니다.
///
/// 행 형식은 `[time(초), open, close, high, low, volume, turnover]`이며
/// 타임스탬프는 밀리초로 환산합니다.
pub fn parse_candlesticks(
    rows: &[Vec<String>],
    instrument_id: &str,
    interval: Interval,
) -> ExchangeResult<Vec<Candlestick>> {
    rows.iter()
        .map(|row| {
            if row.len() < 7 {
                return Err(ExchangeError::Parse(format!(
                    "candle row has {} fields, expected 7",
                    row.len()
                )));
            }
            let seconds: i64 = row[0]
                .parse()
                .map_err(|_| ExchangeError::Parse(format!("invalid candle time: {:?}", row[0])))?;
            Ok(Candlestick {
                instrument_id: instrument_id.to_string(),
                timestamp: seconds * 1000,
                interval,
                open: parse_decimal(&row[1], "candle open")?,
                close: parse_decimal(&row[2], "candle close")?,
                high: parse_decimal(&row[3], "candle high")?,
                low: parse_decimal(&row[4], "candle low")?,
                base_volume: parse_decimal(&row[5], "candle volume")?,
                quote_volume: Some(parse_decimal(&row[6], "candle turnover")?),
            })
        })
        .collect()
}

/// 선물 펀딩비 히스토리를 정규화합니다.
pub fn parse_funding_history(
    entries: &[KucoinFundingEntry],
    instrument_id: &str,
) -> ExchangeResult<Vec<FundingRate>> {
    entries
        .iter()
        .map(|entry| {
            Ok(FundingRate {
                instrument_id: instrument_id.to_string(),
                timestamp: entry.timepoint,
                funding_rate: decimal_from_f64(entry.funding_rate, "fundingRate")?,
            })
        })
        .collect()
}

/// 현물 전체 시세를 정규화합니다.
///
/// 거래소 정보에 없거나 체결가가 비어 있는 심볼은 건너뜁니다.
pub fn parse_spot_tickers(
    tickers: &KucoinAllTickers,
    info: &ExchangeInfo,
) -> ExchangeResult<Vec<Ticker>> {
    let mut results = Vec::with_capacity(tickers.ticker.len());

    for raw in &tickers.ticker {
        let symbol = str_field(raw, "symbol")?;
        let Some(instrument_id) = info.id_by_exchange_symbol("spot", symbol) else {
            debug!(symbol, "Ticker symbol not in exchange info");
            continue;
        };
        let Some(last_price) = opt_dec_field(raw, "last")? else {
            debug!(symbol, "Ticker has no last price, skipping");
            continue;
        };

        results.push(Ticker {
            instrument_id: instrument_id.to_string(),
            market: MarketKind::Spot,
            timestamp: tickers.time,
            last_price,
            high_24h: opt_dec_field(raw, "high")?.unwrap_or_default(),
            low_24h: opt_dec_field(raw, "low")?.unwrap_or_default(),
            base_volume: opt_dec_field(raw, "vol")?.unwrap_or_default(),
            quote_volume: opt_dec_field(raw, "volValue")?.unwrap_or_default(),
            price_change: opt_dec_field(raw, "changePrice")?,
            price_change_percent: opt_dec_field(raw, "changeRate")?
                .map(|rate| rate * Decimal::from(100)),
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_spot_exchange_info() {
        let list = vec![
            json!({"symbol": "BTC-USDT", "baseCurrency": "BTC", "quoteCurrency": "USDT", "enableTrading": true}),
            json!({"symbol": "OLD-USDT", "baseCurrency": "OLD", "quoteCurrency": "USDT", "enableTrading": false}),
        ];
        let parsed = parse_spot_exchange_info(&list).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["BTC/USDT"].exchange_symbol, "BTC-USDT");
    }

    #[test]
    fn test_parse_futures_exchange_info() {
        let list = vec![
            json!({
                "symbol": "XBTUSDTM", "baseCurrency": "XBT", "quoteCurrency": "USDT",
                "settleCurrency": "USDT", "status": "Open", "expireDate": null
            }),
            json!({
                "symbol": "XBTMU25", "baseCurrency": "XBT", "quoteCurrency": "USD",
                "settleCurrency": "XBT", "status": "Open", "expireDate": 1758873600000i64
            }),
        ];
        let parsed = parse_futures_exchange_info(&list).unwrap();
        assert_eq!(parsed["XBT/USDT:USDT"].market, MarketKind::Perp);
        assert_eq!(parsed["XBT/USD:XBT-250926"].market, MarketKind::Futures);
    }

    #[test]
    fn test_parse_candlesticks_scales_seconds() {
        let rows = vec![vec![
            "1545904980".to_string(),
            "0.058".to_string(),
            "0.049".to_string(),
            "0.058".to_string(),
            "0.049".to_string(),
            "0.018".to_string(),
            "0.000945".to_string(),
        ]];
        let parsed = parse_candlesticks(&rows, "ETH/BTC", Interval::M1).unwrap();
        assert_eq!(parsed[0].timestamp, 1545904980000);
        assert_eq!(parsed[0].open, dec!(0.058));
        assert_eq!(parsed[0].close, dec!(0.049));
        assert_eq!(parsed[0].high, dec!(0.058));
        assert_eq!(parsed[0].low, dec!(0.049));
    }

    #[test]
    fn test_parse_funding_history() {
        let entries = vec![KucoinFundingEntry {
            symbol: "XBTUSDTM".to_string(),
            funding_rate: 0.0001,
            timepoint: 1700208000000,
        }];
        let parsed = parse_funding_history(&entries, "XBT/USDT:USDT").unwrap();
        assert_eq!(parsed[0].timestamp, 1700208000000);
        assert_eq!(parsed[0].funding_rate, dec!(0.0001));
    }
}
