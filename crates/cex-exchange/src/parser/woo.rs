//! WOO X 페이로드 정규화.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use cex_core::{Candlestick, Interval, MarketKind};

use super::{decimal_from_f64, str_field};
use crate::connector::woo::WooKlineRow;
use crate::error::ExchangeResult;
use crate::exchange_info::InstrumentMeta;

/// 심볼 목록을 정규 식별자 맵으로 변환합니다.
///
/// WOO 심볼은 `SPOT_BTC_USDT` / `PERP_BTC_USDT` 형식입니다. 알 수 없는
/// 접두사는 건너뜁니다.
pub fn parse_exchange_info(list: &[Value]) -> ExchangeResult<HashMap<String, InstrumentMeta>> {
    let mut instruments = HashMap::new();

    for raw in list {
        let symbol = str_field(raw, "symbol")?;
        let parts: Vec<&str> = symbol.split('_').collect();
        let [venue, base, quote] = parts.as_slice() else {
            debug!(symbol, "Unrecognized WOO symbol format");
            continue;
        };

        let (instrument_id, market, category) = match *venue {
            "SPOT" => (format!("{}/{}", base, quote), MarketKind::Spot, "spot"),
            "PERP" => (
                format!("{}/{}:{}", base, quote, quote),
                MarketKind::Perp,
                "perp",
            ),
            _ => {
                debug!(symbol, "Unrecognized WOO venue prefix");
                continue;
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

/// 캔들 행들을 정규화합니다.
pub fn parse_candlesticks(
    rows: &[WooKlineRow],
    instrument_id: &str,
    interval: Interval,
) -> ExchangeResult<Vec<Candlestick>> {
    rows.iter()
        .map(|row| {
            Ok(Candlestick {
                instrument_id: instrument_id.to_string(),
                timestamp: row.start_timestamp,
                interval,
                open: decimal_from_f64(row.open, "kline open")?,
                high: decimal_from_f64(row.high, "kline high")?,
                low: decimal_from_f64(row.low, "kline low")?,
                close: decimal_from_f64(row.close, "kline close")?,
                base_volume: decimal_from_f64(row.volume, "kline volume")?,
                quote_volume: Some(decimal_from_f64(row.amount, "kline amount")?),
            })
        })
        .collect()
}
