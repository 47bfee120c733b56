//! Integration tests for the Bybit gateway against a mock v5 API.
//!
//! These drive the full path: exchange-info sync, instrument resolution,
//! paged backfill through the engine, and normalization.

use mockito::{Matcher, ServerGuard};
use serde_json::json;

use cex_core::{Interval, MarketKind};
use cex_exchange::connector::bybit::BybitConfig;
use cex_exchange::{Bybit, ExchangeError, MarketDataSource};

const HOUR_MS: i64 = 3_600_000;
const FUNDING_MS: i64 = 8 * 3_600_000;

/// Hourly candle timestamp for index `k`.
fn candle_ts(k: i64) -> i64 {
    1_700_000_000_000 + k * HOUR_MS
}

/// 8h funding timestamp for index `k`.
fn funding_ts(k: i64) -> i64 {
    1_700_000_000_000 + k * FUNDING_MS
}

/// Builds a kline response with rows for indices `hi..=lo`, newest first.
fn kline_body(hi: i64, lo: i64) -> String {
    let rows: Vec<serde_json::Value> = (lo..=hi)
        .rev()
        .map(|k| {
            json!([
                candle_ts(k).to_string(),
                "17000",
                "17100",
                "16900",
                "17050",
                "100",
                "1705000"
            ])
        })
        .collect();

    json!({
        "retCode": 0,
        "retMsg": "OK",
        "result": {"category": "linear", "symbol": "BTCUSDT", "list": rows},
        "time": 1_700_000_000_000i64
    })
    .to_string()
}

/// Builds a funding history response with rows for indices `hi..=lo`.
fn funding_body(hi: i64, lo: i64) -> String {
    let rows: Vec<serde_json::Value> = (lo..=hi)
        .rev()
        .map(|k| {
            json!({
                "symbol": "BTCUSDT",
                "fundingRate": "0.0001",
                "fundingRateTimestamp": funding_ts(k).to_string()
            })
        })
        .collect();

    json!({
        "retCode": 0,
        "retMsg": "OK",
        "result": {"category": "linear", "list": rows},
        "time": 1_700_000_000_000i64
    })
    .to_string()
}

/// Mounts instruments-info mocks for all three categories.
async fn mock_exchange_info(server: &mut ServerGuard) {
    let spot = json!({
        "retCode": 0, "retMsg": "OK",
        "result": {"category": "spot", "list": [
            {"symbol": "BTCUSDT", "baseCoin": "BTC", "quoteCoin": "USDT", "status": "Trading"}
        ]},
        "time": 1_700_000_000_000i64
    });
    let linear = json!({
        "retCode": 0, "retMsg": "OK",
        "result": {"category": "linear", "list": [
            {"symbol": "BTCUSDT", "baseCoin": "BTC", "quoteCoin": "USDT",
             "settleCoin": "USDT", "contractType": "LinearPerpetual", "status": "Trading"}
        ]},
        "time": 1_700_000_000_000i64
    });
    let inverse = json!({
        "retCode": 0, "retMsg": "OK",
        "result": {"category": "inverse", "list": [
            {"symbol": "BTCUSD", "baseCoin": "BTC", "quoteCoin": "USD",
             "settleCoin": "BTC", "contractType": "InversePerpetual", "status": "Trading"}
        ]},
        "time": 1_700_000_000_000i64
    });

    for (category, body) in [("spot", spot), ("linear", linear), ("inverse", inverse)] {
        server
            .mock("GET", "/v5/market/instruments-info")
            .match_query(Matcher::UrlEncoded("category".into(), category.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
    }
}

async fn connected_gateway(server: &mut ServerGuard) -> Bybit {
    mock_exchange_info(server).await;
    let config = BybitConfig::new().with_base_url(server.url());
    Bybit::connect(config).await.expect("connect should succeed")
}

#[tokio::test]
async fn test_sync_builds_canonical_ids() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    let info = gateway.exchange_info();
    assert_eq!(info.len(), 3);
    assert!(info.get("BTC/USDT").is_ok());
    assert!(info.get("BTC/USDT:USDT").is_ok());
    assert!(info.get("BTC/USD:BTC").is_ok());
    assert_eq!(info.ids_by_market(MarketKind::Perp).len(), 2);
}

#[tokio::test]
async fn test_history_candlesticks_pages_until_range_covered() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    // Range [candle 300, candle 1499]: first page is full (1000 rows,
    // 1499..=500), the follow-up cursor is min+1 and yields a partial
    // page (500..=0) that terminates the loop.
    let start = candle_ts(300);
    let end = candle_ts(1499);

    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::UrlEncoded("end".into(), (end + 1).to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(kline_body(1499, 500))
        .create_async()
        .await;
    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::UrlEncoded(
            "end".into(),
            (candle_ts(500) + 1).to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(kline_body(500, 0))
        .create_async()
        .await;

    let candles = gateway
        .get_history_candlesticks("BTC/USDT:USDT", Interval::H1, Some(start), Some(end), None)
        .await
        .expect("backfill should succeed");

    assert_eq!(candles.len(), 1200);
    assert_eq!(candles.first().unwrap().timestamp, start);
    assert_eq!(candles.last().unwrap().timestamp, end);
    for window in candles.windows(2) {
        assert!(window[0].timestamp < window[1].timestamp);
    }
}

#[tokio::test]
async fn test_history_funding_rate_pages_with_strict_cursor() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    // Range [funding 50, funding 449]: two full pages of 200, the second
    // ends exactly on start so the loop stops on the cursor bound.
    let start = funding_ts(50);
    let end = funding_ts(449);

    server
        .mock("GET", "/v5/market/funding/history")
        .match_query(Matcher::UrlEncoded("endTime".into(), (end + 1).to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(funding_body(449, 250))
        .create_async()
        .await;
    server
        .mock("GET", "/v5/market/funding/history")
        .match_query(Matcher::UrlEncoded(
            "endTime".into(),
            funding_ts(250).to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(funding_body(249, 50))
        .create_async()
        .await;

    let rates = gateway
        .get_history_funding_rate("BTC/USDT:USDT", Some(start), Some(end), None)
        .await
        .expect("backfill should succeed");

    assert_eq!(rates.len(), 400);
    assert_eq!(rates.first().unwrap().timestamp, start);
    assert_eq!(rates.last().unwrap().timestamp, end);
}

#[tokio::test]
async fn test_count_mode_returns_latest_candles() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    // No cursor on the first request; a partial page ends the loop.
    server
        .mock("GET", "/v5/market/kline")
        .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(kline_body(99, 0))
        .create_async()
        .await;

    let candles = gateway
        .get_history_candlesticks("BTC/USDT:USDT", Interval::H1, None, None, Some(30))
        .await
        .expect("backfill should succeed");

    assert_eq!(candles.len(), 30);
    assert_eq!(candles.last().unwrap().timestamp, candle_ts(99));
    assert_eq!(candles.first().unwrap().timestamp, candle_ts(70));
}

#[tokio::test]
async fn test_unknown_instrument_fails_before_any_fetch() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    let err = gateway
        .get_history_candlesticks("DOGE/USDT", Interval::H1, None, None, Some(10))
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::InstrumentNotFound(_)));
}

#[tokio::test]
async fn test_missing_mode_is_invalid_request() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    let err = gateway
        .get_history_candlesticks("BTC/USDT:USDT", Interval::H1, None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_funding_history_rejects_spot_instruments() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    let err = gateway
        .get_history_funding_rate("BTC/USDT", None, None, Some(10))
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::NotSupported(_)));
}

#[tokio::test]
async fn test_get_tickers_normalizes_and_filters() {
    let mut server = mockito::Server::new_async().await;
    let gateway = connected_gateway(&mut server).await;

    let spot_body = json!({
        "retCode": 0, "retMsg": "OK",
        "result": {"category": "spot", "list": [{
            "symbol": "BTCUSDT", "lastPrice": "17000", "prevPrice24h": "16500",
            "highPrice24h": "17100", "lowPrice24h": "16400",
            "volume24h": "1000", "turnover24h": "17000000", "price24hPcnt": "0.0303"
        }]},
        "time": 1_700_000_000_000i64
    });
    let derivative_body = |category: &str, symbol: &str| {
        json!({
            "retCode": 0, "retMsg": "OK",
            "result": {"category": category, "list": [{
                "symbol": symbol, "lastPrice": "17010", "prevPrice24h": "16510",
                "highPrice24h": "17110", "lowPrice24h": "16410",
                "volume24h": "2000", "turnover24h": "34000000", "price24hPcnt": "0.0302"
            }]},
            "time": 1_700_000_000_000i64
        })
    };

    for (category, body) in [
        ("spot", spot_body),
        ("linear", derivative_body("linear", "BTCUSDT")),
        ("inverse", derivative_body("inverse", "BTCUSD")),
    ] {
        server
            .mock("GET", "/v5/market/tickers")
            .match_query(Matcher::UrlEncoded("category".into(), category.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
    }

    let all = gateway.get_tickers(None).await.expect("tickers");
    assert_eq!(all.len(), 3);

    let perps = gateway.get_tickers(Some(MarketKind::Perp)).await.expect("tickers");
    assert_eq!(perps.len(), 2);
    assert!(perps.iter().all(|t| t.market == MarketKind::Perp));
}
