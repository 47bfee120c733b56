//! Bybit 게이트웨이.
//!
//! 현물(spot)과 파생(linear/inverse) 카테고리를 하나의 정규 식별자
//! 공간으로 합쳐 제공합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use cex_core::{
    Candlestick, FundingRate, Interval, MarketKind, OpenInterest, OrderBookSnapshot, PricePoint,
    Ticker,
};

use crate::backfill::{backfill, BackfillRequest, CursorStep};
use crate::connector::bybit::{BybitClient, BybitConfig};
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange_info::{ExchangeInfo, InstrumentMeta};
use crate::parser;
use crate::traits::MarketDataSource;

/// 캔들 엔드포인트 페이지 최대 크기.
const KLINE_LIMIT: usize = 1000;
/// 펀딩비 엔드포인트 페이지 최대 크기.
const FUNDING_LIMIT: usize = 200;
/// 동기화 대상 카테고리.
const CATEGORIES: [&str; 3] = ["spot", "linear", "inverse"];

/// 카테고리별 호가창 최대 깊이.
fn orderbook_depth_cap(category: &str) -> usize {
    match category {
        "spot" => 200,
        _ => 500,
    }
}

/// Bybit 시장 데이터 게이트웨이.
pub struct Bybit {
    client: BybitClient,
    exchange_info: ExchangeInfo,
}

impl Bybit {
    /// 새 게이트웨이 생성. 거래소 정보는 비어 있으며
    /// `sync_exchange_info`로 채워야 합니다.
    pub fn new(config: BybitConfig) -> ExchangeResult<Self> {
        Ok(Self {
            client: BybitClient::new(config)?,
            exchange_info: ExchangeInfo::default(),
        })
    }

    /// 생성과 거래소 정보 동기화를 한 번에 수행합니다.
    pub async fn connect(config: BybitConfig) -> ExchangeResult<Self> {
        let mut gateway = Self::new(config)?;
        gateway.sync_exchange_info().await?;
        Ok(gateway)
    }

    fn meta(&self, instrument_id: &str) -> ExchangeResult<&InstrumentMeta> {
        self.exchange_info.get(instrument_id)
    }

    fn derivative_meta(&self, instrument_id: &str) -> ExchangeResult<&InstrumentMeta> {
        let meta = self.meta(instrument_id)?;
        if !meta.market.is_derivative() {
            return Err(ExchangeError::NotSupported(format!(
                "{} is a {} instrument",
                instrument_id, meta.market
            )));
        }
        Ok(meta)
    }

    /// 전체 카테고리 시세를 조회합니다. `market`이 주어지면 해당 시장
    /// 유형만 남깁니다.
    pub async fn get_tickers(&self, market: Option<MarketKind>) -> ExchangeResult<Vec<Ticker>> {
        let mut results = Vec::new();
        for category in CATEGORIES {
            let raw = self.client.get_tickers(category, None).await?;
            results.extend(parser::bybit::parse_tickers(&raw, &self.exchange_info)?);
        }
        if let Some(market) = market {
            results.retain(|ticker| ticker.market == market);
        }
        Ok(results)
    }

    /// 진행 중인 최신 캔들 하나를 조회합니다.
    pub async fn get_current_candlestick(
        &self,
        instrument_id: &str,
        interval: Interval,
    ) -> ExchangeResult<Option<Candlestick>> {
        let meta = self.meta(instrument_id)?;
        let raw = self
            .client
            .get_klines(
                &meta.category,
                &meta.exchange_symbol,
                interval.to_bybit_interval(),
                1,
                None,
            )
            .await?;
        Ok(parser::bybit::parse_candlesticks(&raw, instrument_id, interval)?
            .into_iter()
            .next())
    }

    /// 현재 펀딩비를 조회합니다 (파생 상품 전용).
    pub async fn get_current_funding_rate(
        &self,
        instrument_id: &str,
    ) -> ExchangeResult<FundingRate> {
        let meta = self.derivative_meta(instrument_id)?;
        let raw = self
            .client
            .get_tickers(&meta.category, Some(&meta.exchange_symbol))
            .await?;
        parser::bybit::parse_current_funding_rate(&raw, instrument_id)
    }

    /// 최신 미결제약정을 조회합니다 (파생 상품 전용).
    pub async fn get_open_interest(
        &self,
        instrument_id: &str,
        interval: Interval,
    ) -> ExchangeResult<OpenInterest> {
        let meta = self.derivative_meta(instrument_id)?;
        let interval_time = interval.to_bybit_oi_interval().ok_or_else(|| {
            ExchangeError::NotSupported(format!("open interest interval {}", interval))
        })?;
        let raw = self
            .client
            .get_open_interest(&meta.category, &meta.exchange_symbol, interval_time, 1)
            .await?;
        parser::bybit::parse_open_interest(&raw, instrument_id)
    }

    /// 호가창을 조회합니다. 깊이는 카테고리별 상한으로 잘립니다.
    pub async fn get_orderbook(
        &self,
        instrument_id: &str,
        depth: usize,
    ) -> ExchangeResult<OrderBookSnapshot> {
        let meta = self.meta(instrument_id)?;
        let depth = depth.min(orderbook_depth_cap(&meta.category));
        let raw = self
            .client
            .get_orderbook(&meta.category, &meta.exchange_symbol, depth)
            .await?;
        parser::bybit::parse_orderbook(&raw, instrument_id)
    }

    /// 최종 체결가를 조회합니다.
    pub async fn get_last_price(&self, instrument_id: &str) -> ExchangeResult<PricePoint> {
        self.price_point(instrument_id, "lastPrice", false).await
    }

    /// 지수 가격을 조회합니다 (파생 상품 전용).
    pub async fn get_index_price(&self, instrument_id: &str) -> ExchangeResult<PricePoint> {
        self.price_point(instrument_id, "indexPrice", true).await
    }

    /// 마크 가격을 조회합니다 (파생 상품 전용).
    pub async fn get_mark_price(&self, instrument_id: &str) -> ExchangeResult<PricePoint> {
        self.price_point(instrument_id, "markPrice", true).await
    }

    async fn price_point(
        &self,
        instrument_id: &str,
        field: &str,
        derivative_only: bool,
    ) -> ExchangeResult<PricePoint> {
        let meta = if derivative_only {
            self.derivative_meta(instrument_id)?
        } else {
            self.meta(instrument_id)?
        };
        let raw = self
            .client
            .get_tickers(&meta.category, Some(&meta.exchange_symbol))
            .await?;
        parser::bybit::parse_price_point(&raw, instrument_id, field)
    }
}

#[async_trait]
impl MarketDataSource for Bybit {
    fn name(&self) -> &'static str {
        "bybit"
    }

    fn exchange_info(&self) -> &ExchangeInfo {
        &self.exchange_info
    }

    async fn sync_exchange_info(&mut self) -> ExchangeResult<()> {
        let mut instruments = HashMap::new();
        for category in CATEGORIES {
            let raw = self.client.get_instruments_info(category).await?;
            instruments.extend(parser::bybit::parse_exchange_info(category, &raw.list)?);
        }
        info!(instruments = instruments.len(), "Bybit exchange info synced");
        self.exchange_info = ExchangeInfo::from_map(instruments);
        Ok(())
    }

    async fn get_history_candlesticks(
        &self,
        instrument_id: &str,
        interval: Interval,
        start: Option<i64>,
        end: Option<i64>,
        num: Option<usize>,
    ) -> ExchangeResult<Vec<Candlestick>> {
        let meta = self.meta(instrument_id)?;
        let request = BackfillRequest::from_parts(start, end, num)?;

        info!(instrument_id, %interval, ?request, "Fetching Bybit candlestick history");

        let symbol = meta.exchange_symbol.clone();
        let category = meta.category.clone();
        let interval_code = interval.to_bybit_interval();
        let owned_id = instrument_id.to_string();
        let client = &self.client;

        let fetch = move |cursor: Option<i64>| {
            let symbol = symbol.clone();
            let category = category.clone();
            let instrument_id = owned_id.clone();
            async move {
                let page = client
                    .get_klines(&category, &symbol, interval_code, KLINE_LIMIT, cursor)
                    .await?;
                parser::bybit::parse_candlesticks(&page, &instrument_id, interval)
            }
        };

        // kline의 end 파라미터는 경계를 포함하므로 min+1 전진 규칙을 쓴다
        backfill(fetch, KLINE_LIMIT, CursorStep::MinPlusOne, request).await
    }

    async fn get_history_funding_rate(
        &self,
        instrument_id: &str,
        start: Option<i64>,
        end: Option<i64>,
        num: Option<usize>,
    ) -> ExchangeResult<Vec<FundingRate>> {
        let meta = self.derivative_meta(instrument_id)?;
        let request = BackfillRequest::from_parts(start, end, num)?;

        info!(instrument_id, ?request, "Fetching Bybit funding rate history");

        let symbol = meta.exchange_symbol.clone();
        let category = meta.category.clone();
        let owned_id = instrument_id.to_string();
        let client = &self.client;

        let fetch = move |cursor: Option<i64>| {
            let symbol = symbol.clone();
            let category = category.clone();
            let instrument_id = owned_id.clone();
            async move {
                let page = client
                    .get_funding_history(&category, &symbol, FUNDING_LIMIT, cursor)
                    .await?;
                parser::bybit::parse_funding_history(&page, &instrument_id)
            }
        };

        // funding/history의 endTime은 strictly-less-than으로 동작한다
        backfill(fetch, FUNDING_LIMIT, CursorStep::MinTimestamp, request).await
    }

    async fn get_ticker(&self, instrument_id: &str) -> ExchangeResult<Ticker> {
        let meta = self.meta(instrument_id)?;
        let raw = self
            .client
            .get_tickers(&meta.category, Some(&meta.exchange_symbol))
            .await?;
        parser::bybit::parse_raw_ticker(&raw, instrument_id, meta.market)
    }
}
