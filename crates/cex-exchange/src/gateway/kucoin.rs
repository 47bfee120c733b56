//! Kucoin 게이트웨이.
//!
//! 현물과 선물 계약을 하나의 정규 식별자 공간으로 합쳐 제공합니다.
//! 캔들 히스토리는 현물, 펀딩비 히스토리는 선물 전용입니다.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use cex_core::{Candlestick, FundingRate, Interval, MarketKind, Ticker};

use crate::backfill::{backfill, BackfillRequest, CursorStep};
use crate::connector::kucoin::{KucoinClient, KucoinConfig};
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange_info::{ExchangeInfo, InstrumentMeta};
use crate::parser;
use crate::traits::MarketDataSource;

/// 현물 캔들 엔드포인트 페이지 최대 크기.
const CANDLE_LIMIT: usize = 1500;
/// 펀딩비 엔드포인트 페이지 최대 크기.
const FUNDING_LIMIT: usize = 100;

/// Kucoin 시장 데이터 게이트웨이.
pub struct Kucoin {
    client: KucoinClient,
    exchange_info: ExchangeInfo,
}

impl Kucoin {
    /// 새 게이트웨이 생성. 거래소 정보는 비어 있으며
    /// `sync_exchange_info`로 채워야 합니다.
    pub fn new(config: KucoinConfig) -> ExchangeResult<Self> {
        Ok(Self {
            client: KucoinClient::new(config)?,
            exchange_info: ExchangeInfo::default(),
        })
    }

    /// 생성과 거래소 정보 동기화를 한 번에 수행합니다.
    pub async fn connect(config: KucoinConfig) -> ExchangeResult<Self> {
        let mut gateway = Self::new(config)?;
        gateway.sync_exchange_info().await?;
        Ok(gateway)
    }

    fn meta(&self, instrument_id: &str) -> ExchangeResult<&InstrumentMeta> {
        self.exchange_info.get(instrument_id)
    }

    /// 현물 전체 시세를 조회합니다. `market`이 주어지면 해당 시장
    /// 유형만 남깁니다 (현물 시세만 제공되므로 파생 필터는 빈 결과).
    pub async fn get_tickers(&self, market: Option<MarketKind>) -> ExchangeResult<Vec<Ticker>> {
        let raw = self.client.get_spot_tickers().await?;
        let mut results = parser::kucoin::parse_spot_tickers(&raw, &self.exchange_info)?;
        if let Some(market) = market {
            results.retain(|ticker| ticker.market == market);
        }
        Ok(results)
    }
}

#[async_trait]
impl MarketDataSource for Kucoin {
    fn name(&self) -> &'static str {
        "kucoin"
    }

    fn exchange_info(&self) -> &ExchangeInfo {
        &self.exchange_info
    }

    async fn sync_exchange_info(&mut self) -> ExchangeResult<()> {
        let mut instruments = HashMap::new();

        let spot = self.client.get_spot_symbols().await?;
        instruments.extend(parser::kucoin::parse_spot_exchange_info(&spot)?);

        let futures = self.client.get_futures_contracts().await?;
        instruments.extend(parser::kucoin::parse_futures_exchange_info(&futures)?);

        info!(instruments = instruments.len(), "Kucoin exchange info synced");
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
        if meta.market != MarketKind::Spot {
            return Err(ExchangeError::NotSupported(format!(
                "candlestick history for Kucoin {} instruments",
                meta.market
            )));
        }
        let candle_type = interval.to_kucoin_type().ok_or_else(|| {
            ExchangeError::NotSupported(format!("Kucoin candle interval {}", interval))
        })?;
        let request = BackfillRequest::from_parts(start, end, num)?;

        info!(instrument_id, %interval, ?request, "Fetching Kucoin candlestick history");

        let symbol = meta.exchange_symbol.clone();
        let owned_id = instrument_id.to_string();
        let client = &self.client;

        let fetch = move |cursor: Option<i64>| {
            let symbol = symbol.clone();
            let instrument_id = owned_id.clone();
            async move {
                // 커서는 밀리초, endAt은 초 단위라 경계를 위로 올림해서
                // 경계 캔들이 탈락하지 않게 한다 (endAt은 미포함)
                let end_at = cursor.map(|c| (c + 999) / 1000);
                let rows = client
                    .get_spot_candles(&symbol, candle_type, None, end_at)
                    .await?;
                parser::kucoin::parse_candlesticks(&rows, &instrument_id, interval)
            }
        };

        backfill(fetch, CANDLE_LIMIT, CursorStep::MinTimestamp, request).await
    }

    async fn get_history_funding_rate(
        &self,
        instrument_id: &str,
        start: Option<i64>,
        end: Option<i64>,
        num: Option<usize>,
    ) -> ExchangeResult<Vec<FundingRate>> {
        let meta = self.meta(instrument_id)?;
        if !meta.market.is_derivative() {
            return Err(ExchangeError::NotSupported(format!(
                "{} is a {} instrument",
                instrument_id, meta.market
            )));
        }
        let request = BackfillRequest::from_parts(start, end, num)?;

        info!(instrument_id, ?request, "Fetching Kucoin funding rate history");

        let symbol = meta.exchange_symbol.clone();
        let owned_id = instrument_id.to_string();
        let client = &self.client;

        let fetch = move |cursor: Option<i64>| {
            let symbol = symbol.clone();
            let instrument_id = owned_id.clone();
            async move {
                let entries = client.get_funding_rates(&symbol, None, cursor).await?;
                parser::kucoin::parse_funding_history(&entries, &instrument_id)
            }
        };

        backfill(fetch, FUNDING_LIMIT, CursorStep::MinTimestamp, request).await
    }

    async fn get_ticker(&self, instrument_id: &str) -> ExchangeResult<Ticker> {
        let meta = self.meta(instrument_id)?;
        if meta.market != MarketKind::Spot {
            return Err(ExchangeError::NotSupported(format!(
                "ticker for Kucoin {} instruments",
                meta.market
            )));
        }
        let raw = self.client.get_spot_tickers().await?;
        parser::kucoin::parse_spot_tickers(&raw, &self.exchange_info)?
            .into_iter()
            .find(|ticker| ticker.instrument_id == instrument_id)
            .ok_or_else(|| ExchangeError::InstrumentNotFound(instrument_id.to_string()))
    }
}
