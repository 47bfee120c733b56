//! WOO X 게이트웨이.
//!
//! WOO는 실시간 캔들 엔드포인트와 별도의 과거 데이터 호스트를 둡니다.
//! 히스토리 조회는 과거 데이터 호스트의 `end_time` 커서를 사용합니다.

use async_trait::async_trait;
use tracing::info;

use cex_core::{Candlestick, Interval};

use crate::backfill::{backfill, BackfillRequest, CursorStep};
use crate::connector::woo::{WooClient, WooConfig};
use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange_info::{ExchangeInfo, InstrumentMeta};
use crate::parser;
use crate::traits::MarketDataSource;

/// 과거 캔들 엔드포인트 페이지 최대 크기.
const HIST_KLINE_LIMIT: usize = 1000;

/// WOO X 시장 데이터 게이트웨이.
pub struct Woo {
    client: WooClient,
    exchange_info: ExchangeInfo,
}

impl Woo {
    /// 새 게이트웨이 생성. 거래소 정보는 비어 있으며
    /// `sync_exchange_info`로 채워야 합니다.
    pub fn new(config: WooConfig) -> ExchangeResult<Self> {
        Ok(Self {
            client: WooClient::new(config)?,
            exchange_info: ExchangeInfo::default(),
        })
    }

    /// 생성과 거래소 정보 동기화를 한 번에 수행합니다.
    pub async fn connect(config: WooConfig) -> ExchangeResult<Self> {
        let mut gateway = Self::new(config)?;
        gateway.sync_exchange_info().await?;
        Ok(gateway)
    }

    fn meta(&self, instrument_id: &str) -> ExchangeResult<&InstrumentMeta> {
        self.exchange_info.get(instrument_id)
    }

    fn kline_type(interval: Interval) -> ExchangeResult<&'static str> {
        interval
            .to_woo_type()
            .ok_or_else(|| ExchangeError::NotSupported(format!("WOO kline interval {}", interval)))
    }

    /// 최신 캔들 페이지를 조회합니다 (최신순, 최대 `limit`개).
    pub async fn get_klines(
        &self,
        instrument_id: &str,
        interval: Interval,
        limit: usize,
    ) -> ExchangeResult<Vec<Candlestick>> {
        let meta = self.meta(instrument_id)?;
        let kline_type = Self::kline_type(interval)?;
        let rows = self
            .client
            .get_klines(&meta.exchange_symbol, kline_type, limit)
            .await?;
        parser::woo::parse_candlesticks(&rows, instrument_id, interval)
    }
}

#[async_trait]
impl MarketDataSource for Woo {
    fn name(&self) -> &'static str {
        "woo"
    }

    fn exchange_info(&self) -> &ExchangeInfo {
        &self.exchange_info
    }

    async fn sync_exchange_info(&mut self) -> ExchangeResult<()> {
        let rows = self.client.get_available_symbols().await?;
        let instruments = parser::woo::parse_exchange_info(&rows)?;
        info!(instruments = instruments.len(), "WOO exchange info synced");
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
        let kline_type = Self::kline_type(interval)?;
        let request = BackfillRequest::from_parts(start, end, num)?;

        info!(instrument_id, %interval, ?request, "Fetching WOO candlestick history");

        let symbol = meta.exchange_symbol.clone();
        let owned_id = instrument_id.to_string();
        let client = &self.client;

        let fetch = move |cursor: Option<i64>| {
            let symbol = symbol.clone();
            let instrument_id = owned_id.clone();
            async move {
                let rows = client.get_hist_klines(&symbol, kline_type, cursor).await?;
                parser::woo::parse_candlesticks(&rows, &instrument_id, interval)
            }
        };

        backfill(fetch, HIST_KLINE_LIMIT, CursorStep::MinTimestamp, request).await
    }
}
