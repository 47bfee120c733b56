//! 통합 시장 데이터 인터페이스.

use async_trait::async_trait;

use cex_core::{Candlestick, FundingRate, Interval, Ticker};

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange_info::ExchangeInfo;

/// 거래소 중립적 시장 데이터 소스.
///
/// 모든 게이트웨이가 구현하는 호출자 인터페이스입니다. 히스토리 조회는
/// `start`/`end`(epoch 밀리초, 양끝 포함) 범위 또는 최신 `num`개 중 한
/// 모드를 요구하며, 어느 쪽도 완성되지 않으면 `InvalidRequest`로
/// 실패합니다. 거래소가 제공하지 않는 작업은 `NotSupported`를 반환합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 거래소 이름 반환.
    fn name(&self) -> &'static str;

    /// 동기화된 거래소 정보 반환.
    fn exchange_info(&self) -> &ExchangeInfo;

    /// 거래소 정보를 조회하여 동결합니다. 다른 작업보다 먼저 호출해야
    /// 합니다.
    async fn sync_exchange_info(&mut self) -> ExchangeResult<()>;

    /// 과거 캔들스틱 조회.
    async fn get_history_candlesticks(
        &self,
        instrument_id: &str,
        interval: Interval,
        start: Option<i64>,
        end: Option<i64>,
        num: Option<usize>,
    ) -> ExchangeResult<Vec<Candlestick>>;

    /// 과거 펀딩비 조회.
    async fn get_history_funding_rate(
        &self,
        _instrument_id: &str,
        _start: Option<i64>,
        _end: Option<i64>,
        _num: Option<usize>,
    ) -> ExchangeResult<Vec<FundingRate>> {
        Err(ExchangeError::NotSupported(format!(
            "funding rate history on {}",
            self.name()
        )))
    }

    /// 단일 상품 시세 조회.
    async fn get_ticker(&self, _instrument_id: &str) -> ExchangeResult<Ticker> {
        Err(ExchangeError::NotSupported(format!(
            "ticker on {}",
            self.name()
        )))
    }
}
