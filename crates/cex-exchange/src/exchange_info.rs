//! 거래소 정보(exchange info) 레지스트리.
//!
//! 거래소 동기화 단계가 한 번 채우고, 이후에는 읽기 전용으로 쓰이는
//! 상품 메타데이터 맵입니다. 동기화 이후 동시 읽기에 별도 동기화가
//! 필요 없도록 생성-후-동결 패턴을 따릅니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use cex_core::MarketKind;

use crate::error::{ExchangeError, ExchangeResult};

/// 상품별 정적 메타데이터.
///
/// 정규 상품 식별자에서 거래소 네이티브 심볼/카테고리로의 변환에
/// 필요한 전부이며, 동기화 이후 불변입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentMeta {
    /// 거래소 네이티브 심볼 (예: "BTCUSDT", "XBTUSDTM", "PERP_BTC_USDT")
    pub exchange_symbol: String,
    /// 거래소 네이티브 카테고리 (예: "spot", "linear", "inverse", "futures")
    pub category: String,
    /// 교차 거래소 시장 분류
    pub market: MarketKind,
    /// 거래소가 반환한 원시 상품 페이로드
    pub raw_data: serde_json::Value,
}

/// 정규 상품 식별자로 키가 부여된 동결 레지스트리.
#[derive(Debug, Clone, Default)]
pub struct ExchangeInfo {
    instruments: HashMap<String, InstrumentMeta>,
}

impl ExchangeInfo {
    /// 파싱된 상품 맵에서 레지스트리를 생성합니다.
    pub fn from_map(instruments: HashMap<String, InstrumentMeta>) -> Self {
        Self { instruments }
    }

    /// 아직 동기화되지 않았는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// 등록된 상품 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// 상품 메타데이터를 조회합니다.
    ///
    /// # Errors
    /// 식별자가 없으면 `ExchangeError::InstrumentNotFound`를 반환합니다.
    pub fn get(&self, instrument_id: &str) -> ExchangeResult<&InstrumentMeta> {
        self.instruments
            .get(instrument_id)
            .ok_or_else(|| ExchangeError::InstrumentNotFound(instrument_id.to_string()))
    }

    /// 시장 분류로 상품 식별자를 필터링합니다.
    pub fn ids_by_market(&self, market: MarketKind) -> Vec<&str> {
        self.instruments
            .iter()
            .filter(|(_, meta)| meta.market == market)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// 거래소 네이티브 심볼에서 정규 식별자를 역조회합니다.
    ///
    /// 시세 일괄 조회처럼 거래소가 네이티브 심볼만 돌려주는 응답을
    /// 정규화할 때 사용합니다.
    pub fn id_by_exchange_symbol(&self, category: &str, symbol: &str) -> Option<&str> {
        self.instruments
            .iter()
            .find(|(_, meta)| meta.category == category && meta.exchange_symbol == symbol)
            .map(|(id, _)| id.as_str())
    }
}
