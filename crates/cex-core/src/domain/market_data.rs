//! 정규화된 시장 데이터 타입.
//!
//! 거래소별 원시 페이로드를 교차 거래소 공통 스키마로 변환한 결과 타입을
//! 정의합니다:
//! - `Candlestick` - OHLCV 캔들스틱
//! - `FundingRate` - 펀딩비 항목
//! - `Ticker` - 24시간 시세 요약
//! - `OpenInterest` - 미결제약정
//! - `OrderBookSnapshot` - 호가창 스냅샷
//! - `PricePoint` - 단일 기준 가격 (최종/지수/마크)
//!
//! 모든 타임스탬프는 epoch 밀리초로 정규화됩니다.

use crate::types::{Interval, MarketKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 타임스탬프를 가진 레코드.
///
/// 백필 엔진이 중복 제거와 정렬에 사용하는 유일한 계약입니다.
pub trait Timestamped {
    /// epoch 밀리초 타임스탬프를 반환합니다.
    fn timestamp(&self) -> i64;
}

/// epoch 밀리초를 UTC datetime으로 변환합니다.
pub fn millis_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts)
}

/// OHLCV 캔들스틱.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candlestick {
    /// 정규 상품 식별자 (예: "BTC/USDT", "BTC/USDT:USDT")
    pub instrument_id: String,
    /// 캔들 시작 시간 (epoch 밀리초)
    pub timestamp: i64,
    /// 간격
    pub interval: Interval,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (기준 자산 단위)
    pub base_volume: Decimal,
    /// 거래대금 (호가 자산 단위)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<Decimal>,
}

impl Candlestick {
    /// 캔들 시작 시간을 UTC datetime으로 반환합니다.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.timestamp)
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

impl Timestamped for Candlestick {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 펀딩비 항목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    /// 정규 상품 식별자
    pub instrument_id: String,
    /// 펀딩 시각 (epoch 밀리초)
    pub timestamp: i64,
    /// 펀딩비
    pub funding_rate: Decimal,
}

impl Timestamped for FundingRate {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 24시간 시세 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// 정규 상품 식별자
    pub instrument_id: String,
    /// 시장 유형
    pub market: MarketKind,
    /// 조회 시각 (epoch 밀리초)
    pub timestamp: i64,
    /// 최근 체결가
    pub last_price: Decimal,
    /// 24시간 최고가
    pub high_24h: Decimal,
    /// 24시간 최저가
    pub low_24h: Decimal,
    /// 24시간 거래량 (기준 자산 단위)
    pub base_volume: Decimal,
    /// 24시간 거래대금 (호가 자산 단위)
    pub quote_volume: Decimal,
    /// 24시간 가격 변동
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change: Option<Decimal>,
    /// 24시간 변동률(%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_percent: Option<Decimal>,
}

impl Timestamped for Ticker {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 미결제약정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenInterest {
    /// 정규 상품 식별자
    pub instrument_id: String,
    /// 측정 시각 (epoch 밀리초)
    pub timestamp: i64,
    /// 미결제약정 (계약 또는 기준 자산 단위, 거래소 정의)
    pub open_interest: Decimal,
}

impl Timestamped for OpenInterest {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 호가창 가격 레벨.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    /// 가격
    pub price: Decimal,
    /// 수량
    pub quantity: Decimal,
}

/// 호가창 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// 정규 상품 식별자
    pub instrument_id: String,
    /// 스냅샷 시각 (epoch 밀리초)
    pub timestamp: i64,
    /// 매수 호가 - 가격 내림차순 정렬
    pub bids: Vec<BookLevel>,
    /// 매도 호가 - 가격 오름차순 정렬
    pub asks: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    /// 최우선 매수 호가를 반환합니다.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// 최우선 매도 호가를 반환합니다.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// 스프레드를 반환합니다.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// 중간 가격을 반환합니다.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }
}

impl Timestamped for OrderBookSnapshot {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// 단일 기준 가격 (최종가/지수가/마크가).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// 정규 상품 식별자
    pub instrument_id: String,
    /// 조회 시각 (epoch 밀리초)
    pub timestamp: i64,
    /// 가격
    pub price: Decimal,
}

impl Timestamped for PricePoint {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
