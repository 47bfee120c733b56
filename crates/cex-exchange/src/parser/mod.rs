//! 거래소별 페이로드 정규화 파서.
//!
//! 원시 페이로드와 상품 메타데이터를 받아 교차 거래소 공통 스키마
//! 레코드로 변환합니다. 숫자 필드는 `Decimal`로 파싱하며, 형식이
//! 어긋난 페이로드는 `ExchangeError::Parse`로 실패합니다.

pub mod bybit;
pub mod kucoin;
pub mod woo;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{ExchangeError, ExchangeResult};

/// 문자열을 Decimal로 파싱합니다.
pub(crate) fn parse_decimal(s: &str, field: &str) -> ExchangeResult<Decimal> {
    s.parse()
        .map_err(|_| ExchangeError::Parse(format!("invalid decimal in {}: {:?}", field, s)))
}

/// 문자열 타임스탬프(밀리초)를 파싱합니다.
pub(crate) fn parse_millis(s: &str, field: &str) -> ExchangeResult<i64> {
    s.parse()
        .map_err(|_| ExchangeError::Parse(format!("invalid timestamp in {}: {:?}", field, s)))
}

/// f64를 Decimal로 변환합니다.
pub(crate) fn decimal_from_f64(v: f64, field: &str) -> ExchangeResult<Decimal> {
    Decimal::from_f64(v)
        .ok_or_else(|| ExchangeError::Parse(format!("invalid decimal in {}: {}", field, v)))
}

/// 원시 JSON 객체에서 문자열 필드를 꺼냅니다.
pub(crate) fn str_field<'a>(value: &'a Value, field: &str) -> ExchangeResult<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ExchangeError::Parse(format!("missing field {}", field)))
}

/// 원시 JSON 객체에서 Decimal 필드를 꺼냅니다 (문자열 표현).
pub(crate) fn dec_field(value: &Value, field: &str) -> ExchangeResult<Decimal> {
    parse_decimal(str_field(value, field)?, field)
}

/// 원시 JSON 객체에서 선택적 Decimal 필드를 꺼냅니다.
///
/// 필드가 없거나 빈 문자열이면 `None`을 반환합니다.
pub(crate) fn opt_dec_field(value: &Value, field: &str) -> ExchangeResult<Option<Decimal>> {
    match value.get(field).and_then(Value::as_str) {
        None | Some("") => Ok(None),
        Some(s) => parse_decimal(s, field).map(Some),
    }
}
