//! 캔들스틱 데이터를 위한 간격 정의.
//!
//! 이 모듈은 교차 거래소 공통 캔들 간격과 거래소별 간격 코드 변환을 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 캔들스틱 간격.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// 1분봉
    M1,
    /// 3분봉
    M3,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 2시간봉
    H2,
    /// 4시간봉
    H4,
    /// 6시간봉
    H6,
    /// 8시간봉
    H8,
    /// 12시간봉
    H12,
    /// 일봉
    D1,
    /// 주봉
    W1,
    /// 월봉
    MN1,
}

impl Interval {
    /// 이 간격의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    /// 이 간격의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        match self {
            Interval::M1 => 60,
            Interval::M3 => 3 * 60,
            Interval::M5 => 5 * 60,
            Interval::M15 => 15 * 60,
            Interval::M30 => 30 * 60,
            Interval::H1 => 60 * 60,
            Interval::H2 => 2 * 60 * 60,
            Interval::H4 => 4 * 60 * 60,
            Interval::H6 => 6 * 60 * 60,
            Interval::H8 => 8 * 60 * 60,
            Interval::H12 => 12 * 60 * 60,
            Interval::D1 => 24 * 60 * 60,
            Interval::W1 => 7 * 24 * 60 * 60,
            Interval::MN1 => 30 * 24 * 60 * 60, // 근사값
        }
    }

    /// 이 간격의 밀리초 단위 값을 반환합니다.
    pub fn as_millis(&self) -> i64 {
        self.as_secs() as i64 * 1000
    }

    /// 표준 간격 문자열로 변환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H8 => "8h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
            Interval::MN1 => "1M",
        }
    }

    /// 표준 간격 문자열에서 파싱합니다.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Interval::M1),
            "3m" => Some(Interval::M3),
            "5m" => Some(Interval::M5),
            "15m" => Some(Interval::M15),
            "30m" => Some(Interval::M30),
            "1h" => Some(Interval::H1),
            "2h" => Some(Interval::H2),
            "4h" => Some(Interval::H4),
            "6h" => Some(Interval::H6),
            "8h" => Some(Interval::H8),
            "12h" => Some(Interval::H12),
            "1d" => Some(Interval::D1),
            "1w" => Some(Interval::W1),
            "1M" => Some(Interval::MN1),
            _ => None,
        }
    }

    /// Bybit v5 kline 간격 코드로 변환합니다.
    pub fn to_bybit_interval(&self) -> &'static str {
        match self {
            Interval::M1 => "1",
            Interval::M3 => "3",
            Interval::M5 => "5",
            Interval::M15 => "15",
            Interval::M30 => "30",
            Interval::H1 => "60",
            Interval::H2 => "120",
            Interval::H4 => "240",
            Interval::H6 => "360",
            Interval::H8 => "480",
            Interval::H12 => "720",
            Interval::D1 => "D",
            Interval::W1 => "W",
            Interval::MN1 => "M",
        }
    }

    /// Bybit open-interest intervalTime 코드로 변환합니다.
    ///
    /// 미결제약정 엔드포인트는 일부 간격만 지원합니다.
    pub fn to_bybit_oi_interval(&self) -> Option<&'static str> {
        match self {
            Interval::M5 => Some("5min"),
            Interval::M15 => Some("15min"),
            Interval::M30 => Some("30min"),
            Interval::H1 => Some("1h"),
            Interval::H4 => Some("4h"),
            Interval::D1 => Some("1d"),
            _ => None,
        }
    }

    /// Kucoin 현물 캔들 type 코드로 변환합니다.
    pub fn to_kucoin_type(&self) -> Option<&'static str> {
        match self {
            Interval::M1 => Some("1min"),
            Interval::M3 => Some("3min"),
            Interval::M5 => Some("5min"),
            Interval::M15 => Some("15min"),
            Interval::M30 => Some("30min"),
            Interval::H1 => Some("1hour"),
            Interval::H2 => Some("2hour"),
            Interval::H4 => Some("4hour"),
            Interval::H6 => Some("6hour"),
            Interval::H8 => Some("8hour"),
            Interval::H12 => Some("12hour"),
            Interval::D1 => Some("1day"),
            Interval::W1 => Some("1week"),
            Interval::MN1 => Some("1month"),
        }
    }

    /// WOO X kline type 코드로 변환합니다.
    ///
    /// WOO는 일부 간격만 제공합니다.
    pub fn to_woo_type(&self) -> Option<&'static str> {
        match self {
            Interval::M1 => Some("1m"),
            Interval::M5 => Some("5m"),
            Interval::M15 => Some("15m"),
            Interval::M30 => Some("30m"),
            Interval::H1 => Some("1h"),
            Interval::H4 => Some("4h"),
            Interval::H12 => Some("12h"),
            Interval::D1 => Some("1d"),
            Interval::W1 => Some("1w"),
            Interval::MN1 => Some("1mon"),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid interval: {}", s))
    }
}
