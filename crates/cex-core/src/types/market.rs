//! 시장 유형 정의.
//!
//! 거래소별 카테고리 문자열(spot/linear/inverse/futures 등)과 별개로,
//! 교차 거래소 필터링에 사용하는 공통 시장 분류입니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 시장 유형 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    /// 현물 시장
    Spot,
    /// 마진 시장
    Margin,
    /// 무기한 선물 (perpetual)
    Perp,
    /// 만기 선물
    Futures,
}

impl MarketKind {
    /// 파생상품 시장인지 확인합니다.
    pub fn is_derivative(&self) -> bool {
        matches!(self, MarketKind::Perp | MarketKind::Futures)
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketKind::Spot => write!(f, "spot"),
            MarketKind::Margin => write!(f, "margin"),
            MarketKind::Perp => write!(f, "perp"),
            MarketKind::Futures => write!(f, "futures"),
        }
    }
}

impl FromStr for MarketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(MarketKind::Spot),
            "margin" => Ok(MarketKind::Margin),
            "perp" | "perpetual" | "swap" => Ok(MarketKind::Perp),
            "futures" | "future" => Ok(MarketKind::Futures),
            _ => Err(format!("Unknown market kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_kind_parsing() {
        assert_eq!("spot".parse::<MarketKind>().unwrap(), MarketKind::Spot);
        assert_eq!("PERP".parse::<MarketKind>().unwrap(), MarketKind::Perp);
        assert_eq!("swap".parse::<MarketKind>().unwrap(), MarketKind::Perp);
        assert!("stock".parse::<MarketKind>().is_err());
    }

    #[test]
    fn test_is_derivative() {
        assert!(MarketKind::Perp.is_derivative());
        assert!(MarketKind::Futures.is_derivative());
        assert!(!MarketKind::Spot.is_derivative());
    }
}
