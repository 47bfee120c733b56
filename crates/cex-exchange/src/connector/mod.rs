//! 거래소별 REST 커넥터.
//!
//! 각 커넥터는 공개(비서명) 시장 데이터 엔드포인트에 대한 얇은 HTTP
//! 클라이언트입니다. 응답 봉투 해석과 에러 매핑까지만 담당하고,
//! 정규화는 parser 모듈이 수행합니다.

pub mod bybit;
pub mod kucoin;
pub mod woo;

pub use bybit::{BybitClient, BybitConfig};
pub use kucoin::{KucoinClient, KucoinConfig};
pub use woo::{WooClient, WooConfig};
