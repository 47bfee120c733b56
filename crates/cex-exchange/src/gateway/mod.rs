//! 거래소별 게이트웨이.
//!
//! 게이트웨이는 정규 상품 식별자를 거래소 네이티브 심볼/카테고리로
//! 해석하고, 커넥터와 파서를 엮어 백필 엔진에 페이지 조회 클로저를
//! 공급하는 얇은 파사드입니다.

pub mod bybit;
pub mod kucoin;
pub mod woo;

pub use bybit::Bybit;
pub use kucoin::Kucoin;
pub use woo::Woo;
