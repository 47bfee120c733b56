//! # CEX Core
//!
//! 거래소 어댑터 전반에서 사용되는 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 교차 거래소 정규화 스키마의 기본 타입을 제공합니다:
//! - 정규화된 시장 데이터 구조체 (캔들, 펀딩비, 시세, 미결제약정, 호가창)
//! - 캔들 간격 및 시장 유형 정의
//! - 로깅 인프라

pub mod domain;
pub mod logging;
pub mod types;

pub use domain::*;
pub use logging::*;
pub use types::*;
