//! 거래소 접근 계층 에러 타입.

use thiserror::Error;

/// 시장 데이터 접근 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 잘못된 요청 (범위/개수 미지정, start > end 등)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 거래소 정보에 없는 상품
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 거래소 API 에러 코드
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 지원되지 않는 작업
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// 알 수 없는 에러
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// 시장 데이터 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    ///
    /// 엔진은 재시도하지 않으며, 상위 호출자의 판단 재료로만 쓰입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_) | ExchangeError::Timeout(_) | ExchangeError::RateLimited
        )
    }

    /// 호출자 입력이 원인인 에러인지 확인.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ExchangeError::InvalidRequest(_) | ExchangeError::InstrumentNotFound(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExchangeError::Network(err.to_string())
        } else if err.is_decode() {
            ExchangeError::Parse(err.to_string())
        } else {
            ExchangeError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}
