//! Bybit v5 시장 데이터 커넥터.
//!
//! 공개 REST 엔드포인트 구현. 메인넷과 테스트넷 모두 지원.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{ExchangeError, ExchangeResult};

// ============================================================================
// 설정
// ============================================================================

/// Bybit 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct BybitConfig {
    /// 테스트넷 사용
    pub testnet: bool,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 기본 URL 재정의 (테스트용)
    pub base_url: Option<String>,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            testnet: false,
            timeout_secs: 30,
            base_url: None,
        }
    }
}

impl BybitConfig {
    /// 새 설정 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트넷 사용.
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// 기본 URL을 재정의합니다.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// 환경 변수에서 생성 (`BYBIT_TESTNET`).
    pub fn from_env() -> Self {
        let testnet = std::env::var("BYBIT_TESTNET")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            testnet,
            ..Self::default()
        }
    }

    /// REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        if let Some(url) = &self.base_url {
            url
        } else if self.testnet {
            "https://api-testnet.bybit.com"
        } else {
            "https://api.bybit.com"
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

/// 모든 v5 응답을 감싸는 공통 봉투.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitEnvelope<T> {
    ret_code: i64,
    ret_msg: String,
    result: Option<T>,
    #[serde(default)]
    time: i64,
}

/// `/v5/market/instruments-info` 결과.
///
/// 상품 페이로드는 카테고리마다 모양이 달라 원시 JSON으로 유지합니다.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitInstrumentsInfo {
    pub category: String,
    pub list: Vec<serde_json::Value>,
}

/// `/v5/market/kline` 결과. 행은 문자열 배열이며 최신순입니다:
/// `[startTime, open, high, low, close, volume, turnover]`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitKlines {
    pub category: String,
    pub symbol: String,
    pub list: Vec<Vec<String>>,
}

/// `/v5/market/tickers` 결과.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitTickers {
    pub category: String,
    pub list: Vec<serde_json::Value>,
    /// 응답 봉투의 서버 시각 (epoch 밀리초)
    #[serde(skip)]
    pub server_time: i64,
}

/// `/v5/market/funding/history` 항목.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitFundingEntry {
    pub symbol: String,
    pub funding_rate: String,
    pub funding_rate_timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitFundingHistory {
    pub category: String,
    pub list: Vec<BybitFundingEntry>,
}

/// `/v5/market/open-interest` 항목.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitOpenInterestEntry {
    pub open_interest: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitOpenInterestResult {
    pub category: String,
    pub symbol: String,
    pub list: Vec<BybitOpenInterestEntry>,
}

/// `/v5/market/orderbook` 결과.
#[derive(Debug, Deserialize)]
pub struct BybitOrderbook {
    /// 심볼
    pub s: String,
    /// 매수 호가 `[price, size]`
    pub b: Vec<[String; 2]>,
    /// 매도 호가 `[price, size]`
    pub a: Vec<[String; 2]>,
    /// 스냅샷 시각 (epoch 밀리초)
    pub ts: i64,
}

// ============================================================================
// Bybit 클라이언트
// ============================================================================

/// Bybit 공개 시장 데이터 클라이언트.
pub struct BybitClient {
    config: BybitConfig,
    client: Client,
}

impl BybitClient {
    /// 새 Bybit 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: BybitConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 API 요청.
    async fn public_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<BybitEnvelope<T>> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let query = Self::build_query(params);
        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<BybitEnvelope<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ExchangeError::Api {
                code: status.as_u16() as i64,
                message: body,
            });
        }

        let envelope: BybitEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse Bybit response: {} - Body: {}", e, body);
            ExchangeError::Parse(e.to_string())
        })?;

        if envelope.ret_code != 0 {
            return Err(Self::map_error_code(envelope.ret_code, &envelope.ret_msg));
        }

        Ok(envelope)
    }

    /// Bybit 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i64, msg: &str) -> ExchangeError {
        match code {
            10006 | 10018 => ExchangeError::RateLimited,
            10001 => ExchangeError::InvalidRequest(msg.to_string()),
            _ => ExchangeError::Api {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 봉투에서 결과를 꺼냅니다.
    fn take_result<T>(envelope: BybitEnvelope<T>, endpoint: &str) -> ExchangeResult<T> {
        envelope
            .result
            .ok_or_else(|| ExchangeError::Parse(format!("missing result in {}", endpoint)))
    }

    /// 카테고리별 상품 목록 조회.
    pub async fn get_instruments_info(&self, category: &str) -> ExchangeResult<BybitInstrumentsInfo> {
        let params = [
            ("category", category.to_string()),
            ("limit", "1000".to_string()),
        ];
        let envelope = self
            .public_get("/v5/market/instruments-info", &params)
            .await?;
        Self::take_result(envelope, "instruments-info")
    }

    /// 카테고리 전체 또는 단일 심볼 시세 조회.
    pub async fn get_tickers(
        &self,
        category: &str,
        symbol: Option<&str>,
    ) -> ExchangeResult<BybitTickers> {
        let mut params = vec![("category", category.to_string())];
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol.to_string()));
        }
        let envelope: BybitEnvelope<BybitTickers> =
            self.public_get("/v5/market/tickers", &params).await?;
        let time = envelope.time;
        let mut result = Self::take_result(envelope, "tickers")?;
        result.server_time = time;
        Ok(result)
    }

    /// 캔들스틱 페이지 조회. `end`는 상한 타임스탬프(밀리초)입니다.
    pub async fn get_klines(
        &self,
        category: &str,
        symbol: &str,
        interval: &str,
        limit: usize,
        end: Option<i64>,
    ) -> ExchangeResult<BybitKlines> {
        let mut params = vec![
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(end) = end {
            params.push(("end", end.to_string()));
        }
        let envelope = self.public_get("/v5/market/kline", &params).await?;
        Self::take_result(envelope, "kline")
    }

    /// 펀딩비 히스토리 페이지 조회.
    pub async fn get_funding_history(
        &self,
        category: &str,
        symbol: &str,
        limit: usize,
        end_time: Option<i64>,
    ) -> ExchangeResult<BybitFundingHistory> {
        let mut params = vec![
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(end_time) = end_time {
            params.push(("endTime", end_time.to_string()));
        }
        let envelope = self.public_get("/v5/market/funding/history", &params).await?;
        Self::take_result(envelope, "funding/history")
    }

    /// 미결제약정 조회.
    pub async fn get_open_interest(
        &self,
        category: &str,
        symbol: &str,
        interval_time: &str,
        limit: usize,
    ) -> ExchangeResult<BybitOpenInterestResult> {
        let params = [
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
            ("intervalTime", interval_time.to_string()),
            ("limit", limit.to_string()),
        ];
        let envelope = self.public_get("/v5/market/open-interest", &params).await?;
        Self::take_result(envelope, "open-interest")
    }

    /// 호가창 조회.
    pub async fn get_orderbook(
        &self,
        category: &str,
        symbol: &str,
        limit: usize,
    ) -> ExchangeResult<BybitOrderbook> {
        let params = [
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
        ];
        let envelope = self.public_get("/v5/market/orderbook", &params).await?;
        Self::take_result(envelope, "orderbook")
    }
}
