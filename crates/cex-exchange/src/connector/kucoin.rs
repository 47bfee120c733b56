//! Kucoin 시장 데이터 커넥터.
//!
//! 현물과 선물이 별도 호스트를 쓰므로 한 클라이언트가 두 기본 URL을
//! 관리합니다. 공개 엔드포인트만 구현합니다.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{ExchangeError, ExchangeResult};

// ============================================================================
// 설정
// ============================================================================

/// Kucoin 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct KucoinConfig {
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 현물 기본 URL 재정의 (테스트용)
    pub spot_base_url: Option<String>,
    /// 선물 기본 URL 재정의 (테스트용)
    pub futures_base_url: Option<String>,
}

impl Default for KucoinConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            spot_base_url: None,
            futures_base_url: None,
        }
    }
}

impl KucoinConfig {
    /// 새 설정 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 현물 기본 URL을 재정의합니다.
    pub fn with_spot_base_url(mut self, url: impl Into<String>) -> Self {
        self.spot_base_url = Some(url.into());
        self
    }

    /// 선물 기본 URL을 재정의합니다.
    pub fn with_futures_base_url(mut self, url: impl Into<String>) -> Self {
        self.futures_base_url = Some(url.into());
        self
    }

    /// 현물 REST 기본 URL 반환.
    pub fn spot_url(&self) -> &str {
        self.spot_base_url
            .as_deref()
            .unwrap_or("https://api.kucoin.com")
    }

    /// 선물 REST 기본 URL 반환.
    pub fn futures_url(&self) -> &str {
        self.futures_base_url
            .as_deref()
            .unwrap_or("https://api-futures.kucoin.com")
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

/// 모든 응답을 감싸는 공통 봉투. 성공 코드는 `"200000"`입니다.
#[derive(Debug, Deserialize)]
struct KucoinEnvelope<T> {
    code: String,
    msg: Option<String>,
    data: Option<T>,
}

/// `/api/v1/market/allTickers` 결과.
#[derive(Debug, Deserialize)]
pub struct KucoinAllTickers {
    /// 서버 시각 (epoch 밀리초)
    pub time: i64,
    pub ticker: Vec<serde_json::Value>,
}

/// `/api/v1/contract/funding-rates` 항목.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinFundingEntry {
    pub symbol: String,
    pub funding_rate: f64,
    /// 펀딩 시각 (epoch 밀리초)
    pub timepoint: i64,
}

// ============================================================================
// Kucoin 클라이언트
// ============================================================================

/// Kucoin 공개 시장 데이터 클라이언트.
pub struct KucoinClient {
    config: KucoinConfig,
    client: Client,
}

impl KucoinClient {
    /// 새 Kucoin 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: KucoinConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 공개 API 요청.
    async fn public_get<T: DeserializeOwned>(
        &self,
        base_url: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let full_url = if query.is_empty() {
            format!("{}{}", base_url, endpoint)
        } else {
            format!("{}{}?{}", base_url, endpoint, query)
        };

        debug!("GET {}", full_url);

        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        // Kucoin은 에러도 200이 아닌 상태와 봉투 양쪽으로 전달할 수 있다
        let envelope: KucoinEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                error!("Failed to parse Kucoin response: {} - Body: {}", e, body);
                ExchangeError::Parse(e.to_string())
            } else {
                ExchangeError::Api {
                    code: status.as_u16() as i64,
                    message: body.clone(),
                }
            }
        })?;

        if envelope.code != "200000" {
            return Err(Self::map_error_code(
                &envelope.code,
                envelope.msg.as_deref().unwrap_or(""),
            ));
        }

        envelope
            .data
            .ok_or_else(|| ExchangeError::Parse(format!("missing data in {}", endpoint)))
    }

    /// Kucoin 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: &str, msg: &str) -> ExchangeError {
        match code {
            "429000" => ExchangeError::RateLimited,
            "400100" => ExchangeError::InvalidRequest(msg.to_string()),
            _ => ExchangeError::Api {
                code: code.parse().unwrap_or(-1),
                message: msg.to_string(),
            },
        }
    }

    /// 현물 심볼 목록 조회.
    pub async fn get_spot_symbols(&self) -> ExchangeResult<Vec<serde_json::Value>> {
        self.public_get(self.config.spot_url(), "/api/v2/symbols", &[])
            .await
    }

    /// 현물 전체 시세 조회.
    pub async fn get_spot_tickers(&self) -> ExchangeResult<KucoinAllTickers> {
        self.public_get(self.config.spot_url(), "/api/v1/market/allTickers", &[])
            .await
    }

    /// 현물 캔들 페이지 조회. `start_at`/`end_at`은 epoch 초입니다.
    ///
    /// 행은 문자열 배열이며 최신순입니다:
    /// `[time, open, close, high, low, volume, turnover]`
    pub async fn get_spot_candles(
        &self,
        symbol: &str,
        candle_type: &str,
        start_at: Option<i64>,
        end_at: Option<i64>,
    ) -> ExchangeResult<Vec<Vec<String>>> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("type", candle_type.to_string()),
        ];
        if let Some(start_at) = start_at {
            params.push(("startAt", start_at.to_string()));
        }
        if let Some(end_at) = end_at {
            params.push(("endAt", end_at.to_string()));
        }
        self.public_get(self.config.spot_url(), "/api/v1/market/candles", &params)
            .await
    }

    /// 활성 선물 계약 목록 조회.
    pub async fn get_futures_contracts(&self) -> ExchangeResult<Vec<serde_json::Value>> {
        self.public_get(self.config.futures_url(), "/api/v1/contracts/active", &[])
            .await
    }

    /// 선물 펀딩비 히스토리 페이지 조회. `from`/`to`는 epoch 밀리초입니다.
    pub async fn get_funding_rates(
        &self,
        symbol: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> ExchangeResult<Vec<KucoinFundingEntry>> {
        let mut params = vec![("symbol", symbol.to_string())];
        if let Some(from) = from {
            params.push(("from", from.to_string()));
        }
        if let Some(to) = to {
            params.push(("to", to.to_string()));
        }
        self.public_get(
            self.config.futures_url(),
            "/api/v1/contract/funding-rates",
            &params,
        )
        .await
    }
}
