//! WOO X 시장 데이터 커넥터.
//!
//! 실시간 엔드포인트(`api.woo.org`)와 과거 데이터 엔드포인트
//! (`api-pub.woo.org`)가 분리되어 있어 두 기본 URL을 관리합니다.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{ExchangeError, ExchangeResult};

// ============================================================================
// 설정
// ============================================================================

/// WOO X 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct WooConfig {
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 기본 URL 재정의 (테스트용)
    pub base_url: Option<String>,
    /// 과거 데이터 URL 재정의 (테스트용)
    pub pub_base_url: Option<String>,
}

impl Default for WooConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            base_url: None,
            pub_base_url: None,
        }
    }
}

impl WooConfig {
    /// 새 설정 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 URL을 재정의합니다.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// 과거 데이터 URL을 재정의합니다.
    pub fn with_pub_base_url(mut self, url: impl Into<String>) -> Self {
        self.pub_base_url = Some(url.into());
        self
    }

    /// 실시간 REST 기본 URL 반환.
    pub fn base_endpoint(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://api.woo.org")
    }

    /// 과거 데이터 REST 기본 URL 반환.
    pub fn pub_endpoint(&self) -> &str {
        self.pub_base_url
            .as_deref()
            .unwrap_or("https://api-pub.woo.org")
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

/// `rows`를 담는 응답 봉투 (`/v1/public/info`, `/v1/public/kline`).
#[derive(Debug, Deserialize)]
struct WooRowsEnvelope<T> {
    success: bool,
    #[serde(default = "Vec::new")]
    rows: Vec<T>,
}

/// `data.rows`를 담는 응답 봉투 (`/v1/hist/kline`).
#[derive(Debug, Deserialize)]
struct WooDataEnvelope<T> {
    success: bool,
    data: Option<WooDataRows<T>>,
}

#[derive(Debug, Deserialize)]
struct WooDataRows<T> {
    rows: Vec<T>,
}

/// WOO 캔들 행. 숫자 필드는 JSON number로 내려옵니다.
#[derive(Debug, Clone, Deserialize)]
pub struct WooKlineRow {
    pub symbol: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub amount: f64,
    /// 캔들 시작 시각 (epoch 밀리초)
    pub start_timestamp: i64,
    /// 캔들 종료 시각 (epoch 밀리초)
    pub end_timestamp: i64,
}

// ============================================================================
// WOO X 클라이언트
// ============================================================================

/// WOO X 공개 시장 데이터 클라이언트.
pub struct WooClient {
    config: WooConfig,
    client: Client,
}

impl WooClient {
    /// 새 WOO X 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: WooConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 공개 API 요청. 봉투 해석 전의 원시 본문을 반환합니다.
    async fn public_get(
        &self,
        base_url: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<String> {
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

        if !status.is_success() {
            return Err(ExchangeError::Api {
                code: status.as_u16() as i64,
                message: body,
            });
        }

        Ok(body)
    }

    fn parse_rows<T: DeserializeOwned>(body: &str, endpoint: &str) -> ExchangeResult<Vec<T>> {
        let envelope: WooRowsEnvelope<T> = serde_json::from_str(body).map_err(|e| {
            error!("Failed to parse WOO response: {} - Body: {}", e, body);
            ExchangeError::Parse(e.to_string())
        })?;

        if !envelope.success {
            return Err(ExchangeError::Api {
                code: -1,
                message: format!("WOO {} returned success=false", endpoint),
            });
        }

        Ok(envelope.rows)
    }

    /// 거래 가능 심볼 목록 조회.
    pub async fn get_available_symbols(&self) -> ExchangeResult<Vec<serde_json::Value>> {
        let body = self
            .public_get(self.config.base_endpoint(), "/v1/public/info", &[])
            .await?;
        Self::parse_rows(&body, "/v1/public/info")
    }

    /// 최신 캔들 페이지 조회 (최신순, 최대 1000개).
    pub async fn get_klines(
        &self,
        symbol: &str,
        kline_type: &str,
        limit: usize,
    ) -> ExchangeResult<Vec<WooKlineRow>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("type", kline_type.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self
            .public_get(self.config.base_endpoint(), "/v1/public/kline", &params)
            .await?;
        Self::parse_rows(&body, "/v1/public/kline")
    }

    /// 과거 캔들 페이지 조회. `end_time`은 상한 타임스탬프(밀리초)입니다.
    pub async fn get_hist_klines(
        &self,
        symbol: &str,
        kline_type: &str,
        end_time: Option<i64>,
    ) -> ExchangeResult<Vec<WooKlineRow>> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("type", kline_type.to_string()),
        ];
        if let Some(end_time) = end_time {
            params.push(("end_time", end_time.to_string()));
        }
        let body = self
            .public_get(self.config.pub_endpoint(), "/v1/hist/kline", &params)
            .await?;

        let envelope: WooDataEnvelope<WooKlineRow> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse WOO hist response: {} - Body: {}", e, body);
            ExchangeError::Parse(e.to_string())
        })?;

        if !envelope.success {
            return Err(ExchangeError::Api {
                code: -1,
                message: "WOO /v1/hist/kline returned success=false".to_string(),
            });
        }

        Ok(envelope.data.map(|d| d.rows).unwrap_or_default())
    }
}
