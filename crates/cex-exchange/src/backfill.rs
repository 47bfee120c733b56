//! 커서 기반 과거 데이터 백필 엔진.
//!
//! 모든 거래소의 캔들/펀딩비 히스토리 엔드포인트는 같은 모양을 가집니다:
//! 상한 타임스탬프 커서를 받아 최신순 한 페이지를 돌려주는 엔드포인트를,
//! 요청한 범위 또는 개수가 채워질 때까지 반복 호출해야 합니다. 이 모듈은
//! 그 반복을 한 곳에 구현합니다: 페이지 병합과 타임스탬프 중복 제거,
//! 종료 판정(부분 페이지, 범위 도달, 커서 정체), 정렬과 절단.
//!
//! 페이지 조회 자체는 `fetch_page` 클로저가 수행하며, 엔진은 재시도하지
//! 않고 조회 실패를 그대로 전파합니다.

use std::collections::BTreeMap;
use std::future::Future;

use tracing::{debug, warn};

use cex_core::Timestamped;

use crate::error::{ExchangeError, ExchangeResult};

/// 백필 요청 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillRequest {
    /// 닫힌 범위 `[start, end]` (epoch 밀리초, 양끝 포함)
    Range { start: i64, end: i64 },
    /// 최신 `num`개
    Count { num: usize },
}

impl BackfillRequest {
    /// 선택적 호출자 파라미터에서 요청 모드를 결정합니다.
    ///
    /// `start`와 `end`가 모두 주어지면 범위 모드가 `num`보다 우선합니다.
    /// 어느 모드도 완성되지 않으면 `InvalidRequest`를 반환합니다.
    pub fn from_parts(
        start: Option<i64>,
        end: Option<i64>,
        num: Option<usize>,
    ) -> ExchangeResult<Self> {
        match (start, end, num) {
            (Some(start), Some(end), _) => {
                if start > end {
                    return Err(ExchangeError::InvalidRequest(format!(
                        "start {} is after end {}",
                        start, end
                    )));
                }
                Ok(BackfillRequest::Range { start, end })
            }
            (_, _, Some(num)) => Ok(BackfillRequest::Count { num }),
            _ => Err(ExchangeError::InvalidRequest(
                "(start, end) or num must be provided".to_string(),
            )),
        }
    }
}

/// 다음 페이지 커서 계산 규칙.
///
/// 거래소마다 커서 파라미터의 경계 처리(포함/미포함)가 다릅니다. 규칙을
/// 잘못 고르면 경계 레코드가 누락되거나 같은 페이지를 무한히 다시 받게
/// 되므로, 엔드포인트별로 지정해야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// 다음 커서 = 페이지 최소 타임스탬프 + 1 (커서 경계를 포함하는 엔드포인트)
    MinPlusOne,
    /// 다음 커서 = 페이지 최소 타임스탬프 (strictly-less-than 엔드포인트)
    MinTimestamp,
}

impl CursorStep {
    /// 페이지 최소 타임스탬프에서 다음 커서를 계산합니다.
    pub fn advance(&self, page_min: i64) -> i64 {
        match self {
            CursorStep::MinPlusOne => page_min + 1,
            CursorStep::MinTimestamp => page_min,
        }
    }
}

/// 타임스탬프 중복을 제거하는 정렬 버퍼.
///
/// 페이징 도중 겹치는 페이지가 같은 타임스탬프를 다시 가져오는 일은
/// 정상이며, 같은 키에 대한 마지막 쓰기가 남습니다.
#[derive(Debug)]
pub struct SeriesBuffer<T> {
    records: BTreeMap<i64, T>,
}

impl<T: Timestamped> SeriesBuffer<T> {
    /// 빈 버퍼를 생성합니다.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// 고유 타임스탬프 개수를 반환합니다.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 버퍼가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 한 페이지를 병합합니다. 타임스탬프가 겹치면 나중 레코드가 남습니다.
    pub fn merge(&mut self, page: Vec<T>) {
        for record in page {
            self.records.insert(record.timestamp(), record);
        }
    }

    /// 타임스탬프 오름차순 벡터로 변환합니다.
    pub fn into_ascending(self) -> Vec<T> {
        self.records.into_values().collect()
    }

    /// `[start, end]` 범위의 레코드만 오름차순으로 반환합니다.
    pub fn into_range(self, start: i64, end: i64) -> Vec<T> {
        self.records
            .into_iter()
            .filter(|(ts, _)| (start..=end).contains(ts))
            .map(|(_, record)| record)
            .collect()
    }

    /// 최신 `num`개를 오름차순으로 반환합니다.
    pub fn into_latest(self, num: usize) -> Vec<T> {
        let mut records = self.into_ascending();
        if records.len() > num {
            records.drain(..records.len() - num);
        }
        records
    }
}

impl<T: Timestamped> Default for SeriesBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 커서 기반 히스토리 엔드포인트를 요청이 채워질 때까지 페이징합니다.
///
/// `fetch_page`는 선택적 상한 커서(epoch 밀리초)를 받아 한 페이지를
/// 반환해야 합니다. 커서가 없으면 최신 페이지를 의미합니다. `limit`는
/// 엔드포인트의 최대 페이지 크기로, 부분 페이지(소진) 판정에 쓰입니다.
///
/// 반환 집합은 타임스탬프 오름차순이며 중복 타임스탬프가 없습니다.
/// 범위 모드는 `[start, end]` 밖의 레코드를 제외하고, 개수 모드는 최신
/// `num`개로 절단합니다.
///
/// # Errors
/// `fetch_page`의 에러는 재시도 없이 즉시 전파됩니다. 중간 실패 시
/// 부분 결과를 돌려주지 않습니다.
pub async fn backfill<T, F, Fut>(
    fetch_page: F,
    limit: usize,
    step: CursorStep,
    request: BackfillRequest,
) -> ExchangeResult<Vec<T>>
where
    T: Timestamped,
    F: Fn(Option<i64>) -> Fut,
    Fut: Future<Output = ExchangeResult<Vec<T>>>,
{
    match request {
        BackfillRequest::Range { start, end } => {
            if start > end {
                return Err(ExchangeError::InvalidRequest(format!(
                    "start {} is after end {}",
                    start, end
                )));
            }
            backfill_range(fetch_page, limit, step, start, end).await
        }
        BackfillRequest::Count { num } => backfill_count(fetch_page, limit, step, num).await,
    }
}

/// 범위 모드: `[start, end]`를 덮을 때까지 `end + 1`에서 과거로 페이징.
async fn backfill_range<T, F, Fut>(
    fetch_page: F,
    limit: usize,
    step: CursorStep,
    start: i64,
    end: i64,
) -> ExchangeResult<Vec<T>>
where
    T: Timestamped,
    F: Fn(Option<i64>) -> Fut,
    Fut: Future<Output = ExchangeResult<Vec<T>>>,
{
    let mut results = SeriesBuffer::new();
    let mut cursor = end + 1;

    loop {
        let page = fetch_page(Some(cursor)).await?;
        let page_len = page.len();
        let Some(page_min) = page.iter().map(Timestamped::timestamp).min() else {
            break;
        };
        results.merge(page);

        debug!(
            cursor,
            page_len,
            accumulated = results.len(),
            "Backfill page merged"
        );

        let next = step.advance(page_min);
        if page_len < limit || next <= start {
            break;
        }
        // 커서가 전진(감소)하지 않으면 소진으로 간주하고 누적분을 반환
        if next >= cursor {
            warn!(cursor, next, "Cursor did not advance, treating as exhausted");
            break;
        }
        cursor = next;
    }

    Ok(results.into_range(start, end))
}

/// 개수 모드: 최신 페이지부터 `num`개가 모일 때까지 과거로 페이징.
async fn backfill_count<T, F, Fut>(
    fetch_page: F,
    limit: usize,
    step: CursorStep,
    num: usize,
) -> ExchangeResult<Vec<T>>
where
    T: Timestamped,
    F: Fn(Option<i64>) -> Fut,
    Fut: Future<Output = ExchangeResult<Vec<T>>>,
{
    if num == 0 {
        return Ok(Vec::new());
    }

    let mut results = SeriesBuffer::new();
    let mut cursor: Option<i64> = None;

    loop {
        let page = fetch_page(cursor).await?;
        let page_len = page.len();
        let Some(page_min) = page.iter().map(Timestamped::timestamp).min() else {
            break;
        };
        results.merge(page);

        debug!(
            cursor,
            page_len,
            accumulated = results.len(),
            "Backfill page merged"
        );

        if page_len < limit || results.len() >= num {
            break;
        }
        let next = step.advance(page_min);
        if cursor.is_some_and(|current| next >= current) {
            warn!(?cursor, next, "Cursor did not advance, treating as exhausted");
            break;
        }
        cursor = Some(next);
    }

    Ok(results.into_latest(num))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 테스트용 타임스탬프 레코드.
    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        ts: i64,
    }

    impl Timestamped for Rec {
        fn timestamp(&self) -> i64 {
            self.ts
        }
    }

    fn rec(ts: i64) -> Rec {
        Rec { ts }
    }

    fn timestamps(records: &[Rec]) -> Vec<i64> {
        records.iter().map(|r| r.ts).collect()
    }

    fn assert_strictly_ascending(records: &[Rec]) {
        for window in records.windows(2) {
            assert!(
                window[0].ts < window[1].ts,
                "expected strictly ascending timestamps, got {} then {}",
                window[0].ts,
                window[1].ts
            );
        }
    }

    /// 최신순 전체 히스토리에서 strictly-less-than 커서 페이지를 만드는
    /// 조회 클로저 (`CursorStep::MinTimestamp` 규약).
    fn exclusive_fetcher(
        history: Vec<Rec>,
        limit: usize,
    ) -> impl Fn(Option<i64>) -> std::pin::Pin<Box<dyn Future<Output = ExchangeResult<Vec<Rec>>>>>
    {
        let history = Arc::new(history);
        move |cursor| {
            let history = Arc::clone(&history);
            Box::pin(async move {
                let page: Vec<Rec> = history
                    .iter()
                    .filter(|r| cursor.is_none_or(|c| r.ts < c))
                    .take(limit)
                    .cloned()
                    .collect();
                Ok(page)
            })
        }
    }

    /// 커서 경계를 포함하는 엔드포인트 (`CursorStep::MinPlusOne` 규약).
    fn inclusive_fetcher(
        history: Vec<Rec>,
        limit: usize,
    ) -> impl Fn(Option<i64>) -> std::pin::Pin<Box<dyn Future<Output = ExchangeResult<Vec<Rec>>>>>
    {
        let history = Arc::new(history);
        move |cursor| {
            let history = Arc::clone(&history);
            Box::pin(async move {
                let page: Vec<Rec> = history
                    .iter()
                    .filter(|r| cursor.is_none_or(|c| r.ts <= c))
                    .take(limit)
                    .cloned()
                    .collect();
                Ok(page)
            })
        }
    }

    #[tokio::test]
    async fn test_range_mode_three_pages() {
        // 페이지: [500,400], [300,200], [100,50] / 범위 [100,500]
        let fetch = exclusive_fetcher(
            vec![rec(500), rec(400), rec(300), rec(200), rec(100), rec(50)],
            2,
        );

        let result = backfill(
            fetch,
            2,
            CursorStep::MinTimestamp,
            BackfillRequest::Range { start: 100, end: 500 },
        )
        .await
        .unwrap();

        assert_eq!(timestamps(&result), vec![100, 200, 300, 400, 500]);
        assert_strictly_ascending(&result);
    }

    #[tokio::test]
    async fn test_range_mode_excludes_out_of_range() {
        let fetch = exclusive_fetcher(vec![rec(900), rec(500), rec(400), rec(120)], 10);

        let result = backfill(
            fetch,
            10,
            CursorStep::MinTimestamp,
            BackfillRequest::Range { start: 200, end: 600 },
        )
        .await
        .unwrap();

        // 900은 커서 시작점(601) 위라 조회되지 않고, 120은 범위 밖이라 제외
        assert_eq!(timestamps(&result), vec![400, 500]);
    }

    #[tokio::test]
    async fn test_count_mode_truncates_to_latest() {
        // 페이지: [500,400] → [300,200], num=3 → 두 페이지 후 중단
        let fetch = exclusive_fetcher(vec![rec(500), rec(400), rec(300), rec(200)], 2);

        let result = backfill(
            fetch,
            2,
            CursorStep::MinTimestamp,
            BackfillRequest::Count { num: 3 },
        )
        .await
        .unwrap();

        assert_eq!(timestamps(&result), vec![300, 400, 500]);
    }

    #[tokio::test]
    async fn test_count_mode_fewer_available_than_num() {
        let fetch = exclusive_fetcher(vec![rec(300), rec(200), rec(100)], 10);

        let result = backfill(
            fetch,
            10,
            CursorStep::MinTimestamp,
            BackfillRequest::Count { num: 30 },
        )
        .await
        .unwrap();

        assert_eq!(timestamps(&result), vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn test_count_mode_zero_num_fetches_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = Arc::clone(&calls);
        let fetch = move |_cursor: Option<i64>| {
            let calls = Arc::clone(&calls_in_fetch);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![rec(100)])
            }
        };

        let result = backfill(
            fetch,
            10,
            CursorStep::MinTimestamp,
            BackfillRequest::Count { num: 0 },
        )
        .await
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_first_page_returns_empty() {
        let fetch = exclusive_fetcher(Vec::new(), 100);

        let result = backfill(
            fetch,
            100,
            CursorStep::MinTimestamp,
            BackfillRequest::Range { start: 100, end: 500 },
        )
        .await
        .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_inclusive_cursor_dedups_boundary_records() {
        // MinPlusOne 규약: 각 페이지 경계 레코드가 다시 조회되어도
        // 결과에는 한 번만 남아야 한다
        let fetch = inclusive_fetcher(vec![rec(500), rec(400), rec(300)], 2);

        let result = backfill(
            fetch,
            2,
            CursorStep::MinPlusOne,
            BackfillRequest::Range { start: 300, end: 500 },
        )
        .await
        .unwrap();

        assert_eq!(timestamps(&result), vec![300, 400, 500]);
        assert_strictly_ascending(&result);
    }

    #[tokio::test]
    async fn test_stalled_cursor_terminates() {
        // 커서를 무시하고 항상 같은 꽉 찬 페이지를 돌려주는 엔드포인트
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = Arc::clone(&calls);
        let fetch = move |_cursor: Option<i64>| {
            let calls = Arc::clone(&calls_in_fetch);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![rec(200), rec(100)])
            }
        };

        let result = backfill(
            fetch,
            2,
            CursorStep::MinTimestamp,
            BackfillRequest::Range { start: 0, end: 300 },
        )
        .await
        .unwrap();

        assert_eq!(timestamps(&result), vec![100, 200]);
        // 첫 페이지 후 커서 100으로 한 번 더 조회, 정체 감지 후 종료
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_count_mode_stalled_cursor_terminates() {
        let fetch = |_cursor: Option<i64>| async move { Ok(vec![rec(200), rec(100)]) };

        let result = backfill(
            fetch,
            2,
            CursorStep::MinTimestamp,
            BackfillRequest::Count { num: 10 },
        )
        .await
        .unwrap();

        assert_eq!(timestamps(&result), vec![100, 200]);
    }

    #[tokio::test]
    async fn test_idempotent_against_deterministic_fetcher() {
        let history = vec![rec(500), rec(400), rec(300), rec(200), rec(100)];
        let request = BackfillRequest::Range { start: 150, end: 450 };

        let first = backfill(
            exclusive_fetcher(history.clone(), 2),
            2,
            CursorStep::MinTimestamp,
            request,
        )
        .await
        .unwrap();
        let second = backfill(
            exclusive_fetcher(history, 2),
            2,
            CursorStep::MinTimestamp,
            request,
        )
        .await
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(timestamps(&first), vec![200, 300, 400]);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_without_partial_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = Arc::clone(&calls);
        let fetch = move |cursor: Option<i64>| {
            let calls = Arc::clone(&calls_in_fetch);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                match cursor {
                    Some(c) if c <= 400 => Err(ExchangeError::Network("reset".to_string())),
                    Some(c) => Ok(vec![rec(c - 1), rec(c - 101)]),
                    None => Ok(vec![rec(500), rec(400)]),
                }
            }
        };

        let err = backfill(
            fetch,
            2,
            CursorStep::MinTimestamp,
            BackfillRequest::Range { start: 0, end: 500 },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::Network(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_range_rejected() {
        let fetch = exclusive_fetcher(vec![rec(100)], 10);

        let err = backfill(
            fetch,
            10,
            CursorStep::MinTimestamp,
            BackfillRequest::Range { start: 500, end: 100 },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_from_parts() {
        assert_eq!(
            BackfillRequest::from_parts(Some(100), Some(500), None).unwrap(),
            BackfillRequest::Range { start: 100, end: 500 }
        );
        // 범위가 완성되면 num보다 우선
        assert_eq!(
            BackfillRequest::from_parts(Some(100), Some(500), Some(30)).unwrap(),
            BackfillRequest::Range { start: 100, end: 500 }
        );
        // 한쪽 끝만 있으면 num으로 폴백
        assert_eq!(
            BackfillRequest::from_parts(Some(100), None, Some(30)).unwrap(),
            BackfillRequest::Count { num: 30 }
        );
        assert!(matches!(
            BackfillRequest::from_parts(None, None, None),
            Err(ExchangeError::InvalidRequest(_))
        ));
        assert!(matches!(
            BackfillRequest::from_parts(Some(500), Some(100), None),
            Err(ExchangeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_series_buffer_last_write_wins() {
        let mut buffer = SeriesBuffer::new();
        buffer.merge(vec![rec(100), rec(200)]);
        buffer.merge(vec![rec(200), rec(300)]);

        assert_eq!(buffer.len(), 3);
        let records = buffer.into_ascending();
        assert_eq!(timestamps(&records), vec![100, 200, 300]);
    }

    #[test]
    fn test_series_buffer_latest_truncation() {
        let mut buffer = SeriesBuffer::new();
        buffer.merge(vec![rec(500), rec(100), rec(300)]);

        assert_eq!(timestamps(&buffer.into_latest(2)), vec![300, 500]);
    }
}
