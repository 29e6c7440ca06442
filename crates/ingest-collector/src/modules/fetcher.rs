//! 배치 단위 수집기.
//!
//! 유니버스를 입력 순서대로 고정 크기 배치로 나누고, 배치 안의 티커를
//! 하나씩 순차적으로 조회합니다. 배치 사이에는 주입된 `Pacer`로 대기하며,
//! 이것이 유일한 요청 속도 조절 지점입니다.
//!
//! 티커 하나의 실패는 `FetchOutcome::Error`로 기록될 뿐 배치나 실행을
//! 중단하지 않습니다.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use ingest_core::{ObservationRecord, ObservationWindow, TickerSymbol};
use ingest_data::{DataError, ObservationProvider};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 배치 간 대기 정책
#[async_trait]
pub trait Pacer: Send + Sync {
    /// 다음 배치(`next_batch`, 0부터 시작) 시작 전 대기
    async fn pause(&self, next_batch: usize);
}

/// 고정 시간 대기
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self, next_batch: usize) {
        if self.0.is_zero() {
            return;
        }
        info!(
            next_batch = next_batch + 1,
            delay_secs = self.0.as_secs_f64(),
            "다음 배치 전 대기"
        );
        tokio::time::sleep(self.0).await;
    }
}

/// 대기 없음 (테스트/단일 배치용)
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

#[async_trait]
impl Pacer for Immediate {
    async fn pause(&self, _next_batch: usize) {}
}

/// 티커별 재시도 정책 (지수 백오프 + 지터)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (1이면 재시도 없음)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// 재시도 없음
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// `attempt`번째 실패 후 지수 백오프 상한 (지터 적용 전)
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// `attempt`번째 실패 후 대기 시간: `[ceiling/2, ceiling]` 범위의 임의 값
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        let ceiling_ms = ceiling.as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        let jittered = rand::thread_rng().gen_range(ceiling_ms / 2..=ceiling_ms);
        Duration::from_millis(jittered)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

/// 티커 하나의 조회 결과
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 레코드 있음 (비어 있지 않음)
    Records(Vec<ObservationRecord>),
    /// 조회 성공, 데이터 없음
    Empty,
    /// 조회 실패 (사유)
    Error(String),
}

/// 조회가 끝난 배치
#[derive(Debug, Clone)]
pub struct FetchedBatch {
    /// 배치 번호 (0부터)
    pub index: usize,
    /// 전체 배치 수
    pub total: usize,
    /// 입력 순서를 유지한 티커별 결과
    pub results: Vec<(TickerSymbol, FetchOutcome)>,
}

/// 유니버스를 입력 순서대로 `batch_size` 크기 배치로 분할
///
/// 배치 수는 `ceil(N / batch_size)`이며, 배치를 이어 붙이면 입력과 같습니다.
pub fn partition(tickers: &[TickerSymbol], batch_size: usize) -> Vec<&[TickerSymbol]> {
    tickers.chunks(batch_size.max(1)).collect()
}

/// 배치 단위 수집기
pub struct BatchFetcher<'a> {
    provider: &'a dyn ObservationProvider,
    pacer: &'a dyn Pacer,
    retry: RetryPolicy,
    timeout: Duration,
    batch_size: usize,
}

impl<'a> BatchFetcher<'a> {
    pub fn new(provider: &'a dyn ObservationProvider, pacer: &'a dyn Pacer, batch_size: usize) -> Self {
        Self {
            provider,
            pacer,
            retry: RetryPolicy::none(),
            timeout: Duration::from_secs(30),
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 배치 단위 지연 스트림
    ///
    /// 스트림을 폴링해야 다음 배치 조회가 시작됩니다. 첫 배치 이후에는
    /// 매 배치 시작 전에 `Pacer`로 대기합니다.
    pub fn batches<'s>(
        &'s self,
        tickers: &'s [TickerSymbol],
        window: &'s ObservationWindow,
    ) -> impl Stream<Item = FetchedBatch> + 's {
        let batches = partition(tickers, self.batch_size);
        let total = batches.len();

        stream::unfold(
            (batches.into_iter().enumerate(), total),
            move |(mut remaining, total)| async move {
                let (index, batch) = remaining.next()?;
                if index > 0 {
                    self.pacer.pause(index).await;
                }

                info!(
                    batch = index + 1,
                    total = total,
                    tickers = batch.len(),
                    "배치 조회 시작"
                );

                let mut results = Vec::with_capacity(batch.len());
                for ticker in batch {
                    let outcome = self.fetch_ticker(ticker, window).await;
                    results.push((ticker.clone(), outcome));
                }

                Some((
                    FetchedBatch {
                        index,
                        total,
                        results,
                    },
                    (remaining, total),
                ))
            },
        )
    }

    /// 티커별 결과 지연 스트림 (배치 경계 없이 입력 순서대로)
    pub fn fetch_all<'s>(
        &'s self,
        tickers: &'s [TickerSymbol],
        window: &'s ObservationWindow,
    ) -> impl Stream<Item = (TickerSymbol, FetchOutcome)> + 's {
        self.batches(tickers, window)
            .flat_map(|batch| stream::iter(batch.results))
    }

    /// 티커 하나 조회 (타임아웃 + 재시도 가능한 오류만 재시도)
    pub async fn fetch_ticker(
        &self,
        ticker: &TickerSymbol,
        window: &ObservationWindow,
    ) -> FetchOutcome {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.provider.fetch(ticker, window)).await {
                Ok(result) => result,
                Err(_) => Err(DataError::Timeout(format!(
                    "{} 응답 없음 ({:.0}초)",
                    self.provider.name(),
                    self.timeout.as_secs_f64()
                ))),
            };

            match result {
                Ok(records) if records.is_empty() => {
                    debug!(ticker = %ticker, "데이터 없음");
                    return FetchOutcome::Empty;
                }
                Ok(records) => {
                    debug!(ticker = %ticker, records = records.len(), "조회 완료");
                    return FetchOutcome::Records(records);
                }
                Err(e) if e.is_not_found() => {
                    debug!(ticker = %ticker, error = %e, "데이터 없음");
                    return FetchOutcome::Empty;
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        ticker = %ticker,
                        attempt = attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "조회 실패, 재시도 대기"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(ticker = %ticker, attempt = attempt, error = %e, "조회 실패");
                    return FetchOutcome::Error(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_preserves_order() {
        let tickers: Vec<TickerSymbol> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|s| TickerSymbol::parse(s).unwrap())
            .collect();
        let batches = partition(&tickers, 2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 1);
        assert_eq!(batches.concat(), tickers);
        assert!(partition(&[], 50).is_empty());
        assert_eq!(partition(&tickers, 0).len(), 5);
    }

    #[test]
    fn test_backoff_growth_and_cap() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_millis(3000));
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_ceiling(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_ceiling(4), Duration::from_millis(3000));
        assert_eq!(policy.backoff_ceiling(40), Duration::from_millis(3000));

        for attempt in 1..=4 {
            let delay = policy.backoff(attempt);
            let ceiling = policy.backoff_ceiling(attempt);
            assert!(delay <= ceiling && delay >= ceiling / 2);
        }
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff(1), Duration::ZERO);
    }
}
