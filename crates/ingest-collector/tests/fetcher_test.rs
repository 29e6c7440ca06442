//! 배치 수집기 테스트 (요청 간격, 재시도, 타임아웃, 배치 분할).

mod common;

use common::*;
use futures::StreamExt;
use ingest_collector::modules::{
    partition, BatchFetcher, FetchOutcome, FixedDelay, Immediate, RetryPolicy,
};
use ingest_core::{DataKind, ObservationWindow, TickerSymbol};
use ingest_data::DataError;
use proptest::prelude::*;
use rust_decimal_macros::dec;
use std::time::Duration;

fn window() -> ObservationWindow {
    ObservationWindow::single_day(date(2024, 6, 7))
}

fn tickers(symbols: &[&str]) -> Vec<TickerSymbol> {
    symbols.iter().map(|s| ticker(s)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_between_batches_only() {
    let provider = MemoryProvider::new(DataKind::Dividends);
    let pacer = FixedDelay(Duration::from_secs(30));
    let fetcher = BatchFetcher::new(&provider, &pacer, 2);
    let universe = tickers(&["A", "B", "C", "D", "E"]);
    let window = window();

    let started = tokio::time::Instant::now();
    let batches: Vec<_> = fetcher.batches(&universe, &window).collect().await;

    assert_eq!(batches.len(), 3);
    assert_eq!(batches[2].index, 2);
    assert_eq!(batches[2].total, 3);

    let offsets: Vec<(String, u64)> = provider
        .call_times()
        .into_iter()
        .map(|(t, at)| (t, (at - started).as_secs()))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("A".to_string(), 0),
            ("B".to_string(), 0),
            ("C".to_string(), 30),
            ("D".to_string(), 30),
            ("E".to_string(), 60),
        ]
    );
    // 마지막 배치 이후에는 대기하지 않음
    assert_eq!(started.elapsed(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_batches_are_lazy() {
    let provider = MemoryProvider::new(DataKind::Dividends);
    let pacer = FixedDelay(Duration::from_secs(30));
    let fetcher = BatchFetcher::new(&provider, &pacer, 2);
    let universe = tickers(&["A", "B", "C", "D"]);
    let window = window();

    let stream = fetcher.batches(&universe, &window);
    futures::pin_mut!(stream);

    let first = stream.next().await.unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(provider.calls(), vec!["A", "B"]);
}

#[tokio::test]
async fn test_fetch_all_preserves_order_and_outcomes() {
    let provider = MemoryProvider::new(DataKind::Dividends)
        .with_records("AAPL", vec![dividend("AAPL", date(2024, 6, 7), dec!(0.25))])
        .with_error("XOM", DataError::HttpStatus {
            status: 400,
            message: "bad request".to_string(),
        });
    let pacer = Immediate;
    let fetcher = BatchFetcher::new(&provider, &pacer, 2);
    let universe = tickers(&["AAPL", "MSFT", "XOM"]);
    let window = window();

    let results: Vec<(TickerSymbol, FetchOutcome)> =
        fetcher.fetch_all(&universe, &window).collect().await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, ticker("AAPL"));
    assert!(matches!(&results[0].1, FetchOutcome::Records(r) if r.len() == 1));
    assert_eq!(results[1].1, FetchOutcome::Empty);
    assert!(matches!(&results[2].1, FetchOutcome::Error(reason) if reason.contains("400")));
}

#[tokio::test(start_paused = true)]
async fn test_retryable_errors_are_retried_with_backoff() {
    let provider = MemoryProvider::new(DataKind::Dividends)
        .with_records("KO", vec![dividend("KO", date(2024, 6, 7), dec!(0.485))])
        .with_error("KO", DataError::RateLimited("slow down".to_string()))
        .with_error("KO", DataError::Timeout("read timed out".to_string()));
    let pacer = Immediate;
    let retry = RetryPolicy::new(3, Duration::from_millis(500), Duration::from_secs(8));
    let fetcher = BatchFetcher::new(&provider, &pacer, 10).with_retry(retry);

    let started = tokio::time::Instant::now();
    let outcome = fetcher.fetch_ticker(&ticker("KO"), &window()).await;

    assert!(matches!(outcome, FetchOutcome::Records(ref r) if r.len() == 1));
    assert_eq!(provider.calls().len(), 3);
    // 1차 대기 250~500ms, 2차 대기 500~1000ms
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(750), "{:?}", waited);
    assert!(waited <= Duration::from_millis(1500), "{:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_max_attempts() {
    let provider = MemoryProvider::new(DataKind::Dividends)
        .with_error("KO", DataError::ConnectionError("reset".to_string()))
        .with_error("KO", DataError::ConnectionError("reset".to_string()))
        .with_error("KO", DataError::ConnectionError("reset".to_string()));
    let pacer = Immediate;
    let retry = RetryPolicy::new(2, Duration::from_millis(100), Duration::from_secs(1));
    let fetcher = BatchFetcher::new(&provider, &pacer, 10).with_retry(retry);

    let outcome = fetcher.fetch_ticker(&ticker("KO"), &window()).await;

    assert!(matches!(outcome, FetchOutcome::Error(ref reason) if reason.contains("reset")));
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_fails_immediately() {
    let provider = MemoryProvider::new(DataKind::Dividends)
        .with_error("KO", DataError::ParseError("bad payload".to_string()));
    let pacer = Immediate;
    let fetcher = BatchFetcher::new(&provider, &pacer, 10).with_retry(RetryPolicy::default());

    let outcome = fetcher.fetch_ticker(&ticker("KO"), &window()).await;

    assert!(matches!(outcome, FetchOutcome::Error(_)));
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_upstream_times_out() {
    let provider = MemoryProvider::new(DataKind::Dividends).hanging("SLOW");
    let pacer = Immediate;
    let fetcher = BatchFetcher::new(&provider, &pacer, 10).with_timeout(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let outcome = fetcher.fetch_ticker(&ticker("SLOW"), &window()).await;

    assert!(matches!(outcome, FetchOutcome::Error(_)));
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

fn ticker_list() -> impl Strategy<Value = Vec<TickerSymbol>> {
    prop::collection::vec("[A-Z]{1,5}", 0..200)
        .prop_map(|raw| raw.iter().map(|s| ticker(s)).collect())
}

proptest! {
    #[test]
    fn prop_partition_covers_input_exactly_once(
        universe in ticker_list(),
        batch_size in 1usize..120,
    ) {
        let batches = partition(&universe, batch_size);

        prop_assert_eq!(batches.len(), universe.len().div_ceil(batch_size));
        prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= batch_size));
        prop_assert!(batches
            .iter()
            .take(batches.len().saturating_sub(1))
            .all(|b| b.len() == batch_size));
        prop_assert_eq!(batches.concat(), universe);
    }

    #[test]
    fn prop_fetch_all_yields_each_ticker_in_order(
        universe in ticker_list(),
        batch_size in 1usize..50,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let provider = MemoryProvider::new(DataKind::Dividends);
        let pacer = Immediate;
        let fetcher = BatchFetcher::new(&provider, &pacer, batch_size);
        let window = window();

        let fetched: Vec<TickerSymbol> = runtime.block_on(async {
            fetcher
                .fetch_all(&universe, &window)
                .map(|(ticker, _)| ticker)
                .collect()
                .await
        });

        prop_assert_eq!(fetched, universe);
    }
}
