//! 수집 파이프라인.
//!
//! 유니버스 확정 → 관측 기간 계산 → 배치 조회 → 배치별 저장 → 실패 로그 기록
//! 순서로 실행합니다.
//!
//! ```text
//! Start → UniverseResolved → WindowComputed → Fetching(i/n) → Sinking(i/n) → …
//!       → FailuresFlushed → Done
//! ```
//!
//! 유니버스/기간 계산 실패는 조회 없이 `Failed`로 끝나며, 티커 단위 실패는
//! 최종 상태를 바꾸지 않습니다.

use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use ingest_core::{DataKind, ObservationWindow, TradingCalendar};
use ingest_data::{ObjectStore, ObservationProvider, UniverseSource, Warehouse};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::failure_log::{FailureAggregator, FailureLogEntry};
use super::fetcher::{partition, BatchFetcher, FetchOutcome, FetchedBatch, Pacer, RetryPolicy};
use super::sink::{IdempotentSink, WriteOutcome, WritePolicy};
use super::universe::resolve_universe;
use crate::config::{CollectorConfig, LoadMode};
use crate::error::CollectorError;
use crate::{Result, RunSummary};

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Start,
    UniverseResolved { tickers: usize },
    WindowComputed(ObservationWindow),
    Fetching { batch: usize, total: usize },
    Sinking { batch: usize, total: usize },
    FailuresFlushed { entries: usize },
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::UniverseResolved { tickers } => write!(f, "UniverseResolved({})", tickers),
            Self::WindowComputed(window) => write!(f, "WindowComputed({})", window),
            Self::Fetching { batch, total } => write!(f, "Fetching({}/{})", batch, total),
            Self::Sinking { batch, total } => write!(f, "Sinking({}/{})", batch, total),
            Self::FailuresFlushed { entries } => write!(f, "FailuresFlushed({})", entries),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// 실행 설정 (실행마다 한 번 구성)
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub kind: DataKind,
    pub mode: LoadMode,
    /// 기준일 (보통 뉴욕 기준 오늘)
    pub reference_date: NaiveDate,
    pub history_years: u32,
    pub lookback_days: u32,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
    pub object_prefix: String,
    pub failure_log_key: String,
    /// 전체 적재 대상 테이블
    pub full_table: String,
    /// 증분 적재 시 추가할 일별 테이블
    pub daily_table: Option<String>,
}

impl PipelineSettings {
    pub fn new(kind: DataKind, mode: LoadMode, reference_date: NaiveDate) -> Self {
        Self {
            kind,
            mode,
            reference_date,
            history_years: 5,
            lookback_days: ingest_core::DEFAULT_LOOKBACK_DAYS,
            batch_size: 50,
            retry: RetryPolicy::default(),
            fetch_timeout: Duration::from_secs(30),
            object_prefix: kind.as_str().to_string(),
            failure_log_key: "logs/no_data_log.txt".to_string(),
            full_table: format!("raw_{}", kind.as_str()),
            daily_table: Some(format!("raw_{}_daily", kind.as_str())),
        }
    }

    /// 설정에서 실행 설정 구성
    pub fn from_config(
        config: &CollectorConfig,
        kind: DataKind,
        mode: LoadMode,
        reference_date: NaiveDate,
    ) -> Self {
        Self {
            kind,
            mode,
            reference_date,
            history_years: config.history_years,
            lookback_days: config.calendar_lookback_days,
            batch_size: config.fetch.batch_size,
            retry: config.fetch.retry_policy(),
            fetch_timeout: config.fetch.timeout(),
            object_prefix: config.object_prefix(kind).to_string(),
            failure_log_key: config.failure_log_key.clone(),
            full_table: config.tables.table_for(kind, LoadMode::Full).to_string(),
            daily_table: Some(config.tables.table_for(kind, LoadMode::Incremental).to_string()),
        }
    }

    fn write_policy(&self) -> WritePolicy {
        match self.mode {
            LoadMode::Incremental => WritePolicy::SkipIfExists {
                daily_table: self.daily_table.clone(),
            },
            LoadMode::Full => WritePolicy::TruncateAndReload {
                table: self.full_table.clone(),
            },
        }
    }
}

/// 파이프라인 구성 요소
#[derive(Clone, Copy)]
pub struct PipelineComponents<'a> {
    pub universe: &'a dyn UniverseSource,
    pub calendar: &'a dyn TradingCalendar,
    pub provider: &'a dyn ObservationProvider,
    pub store: &'a dyn ObjectStore,
    pub warehouse: &'a dyn Warehouse,
    pub pacer: &'a dyn Pacer,
}

/// 수집 파이프라인
pub struct Pipeline<'a> {
    components: PipelineComponents<'a>,
    settings: PipelineSettings,
    transitions: Vec<RunState>,
}

impl<'a> Pipeline<'a> {
    pub fn new(components: PipelineComponents<'a>, settings: PipelineSettings) -> Self {
        Self {
            components,
            settings,
            transitions: Vec::new(),
        }
    }

    /// 현재 상태
    pub fn state(&self) -> &RunState {
        self.transitions.last().unwrap_or(&RunState::Start)
    }

    /// 지금까지의 상태 전이
    pub fn transitions(&self) -> &[RunState] {
        &self.transitions
    }

    /// 파이프라인 실행
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let run_timestamp = Utc::now();
        self.transitions.clear();
        self.transition(RunState::Start);

        info!(
            kind = %self.settings.kind,
            mode = %self.settings.mode,
            reference_date = %self.settings.reference_date,
            provider = self.components.provider.name(),
            store = self.components.store.name(),
            "수집 실행 시작"
        );

        match self.execute(run_timestamp, started).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(error = %e, state = %self.state(), "수집 실행 실패");
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, run_timestamp: DateTime<Utc>, started: Instant) -> Result<RunSummary> {
        let components = self.components;
        let kind = self.settings.kind;

        let tickers = resolve_universe(components.universe).await?;
        self.transition(RunState::UniverseResolved {
            tickers: tickers.len(),
        });

        let window = self.compute_window()?;
        self.transition(RunState::WindowComputed(window));

        let mut summary = RunSummary::new();
        summary.attempted = tickers.len();

        let mut failures =
            FailureAggregator::new(components.store, self.settings.failure_log_key.clone());
        let mut sink = IdempotentSink::new(
            components.store,
            components.warehouse,
            kind,
            self.settings.object_prefix.clone(),
            window.end_date(),
            self.settings.write_policy(),
        );

        let fetcher = BatchFetcher::new(components.provider, components.pacer, self.settings.batch_size)
            .with_retry(self.settings.retry)
            .with_timeout(self.settings.fetch_timeout);
        let total = partition(&tickers, self.settings.batch_size).len();
        let batches = fetcher.batches(&tickers, &window);
        futures::pin_mut!(batches);

        for next in 1..=total {
            self.transition(RunState::Fetching { batch: next, total });
            let Some(batch) = batches.next().await else {
                break;
            };
            self.transition(RunState::Sinking { batch: next, total });
            Self::sink_batch(batch, &window, run_timestamp, kind, &mut sink, &mut failures, &mut summary)
                .await?;
        }

        let entries = failures.flush().await?;
        self.transition(RunState::FailuresFlushed { entries });

        summary.elapsed = started.elapsed();
        self.transition(RunState::Done);
        summary.log_summary(&format!("{} {}", kind, self.settings.mode));
        Ok(summary)
    }

    /// 기간 계산: 증분은 직전 거래일 하루, 전체는 최근 N년
    fn compute_window(&self) -> Result<ObservationWindow> {
        let calendar = self.components.calendar;
        let reference = self.settings.reference_date;
        let window = match self.settings.mode {
            LoadMode::Incremental => calendar
                .previous_trading_day_within(reference, self.settings.lookback_days)
                .map(ObservationWindow::single_day),
            LoadMode::Full => calendar.window_for_years(reference, self.settings.history_years),
        };
        window.map_err(|e| CollectorError::NoTradingDayFound(format!("{} ({})", e, calendar.name())))
    }

    async fn sink_batch(
        batch: FetchedBatch,
        window: &ObservationWindow,
        run_timestamp: DateTime<Utc>,
        kind: DataKind,
        sink: &mut IdempotentSink<'_>,
        failures: &mut FailureAggregator<'_>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for (ticker, outcome) in batch.results {
            match outcome {
                FetchOutcome::Empty => {
                    summary.empty += 1;
                    failures.record(FailureLogEntry::no_data(run_timestamp, ticker, kind, window));
                }
                FetchOutcome::Error(reason) => {
                    summary.failed += 1;
                    failures.record(FailureLogEntry::failed(run_timestamp, ticker, kind, reason));
                }
                FetchOutcome::Records(records) => match sink.write(&ticker, &records).await {
                    Ok(WriteOutcome::Written { records }) => {
                        summary.written += 1;
                        summary.total_records += records;
                    }
                    Ok(WriteOutcome::Skipped) => {
                        summary.skipped += 1;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(ticker = %ticker, error = %e, "저장 실패");
                        summary.failed += 1;
                        failures.record(FailureLogEntry::failed(run_timestamp, ticker, kind, e));
                    }
                },
            }
        }
        Ok(())
    }

    fn transition(&mut self, state: RunState) {
        info!(state = %state, "상태 전이");
        self.transitions.push(state);
    }
}
