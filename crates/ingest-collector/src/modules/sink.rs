//! 멱등 저장소.
//!
//! 두 가지 쓰기 정책을 지원합니다:
//! - `SkipIfExists`: `SinkKey`의 오브젝트가 이미 있으면 건너뛰고, 없으면 레코드 전체를
//!   하나의 CSV 오브젝트로 기록합니다. 일별 테이블이 지정되면 레코드를 먼저
//!   웨어하우스에 추가하고, 성공한 경우에만 오브젝트를 기록합니다. 적재가 실패하면
//!   오브젝트가 없으므로 다음 실행에서 다시 시도됩니다.
//! - `TruncateAndReload`: 실행 중 첫 쓰기 전에 대상 테이블을 비우고 이후 추가합니다.

use chrono::{DateTime, NaiveDate, Utc};
use ingest_core::{DataKind, Observation, ObservationRecord, SinkKey, TickerSymbol};
use ingest_data::{ObjectStore, Warehouse};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::CollectorError;
use crate::Result;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// 쓰기 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePolicy {
    /// 오브젝트가 있으면 건너뜀. `daily_table`이 있으면 새 오브젝트의 레코드를 추가 적재
    SkipIfExists { daily_table: Option<String> },
    /// 실행당 한 번 테이블 초기화 후 추가
    TruncateAndReload { table: String },
}

/// 쓰기 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 기록된 레코드 수
    Written { records: usize },
    /// 이미 저장되어 있어 건너뜀
    Skipped,
}

/// 멱등 저장소
///
/// 실행마다 새로 생성합니다. 실행 간에 유지되는 상태는 없습니다.
pub struct IdempotentSink<'a> {
    store: &'a dyn ObjectStore,
    warehouse: &'a dyn Warehouse,
    kind: DataKind,
    prefix: String,
    as_of: NaiveDate,
    policy: WritePolicy,
    last_updated: DateTime<Utc>,
    truncated: bool,
}

impl<'a> IdempotentSink<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        warehouse: &'a dyn Warehouse,
        kind: DataKind,
        prefix: impl Into<String>,
        as_of: NaiveDate,
        policy: WritePolicy,
    ) -> Self {
        Self {
            store,
            warehouse,
            kind,
            prefix: prefix.into(),
            as_of,
            policy,
            last_updated: Utc::now(),
            truncated: false,
        }
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    /// 티커의 오브젝트 키
    pub fn object_key(&self, ticker: &TickerSymbol) -> String {
        SinkKey::new(ticker.clone(), self.kind, self.as_of).object_key(&self.prefix)
    }

    /// 티커 레코드 저장
    ///
    /// 존재 확인/쓰기 실패는 해당 티커 단위 에러로, 테이블 초기화 실패는
    /// `SinkUnavailable`(실행 중단)로 반환합니다.
    pub async fn write(
        &mut self,
        ticker: &TickerSymbol,
        records: &[ObservationRecord],
    ) -> Result<WriteOutcome> {
        match self.policy.clone() {
            WritePolicy::SkipIfExists { daily_table } => {
                self.write_object_once(ticker, records, daily_table.as_deref()).await
            }
            WritePolicy::TruncateAndReload { table } => {
                self.reload_table(ticker, records, &table).await
            }
        }
    }

    async fn write_object_once(
        &self,
        ticker: &TickerSymbol,
        records: &[ObservationRecord],
        daily_table: Option<&str>,
    ) -> Result<WriteOutcome> {
        let key = self.object_key(ticker);

        let exists = match self.store.exists(&key).await {
            Ok(exists) => exists,
            Err(e) if e.is_not_found() => false,
            Err(source) => return Err(CollectorError::SinkExistenceCheck { key, source }),
        };
        if exists {
            info!(ticker = %ticker, key = %key, "이미 저장됨, 건너뜀");
            return Ok(WriteOutcome::Skipped);
        }

        let body = encode_csv(self.kind, records)?;

        // 오브젝트가 커밋 표시: 일별 테이블 적재가 성공한 뒤에만 기록
        if let Some(table) = daily_table {
            let inserted = self
                .warehouse
                .append(table, records, self.last_updated)
                .await
                .map_err(|source| CollectorError::SinkWrite {
                    key: table.to_string(),
                    source,
                })?;
            debug!(ticker = %ticker, table = table, rows = inserted, "일별 테이블 적재");
        }

        self.store
            .put(&key, body, CSV_CONTENT_TYPE)
            .await
            .map_err(|source| CollectorError::SinkWrite {
                key: key.clone(),
                source,
            })?;
        info!(ticker = %ticker, key = %key, records = records.len(), "오브젝트 저장 완료");

        Ok(WriteOutcome::Written {
            records: records.len(),
        })
    }

    async fn reload_table(
        &mut self,
        ticker: &TickerSymbol,
        records: &[ObservationRecord],
        table: &str,
    ) -> Result<WriteOutcome> {
        if !self.truncated {
            self.warehouse.truncate(table).await.map_err(|e| {
                CollectorError::SinkUnavailable(format!("{} 초기화 실패: {}", table, e))
            })?;
            self.truncated = true;
        }

        let inserted = self
            .warehouse
            .append(table, records, self.last_updated)
            .await
            .map_err(|source| CollectorError::SinkWrite {
                key: table.to_string(),
                source,
            })?;
        info!(ticker = %ticker, table = table, rows = inserted, "테이블 적재 완료");

        Ok(WriteOutcome::Written {
            records: records.len(),
        })
    }
}

// =============================================================================
// CSV 직렬화
// =============================================================================

#[derive(Serialize)]
struct DividendRow<'r> {
    date: NaiveDate,
    dividend: Decimal,
    ticker: &'r str,
}

#[derive(Serialize)]
struct PriceRow<'r> {
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: i64,
    sector: &'r str,
    industry: &'r str,
    ticker: &'r str,
}

#[derive(Serialize)]
struct SentimentRow<'r> {
    title: &'r str,
    source: Option<&'r str>,
    published_at: Option<String>,
    sentiment_date: Option<NaiveDate>,
    sentiment_score: Option<f64>,
    sentiment_label: Option<&'r str>,
    relevance_score: Option<f64>,
    ticker: &'r str,
}

/// CSV 헤더
pub fn csv_header(kind: DataKind) -> &'static str {
    match kind {
        DataKind::Dividends => "date,dividend,ticker",
        DataKind::Prices => "date,open,high,low,close,volume,sector,industry,ticker",
        DataKind::Sentiment => {
            "title,source,published_at,sentiment_date,sentiment_score,sentiment_label,relevance_score,ticker"
        }
    }
}

/// 레코드를 헤더 포함 CSV로 직렬화
///
/// 모든 레코드는 `kind`와 같은 종류여야 합니다.
pub fn encode_csv(kind: DataKind, records: &[ObservationRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(csv_header(kind).split(','))?;

    for record in records {
        let ticker = record.ticker.as_str();
        match (&record.observation, kind) {
            (Observation::DividendEvent(event), DataKind::Dividends) => {
                writer.serialize(DividendRow {
                    date: event.date,
                    dividend: event.amount,
                    ticker,
                })?;
            }
            (Observation::PriceBar(bar), DataKind::Prices) => {
                writer.serialize(PriceRow {
                    date: bar.date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    sector: &bar.sector,
                    industry: &bar.industry,
                    ticker,
                })?;
            }
            (Observation::SentimentItem(item), DataKind::Sentiment) => {
                writer.serialize(SentimentRow {
                    title: &item.title,
                    source: item.source.as_deref(),
                    published_at: item
                        .published_at
                        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                    sentiment_date: item.sentiment_date(),
                    sentiment_score: item.sentiment_score,
                    sentiment_label: item.sentiment_label.as_deref(),
                    relevance_score: item.relevance_score,
                    ticker,
                })?;
            }
            (observation, expected) => {
                return Err(CollectorError::Serialization(format!(
                    "{} 레코드를 {} CSV로 직렬화할 수 없습니다 ({})",
                    observation.kind(),
                    expected,
                    ticker
                )));
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| CollectorError::Serialization(e.to_string()))
}
