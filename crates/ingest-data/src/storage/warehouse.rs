//! PostgreSQL 웨어하우스.
//!
//! 데이터 종류별 원천(raw) 테이블에 관측 레코드를 적재합니다.
//! 테이블 스키마는 다음과 같습니다 (`inserted_date`는 컬럼 기본값 사용):
//!
//! | 종류 | 컬럼 |
//! |------|------|
//! | prices | ticker, date, open, high, low, close, volume, sector, industry, last_updated |
//! | dividends | ticker, date, dividend, last_updated |
//! | sentiment | ticker, title, source, published_at, sentiment_date, sentiment_score, sentiment_label, relevance_score, last_updated |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ingest_core::{DataKind, Observation, ObservationRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

use crate::{DataError, Result};

/// 한 번의 INSERT에 포함할 최대 행 수.
const INSERT_CHUNK_SIZE: usize = 500;

/// SQL 식별자 검증 후 인용.
///
/// `[A-Za-z_][A-Za-z0-9_]*`만 허용합니다.
pub fn quote_identifier(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(DataError::ConfigError(format!("잘못된 SQL 식별자: '{}'", name)));
    }
    Ok(format!("\"{}\"", name))
}

/// 데이터베이스 연결 풀 생성.
pub async fn connect_pool(url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to warehouse...");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .map_err(|e| DataError::ConnectionError(e.to_string()))
}

/// 분석용 웨어하우스.
#[async_trait]
pub trait Warehouse: Send + Sync {
    fn name(&self) -> &str;

    /// 테이블 전체 삭제 (전체 재적재 전 단계).
    async fn truncate(&self, table: &str) -> Result<()>;

    /// 레코드 추가. 삽입된 행 수를 반환합니다.
    ///
    /// 한 번의 호출에 포함된 레코드는 모두 같은 데이터 종류여야 합니다.
    async fn append(
        &self,
        table: &str,
        records: &[ObservationRecord],
        last_updated: DateTime<Utc>,
    ) -> Result<usize>;
}

/// PostgreSQL 웨어하우스.
#[derive(Clone)]
pub struct PgWarehouse {
    pool: PgPool,
    schema: String,
}

impl PgWarehouse {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    fn qualified(&self, table: &str) -> Result<String> {
        Ok(format!(
            "{}.{}",
            quote_identifier(&self.schema)?,
            quote_identifier(table)?
        ))
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn truncate(&self, table: &str) -> Result<()> {
        let target = self.qualified(table)?;
        sqlx::query(&format!("TRUNCATE TABLE {}", target))
            .execute(&self.pool)
            .await?;
        info!(table = %target, "테이블 초기화 완료");
        Ok(())
    }

    async fn append(
        &self,
        table: &str,
        records: &[ObservationRecord],
        last_updated: DateTime<Utc>,
    ) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let kind = first.kind();
        if let Some(other) = records.iter().find(|r| r.kind() != kind) {
            return Err(DataError::InvalidData(format!(
                "한 번의 적재에 여러 데이터 종류가 섞여 있습니다: {} / {}",
                kind,
                other.kind()
            )));
        }

        let target = self.qualified(table)?;
        let mut total_inserted = 0;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let sql = build_insert_sql(&target, kind, chunk.len());
            let mut query = sqlx::query(&sql);

            for record in chunk {
                let ticker = record.ticker.as_str();
                query = match &record.observation {
                    Observation::PriceBar(bar) => query
                        .bind(ticker)
                        .bind(bar.date)
                        .bind(bar.open)
                        .bind(bar.high)
                        .bind(bar.low)
                        .bind(bar.close)
                        .bind(bar.volume)
                        .bind(bar.sector.as_str())
                        .bind(bar.industry.as_str())
                        .bind(last_updated),
                    Observation::DividendEvent(event) => query
                        .bind(ticker)
                        .bind(event.date)
                        .bind(event.amount)
                        .bind(last_updated),
                    Observation::SentimentItem(item) => query
                        .bind(ticker)
                        .bind(item.title.as_str())
                        .bind(item.source.as_deref())
                        .bind(item.published_at)
                        .bind(item.sentiment_date())
                        .bind(item.sentiment_score)
                        .bind(item.sentiment_label.as_deref())
                        .bind(item.relevance_score)
                        .bind(last_updated),
                };
            }

            let result = query
                .execute(&self.pool)
                .await
                .map_err(|e| DataError::InsertError(e.to_string()))?;
            total_inserted += result.rows_affected() as usize;
        }

        debug!(table = %target, rows = total_inserted, "웨어하우스 적재");
        Ok(total_inserted)
    }
}

/// 데이터 종류별 적재 컬럼.
fn columns(kind: DataKind) -> &'static [&'static str] {
    match kind {
        DataKind::Prices => &[
            "ticker",
            "date",
            "open",
            "high",
            "low",
            "close",
            "volume",
            "sector",
            "industry",
            "last_updated",
        ],
        DataKind::Dividends => &["ticker", "date", "dividend", "last_updated"],
        DataKind::Sentiment => &[
            "ticker",
            "title",
            "source",
            "published_at",
            "sentiment_date",
            "sentiment_score",
            "sentiment_label",
            "relevance_score",
            "last_updated",
        ],
    }
}

/// 다중 행 INSERT 구성: `VALUES ($1, $2, ...), ($n+1, ...), ...`
fn build_insert_sql(target: &str, kind: DataKind, rows: usize) -> String {
    let cols = columns(kind);
    let width = cols.len();

    let value_tuples: Vec<String> = (0..rows)
        .map(|i| {
            let base = i * width;
            let placeholders: Vec<String> = (1..=width).map(|j| format!("${}", base + j)).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        target,
        cols.join(", "),
        value_tuples.join(", ")
    )
}
