//! 웨어하우스 참조 테이블 기반 유니버스.

use async_trait::async_trait;
use ingest_core::TickerSymbol;
use sqlx::PgPool;
use tracing::{info, warn};

use super::UniverseSource;
use crate::storage::warehouse::quote_identifier;
use crate::Result;

/// 참조 테이블에서 활성 행의 티커를 조회하는 소스.
///
/// `SELECT DISTINCT ticker FROM <schema>.<table> WHERE active` 형태로 조회합니다.
pub struct ReferenceTableSource {
    pool: PgPool,
    schema: String,
    table: String,
    ticker_column: String,
    active_column: String,
}

impl ReferenceTableSource {
    pub fn new(pool: PgPool, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            table: table.into(),
            ticker_column: "ticker".to_string(),
            active_column: "active".to_string(),
        }
    }

    /// 티커/활성 컬럼명 변경.
    pub fn with_columns(
        mut self,
        ticker_column: impl Into<String>,
        active_column: impl Into<String>,
    ) -> Self {
        self.ticker_column = ticker_column.into();
        self.active_column = active_column.into();
        self
    }

    fn query(&self) -> Result<String> {
        let ticker = quote_identifier(&self.ticker_column)?;
        Ok(format!(
            "SELECT DISTINCT {ticker} FROM {}.{} WHERE {} = TRUE AND {ticker} IS NOT NULL ORDER BY {ticker}",
            quote_identifier(&self.schema)?,
            quote_identifier(&self.table)?,
            quote_identifier(&self.active_column)?,
        ))
    }
}

#[async_trait]
impl UniverseSource for ReferenceTableSource {
    fn name(&self) -> &str {
        "reference_table"
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerSymbol>> {
        let sql = self.query()?;
        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        let tickers: Vec<TickerSymbol> = rows
            .into_iter()
            .filter_map(|(raw,)| match TickerSymbol::parse(&raw) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(raw = %raw, error = %e, "잘못된 티커 무시");
                    None
                }
            })
            .collect();

        info!(
            schema = %self.schema,
            table = %self.table,
            count = tickers.len(),
            "참조 테이블 티커 조회 완료"
        );
        Ok(tickers)
    }
}
