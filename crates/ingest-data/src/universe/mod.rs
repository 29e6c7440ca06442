//! 티커 유니버스 소스.
//!
//! - `ReferenceTableSource`: 웨어하우스 참조 테이블의 활성 티커
//! - `IndexListingSource`: 공개 지수 구성종목 페이지(HTML 표)의 지정 컬럼
//! - `StaticListSource`: 명시적으로 지정된 티커 목록

pub mod index_listing;
pub mod reference_table;

use async_trait::async_trait;
use ingest_core::TickerSymbol;

use crate::{DataError, Result};

pub use index_listing::{parse_index_table, IndexListingSource};
pub use reference_table::ReferenceTableSource;

/// 티커 유니버스 소스 trait.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// 소스 이름.
    fn name(&self) -> &str;

    /// 소스에서 티커 목록 조회 (소스 순서 유지, 중복 제거 전).
    async fn fetch_tickers(&self) -> Result<Vec<TickerSymbol>>;
}

/// 명시적으로 지정된 티커 목록.
pub struct StaticListSource {
    tickers: Vec<String>,
}

impl StaticListSource {
    pub fn new(tickers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
        }
    }

    /// 쉼표로 구분된 문자열에서 생성 (예: "AAPL,MSFT").
    pub fn from_csv_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        )
    }
}

#[async_trait]
impl UniverseSource for StaticListSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerSymbol>> {
        self.tickers
            .iter()
            .map(|raw| {
                TickerSymbol::parse(raw).map_err(|e| DataError::InvalidData(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_list_from_csv() {
        let source = StaticListSource::from_csv_list(" aapl, MSFT ,,ko");
        let tickers = source.fetch_tickers().await.unwrap();
        let names: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["AAPL", "MSFT", "KO"]);
    }

    #[tokio::test]
    async fn test_static_list_rejects_invalid() {
        let source = StaticListSource::new(["AAPL", "BAD TICKER"]);
        assert!(source.fetch_tickers().await.is_err());
    }
}
