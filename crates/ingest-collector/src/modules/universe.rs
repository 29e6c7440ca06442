//! 티커 유니버스 확정.

use ingest_core::{dedup_preserving_order, TickerSymbol};
use ingest_data::UniverseSource;
use tracing::info;

use crate::error::CollectorError;
use crate::Result;

/// 유니버스 소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UniverseKind {
    /// 웨어하우스 참조 테이블 (활성 티커)
    Reference,
    /// 지수 구성종목 페이지
    Index,
    /// `--symbols`로 지정한 목록
    Static,
}

/// 소스에서 유니버스를 조회해 중복을 제거합니다 (첫 등장 순서 유지).
///
/// 소스 조회 실패나 빈 결과는 `UniverseUnavailable`입니다.
pub async fn resolve_universe(source: &dyn UniverseSource) -> Result<Vec<TickerSymbol>> {
    let raw = source
        .fetch_tickers()
        .await
        .map_err(|e| CollectorError::UniverseUnavailable(format!("{}: {}", source.name(), e)))?;
    let fetched = raw.len();

    let tickers = dedup_preserving_order(raw);
    if tickers.is_empty() {
        return Err(CollectorError::UniverseUnavailable(format!(
            "{}: 티커가 없습니다",
            source.name()
        )));
    }

    info!(
        source = source.name(),
        fetched = fetched,
        unique = tickers.len(),
        "유니버스 확정"
    );
    Ok(tickers)
}
