//! 공개 지수 구성종목 페이지 기반 유니버스.
//!
//! 지수 구성종목 HTML 표(예: S&P 500 위키백과 목록)에서 지정된 헤더의
//! 컬럼을 추출합니다. 헤더가 있는 첫 번째 표를 사용합니다.

use async_trait::async_trait;
use ingest_core::TickerSymbol;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{info, warn};

use super::UniverseSource;
use crate::{DataError, Result};

/// S&P 500 구성종목 목록.
pub const SP500_LISTING_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// 지수 구성종목 페이지 소스.
pub struct IndexListingSource {
    client: Client,
    url: String,
    column: String,
}

impl IndexListingSource {
    pub fn new(url: impl Into<String>, column: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            column: column.into(),
        })
    }

    /// S&P 500 목록의 `Symbol` 컬럼.
    pub fn sp500(timeout: Duration) -> Result<Self> {
        Self::new(SP500_LISTING_URL, "Symbol", timeout)
    }
}

#[async_trait]
impl UniverseSource for IndexListingSource {
    fn name(&self) -> &str {
        "index_listing"
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerSymbol>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::from_status(
                status,
                format!("지수 구성종목 페이지 조회 실패: {}", self.url),
            ));
        }
        let html = response.text().await?;

        let raw = parse_index_table(&html, &self.column)?;
        let tickers: Vec<TickerSymbol> = raw
            .iter()
            .filter_map(|s| match TickerSymbol::parse(&normalize_share_class(s)) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(raw = %s, error = %e, "잘못된 티커 무시");
                    None
                }
            })
            .collect();

        info!(url = %self.url, count = tickers.len(), "지수 구성종목 조회 완료");
        Ok(tickers)
    }
}

/// HTML에서 `column` 헤더를 가진 첫 번째 표의 해당 컬럼 값 추출.
///
/// 헤더를 찾지 못하거나 값이 하나도 없으면 `InvalidData`를 반환합니다.
pub fn parse_index_table(html: &str, column: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let cell_sel = selector("td, th")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header_row) = rows.next() else {
            continue;
        };
        let Some(index) = header_row
            .select(&th_sel)
            .position(|th| cell_text(&th).eq_ignore_ascii_case(column))
        else {
            continue;
        };

        let values: Vec<String> = rows
            .filter_map(|row| row.select(&cell_sel).nth(index))
            .map(|cell| cell_text(&cell))
            .filter(|v| !v.is_empty())
            .collect();

        if values.is_empty() {
            return Err(DataError::InvalidData(format!(
                "'{}' 컬럼에 값이 없습니다",
                column
            )));
        }
        return Ok(values);
    }

    Err(DataError::InvalidData(format!(
        "'{}' 컬럼을 가진 표를 찾을 수 없습니다",
        column
    )))
}

/// 클래스 주식 표기 정규화 (BRK.B → BRK-B, Yahoo 형식).
fn normalize_share_class(raw: &str) -> String {
    raw.trim().replace('.', "-")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DataError::ParseError(format!("selector '{}': {:?}", css, e)))
}

fn cell_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <table class="infobox"><tr><td>not this one</td></tr></table>
          <table class="wikitable" id="constituents">
            <tbody>
              <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th></tr>
              <tr><td><a href="/aapl">AAPL</a></td><td>Apple Inc.</td><td>Information Technology</td></tr>
              <tr><td>MSFT</td><td>Microsoft</td><td>Information Technology</td></tr>
              <tr><td> BRK.B </td><td>Berkshire Hathaway</td><td>Financials</td></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_symbol_column() {
        let values = parse_index_table(LISTING, "Symbol").unwrap();
        assert_eq!(values, vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[test]
    fn test_parse_other_column_case_insensitive() {
        let values = parse_index_table(LISTING, "gics sector").unwrap();
        assert_eq!(values[0], "Information Technology");
    }

    #[test]
    fn test_missing_column() {
        let err = parse_index_table(LISTING, "Ticker").unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
    }

    #[test]
    fn test_normalize_share_class() {
        assert_eq!(normalize_share_class("BRK.B"), "BRK-B");
        assert_eq!(normalize_share_class(" AAPL "), "AAPL");
    }

    #[tokio::test]
    async fn test_fetch_tickers_from_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/sp500")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(LISTING)
            .create_async()
            .await;

        let source = IndexListingSource::new(
            format!("{}/sp500", server.url()),
            "Symbol",
            Duration::from_secs(5),
        )
        .unwrap();
        let tickers = source.fetch_tickers().await.unwrap();
        let names: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["AAPL", "MSFT", "BRK-B"]);
    }

    #[tokio::test]
    async fn test_fetch_tickers_unreachable_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/sp500")
            .with_status(500)
            .create_async()
            .await;

        let source = IndexListingSource::new(
            format!("{}/sp500", server.url()),
            "Symbol",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(source.fetch_tickers().await.is_err());
    }
}
