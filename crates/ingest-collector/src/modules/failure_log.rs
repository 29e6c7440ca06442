//! 실패 로그 집계.
//!
//! 티커별 빈 결과/실패를 메모리에 모아 두었다가 실행 종료 시 한 번에
//! 로그 오브젝트 뒤에 추가합니다. 기존 로그는 덮어쓰지 않습니다.

use chrono::{DateTime, Utc};
use ingest_core::{DataKind, TickerSymbol};
use ingest_data::{DataError, ObjectStore};
use tracing::info;

use crate::error::CollectorError;
use crate::Result;

const LOG_CONTENT_TYPE: &str = "text/plain";

/// 실패 로그 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLogEntry {
    pub run_timestamp: DateTime<Utc>,
    pub ticker: TickerSymbol,
    pub reason: String,
}

impl FailureLogEntry {
    pub fn new(run_timestamp: DateTime<Utc>, ticker: TickerSymbol, reason: impl Into<String>) -> Self {
        Self {
            run_timestamp,
            ticker,
            reason: reason.into(),
        }
    }

    /// 데이터 없음: `No <label> data for <TICKER> on <date>`
    pub fn no_data(
        run_timestamp: DateTime<Utc>,
        ticker: TickerSymbol,
        kind: DataKind,
        observed: impl std::fmt::Display,
    ) -> Self {
        let reason = format!("No {} data for {} on {}", kind.label(), ticker, observed);
        Self::new(run_timestamp, ticker, reason)
    }

    /// 조회/저장 실패
    pub fn failed(
        run_timestamp: DateTime<Utc>,
        ticker: TickerSymbol,
        kind: DataKind,
        error: impl std::fmt::Display,
    ) -> Self {
        let reason = format!("Failed to load {} data for {}: {}", kind.label(), ticker, error);
        Self::new(run_timestamp, ticker, reason)
    }

    /// 로그 한 줄: `<run_date> - <reason>`
    pub fn line(&self) -> String {
        let reason = self.reason.replace(['\r', '\n'], " ");
        format!("{} - {}", self.run_timestamp.format("%Y-%m-%d"), reason)
    }
}

/// 실패 로그 집계기
///
/// `flush`는 `self`를 소비하므로 실행당 최대 한 번만 호출됩니다.
pub struct FailureAggregator<'a> {
    store: &'a dyn ObjectStore,
    key: String,
    entries: Vec<FailureLogEntry>,
}

impl<'a> FailureAggregator<'a> {
    pub fn new(store: &'a dyn ObjectStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: FailureLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FailureLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 기존 로그를 읽어 (없으면 빈 로그) 새 항목을 덧붙여 기록
    ///
    /// 기록한 항목 수를 반환합니다. 항목이 없으면 아무것도 쓰지 않습니다.
    pub async fn flush(self) -> Result<usize> {
        if self.entries.is_empty() {
            return Ok(0);
        }

        let prior = match self.store.get(&self.key).await {
            Ok(Some(bytes)) => String::from_utf8(bytes).map_err(|e| CollectorError::SinkWrite {
                key: self.key.clone(),
                source: DataError::InvalidData(format!("기존 로그가 UTF-8이 아닙니다: {}", e)),
            })?,
            Ok(None) => String::new(),
            Err(e) if e.is_not_found() => String::new(),
            Err(source) => {
                return Err(CollectorError::SinkWrite {
                    key: self.key.clone(),
                    source,
                })
            }
        };

        let new_lines: Vec<String> = self.entries.iter().map(FailureLogEntry::line).collect();
        let combined = combine_log(&prior, &new_lines);

        self.store
            .put(&self.key, combined.into_bytes(), LOG_CONTENT_TYPE)
            .await
            .map_err(|source| CollectorError::SinkWrite {
                key: self.key.clone(),
                source,
            })?;

        info!(key = %self.key, entries = new_lines.len(), "실패 로그 추가 완료");
        Ok(new_lines.len())
    }
}

/// 기존 로그 뒤에 새 줄 추가 (끝은 항상 개행)
fn combine_log(prior: &str, new_lines: &[String]) -> String {
    let prior = prior.trim_end();
    let appended = new_lines.join("\n");
    if prior.is_empty() {
        format!("{}\n", appended)
    } else {
        format!("{}\n{}\n", prior, appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn run_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 13, 5, 0).unwrap()
    }

    #[test]
    fn test_no_data_line() {
        let entry = FailureLogEntry::no_data(
            run_ts(),
            TickerSymbol::parse("MSFT").unwrap(),
            DataKind::Dividends,
            NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
        );
        assert_eq!(entry.line(), "2024-06-10 - No dividend data for MSFT on 2024-06-07");
    }

    #[test]
    fn test_failed_line_is_single_line() {
        let entry = FailureLogEntry::failed(
            run_ts(),
            TickerSymbol::parse("KO").unwrap(),
            DataKind::Prices,
            "HTTP 503:\nservice unavailable",
        );
        let line = entry.line();
        assert!(!line.contains('\n'));
        assert!(line.starts_with("2024-06-10 - Failed to load price data for KO"));
    }

    #[test]
    fn test_combine_log() {
        let lines = vec!["b".to_string(), "c".to_string()];
        assert_eq!(combine_log("", &lines), "b\nc\n");
        assert_eq!(combine_log("a\n", &lines), "a\nb\nc\n");
        assert_eq!(combine_log("a", &lines), "a\nb\nc\n");
        assert_eq!(combine_log("\n\n", &lines), "b\nc\n");
    }
}
