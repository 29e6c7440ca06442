//! 저장 키 타입.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DataKind, TickerSymbol};

/// `(ticker, data_kind, as_of_date)`에서 결정적으로 유도되는 저장 식별자.
///
/// 오브젝트 스토어에서는 존재 여부 확인에, 웨어하우스에서는
/// 교체/추가 정책 결정에 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkKey {
    pub ticker: TickerSymbol,
    pub kind: DataKind,
    pub as_of: NaiveDate,
}

impl SinkKey {
    pub fn new(ticker: TickerSymbol, kind: DataKind, as_of: NaiveDate) -> Self {
        Self {
            ticker,
            kind,
            as_of,
        }
    }

    /// 파일명: `<TICKER>_<data_kind>_<YYYY-MM-DD>.csv`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.csv",
            self.ticker,
            self.kind.as_str(),
            self.as_of.format("%Y-%m-%d")
        )
    }

    /// 오브젝트 키: `<prefix>/<TICKER>_<data_kind>_<YYYY-MM-DD>.csv`
    pub fn object_key(&self, prefix: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            self.file_name()
        } else {
            format!("{}/{}", prefix, self.file_name())
        }
    }
}

impl fmt::Display for SinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
