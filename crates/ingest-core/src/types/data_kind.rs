//! 수집 대상 데이터 종류.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 수집 데이터 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// 일봉 가격 데이터
    Prices,
    /// 배당 이벤트
    Dividends,
    /// 뉴스 감성 데이터
    Sentiment,
}

impl DataKind {
    /// 저장 키와 CLI에서 사용하는 이름 (복수형).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prices => "prices",
            Self::Dividends => "dividends",
            Self::Sentiment => "sentiment",
        }
    }

    /// 로그 메시지용 단수형 이름 (예: "No dividend data for ...").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Prices => "price",
            Self::Dividends => "dividend",
            Self::Sentiment => "sentiment",
        }
    }

    /// 모든 데이터 종류.
    pub fn all() -> [DataKind; 3] {
        [Self::Prices, Self::Dividends, Self::Sentiment]
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prices" | "price" => Ok(Self::Prices),
            "dividends" | "dividend" => Ok(Self::Dividends),
            "sentiment" | "sentiments" => Ok(Self::Sentiment),
            _ => Err(format!("Unknown data kind: {}", s)),
        }
    }
}
