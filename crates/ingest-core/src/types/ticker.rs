//! 티커 심볼 타입.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// 대문자로 정규화된 티커 심볼 (예: AAPL, BRK-B).
///
/// 한 번의 실행 유니버스 내에서 유일하며 내부 상태를 갖지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// 문자열을 파싱하여 티커 심볼을 생성합니다.
    ///
    /// 앞뒤 공백을 제거하고 대문자로 변환합니다. 빈 문자열이나
    /// 공백/경로 구분자가 포함된 값은 거부합니다.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c.is_control())
        {
            return Err(CoreError::InvalidTicker(raw.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// 문자열 참조 반환.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for TickerSymbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

/// 입력 순서를 유지하면서 중복을 제거합니다.
pub fn dedup_preserving_order(tickers: impl IntoIterator<Item = TickerSymbol>) -> Vec<TickerSymbol> {
    let mut seen = std::collections::HashSet::new();
    tickers
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let ticker = TickerSymbol::parse("  aapl ").unwrap();
        assert_eq!(ticker.as_str(), "AAPL");
        assert_eq!(ticker.to_string(), "AAPL");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(TickerSymbol::parse("").is_err());
        assert!(TickerSymbol::parse("   ").is_err());
        assert!(TickerSymbol::parse("BRK B").is_err());
        assert!(TickerSymbol::parse("../etc").is_err());
    }

    #[test]
    fn test_dedup_preserving_order() {
        let input = ["MSFT", "AAPL", "msft", "KO", "AAPL"]
            .iter()
            .map(|s| TickerSymbol::parse(s).unwrap());
        let deduped: Vec<String> = dedup_preserving_order(input)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(deduped, vec!["MSFT", "AAPL", "KO"]);
    }
}
