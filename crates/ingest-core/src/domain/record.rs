//! 관측 레코드.
//!
//! 수집된 데이터 한 건을 나타냅니다. 레코드는 항상 소유 티커를 가지며
//! 한 번 수집된 후에는 변경되지 않습니다.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DataKind, TickerSymbol};

/// 섹터/업종 정보를 가져오지 못했을 때 사용하는 값.
pub const UNKNOWN_CLASSIFICATION: &str = "unknown";

/// 일봉 가격 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    /// 섹터 (조회 실패 시 "unknown")
    pub sector: String,
    /// 업종 (조회 실패 시 "unknown")
    pub industry: String,
}

/// 배당 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub date: NaiveDate,
    /// 주당 배당금
    pub amount: Decimal,
}

/// 뉴스 감성 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentItem {
    pub title: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<String>,
    pub relevance_score: Option<f64>,
}

impl SentimentItem {
    /// 게시일 (감성 날짜).
    pub fn sentiment_date(&self) -> Option<NaiveDate> {
        self.published_at.map(|ts| ts.date_naive())
    }
}

/// 데이터 종류별 관측값.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    PriceBar(PriceBar),
    DividendEvent(DividendEvent),
    SentimentItem(SentimentItem),
}

impl Observation {
    /// 관측값의 데이터 종류.
    pub fn kind(&self) -> DataKind {
        match self {
            Self::PriceBar(_) => DataKind::Prices,
            Self::DividendEvent(_) => DataKind::Dividends,
            Self::SentimentItem(_) => DataKind::Sentiment,
        }
    }

    /// 관측 날짜 (감성 데이터는 게시일).
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::PriceBar(bar) => Some(bar.date),
            Self::DividendEvent(event) => Some(event.date),
            Self::SentimentItem(item) => item.sentiment_date(),
        }
    }
}

/// 티커 하나에 대한 관측 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub ticker: TickerSymbol,
    pub observation: Observation,
}

impl ObservationRecord {
    pub fn new(ticker: TickerSymbol, observation: Observation) -> Self {
        Self {
            ticker,
            observation,
        }
    }

    pub fn price_bar(ticker: TickerSymbol, bar: PriceBar) -> Self {
        Self::new(ticker, Observation::PriceBar(bar))
    }

    pub fn dividend(ticker: TickerSymbol, event: DividendEvent) -> Self {
        Self::new(ticker, Observation::DividendEvent(event))
    }

    pub fn sentiment(ticker: TickerSymbol, item: SentimentItem) -> Self {
        Self::new(ticker, Observation::SentimentItem(item))
    }

    pub fn kind(&self) -> DataKind {
        self.observation.kind()
    }
}
