//! Yahoo Finance Provider.
//!
//! 일봉 가격과 배당 이벤트를 Yahoo Finance chart API에서 조회합니다.
//! 가격 데이터는 요청 시 quoteSummary의 섹터/업종 정보로 보강되며,
//! 보강 실패 시 "unknown"으로 대체합니다 (티커 실패로 처리하지 않음).

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use ingest_core::{
    DataKind, DividendEvent, ObservationRecord, ObservationWindow, PriceBar, TickerSymbol,
    UNKNOWN_CLASSIFICATION,
};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api::{YahooConnector, YahooError};

use super::ObservationProvider;
use crate::{DataError, Result};

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const DAILY_INTERVAL: &str = "1d";
const PRICE_SCALE: u32 = 6;

/// 회사 분류 정보 (섹터/업종).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyProfile {
    pub sector: String,
    pub industry: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            sector: UNKNOWN_CLASSIFICATION.to_string(),
            industry: UNKNOWN_CLASSIFICATION.to_string(),
        }
    }
}

// =============================================================================
// 가격 Provider
// =============================================================================

/// Yahoo Finance 일봉 가격 Provider.
pub struct YahooPriceProvider {
    connector: YahooConnector,
    client: Client,
    profile_url: String,
    enrich_profile: bool,
}

impl YahooPriceProvider {
    /// 섹터/업종 보강을 포함한 Provider 생성.
    pub fn new(timeout: Duration) -> Result<Self> {
        let connector = YahooConnector::new()
            .map_err(|e| DataError::ConnectionError(format!("Yahoo Finance 연결 실패: {}", e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            connector,
            client,
            profile_url: QUOTE_SUMMARY_URL.to_string(),
            enrich_profile: true,
        })
    }

    /// 섹터/업종 보강 여부 설정.
    pub fn with_profile_enrichment(mut self, enabled: bool) -> Self {
        self.enrich_profile = enabled;
        self
    }

    /// quoteSummary 엔드포인트 변경 (테스트/프록시용).
    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = url.into();
        self
    }

    /// 섹터/업종 조회.
    pub async fn fetch_profile(&self, ticker: &TickerSymbol) -> Result<CompanyProfile> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Envelope {
            quote_summary: QuoteSummary,
        }

        #[derive(Deserialize)]
        struct QuoteSummary {
            #[serde(default)]
            result: Option<Vec<SummaryResult>>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SummaryResult {
            asset_profile: Option<AssetProfile>,
        }

        #[derive(Deserialize)]
        struct AssetProfile {
            sector: Option<String>,
            industry: Option<String>,
        }

        let url = format!("{}/{}", self.profile_url.trim_end_matches('/'), ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("modules", "assetProfile")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::from_status(
                status,
                format!("quoteSummary 조회 실패 ({})", ticker),
            ));
        }

        let envelope: Envelope = response.json().await?;
        let profile = envelope
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.asset_profile);

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(match profile {
            Some(p) => CompanyProfile {
                sector: non_empty(p.sector).unwrap_or_else(|| UNKNOWN_CLASSIFICATION.to_string()),
                industry: non_empty(p.industry)
                    .unwrap_or_else(|| UNKNOWN_CLASSIFICATION.to_string()),
            },
            None => CompanyProfile::default(),
        })
    }

    /// 보강이 활성화된 경우 섹터/업종 조회, 실패 시 "unknown".
    async fn profile_or_unknown(&self, ticker: &TickerSymbol) -> CompanyProfile {
        if !self.enrich_profile {
            return CompanyProfile::default();
        }
        match self.fetch_profile(ticker).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "섹터/업종 조회 실패, unknown 사용");
                CompanyProfile::default()
            }
        }
    }
}

#[async_trait]
impl ObservationProvider for YahooPriceProvider {
    fn name(&self) -> &str {
        "yahoo_prices"
    }

    fn kind(&self) -> DataKind {
        DataKind::Prices
    }

    async fn fetch(
        &self,
        ticker: &TickerSymbol,
        window: &ObservationWindow,
    ) -> Result<Vec<ObservationRecord>> {
        let start = to_offset_datetime(window.start_date())?;
        let end = to_offset_datetime(window.exclusive_end())?;

        debug!(ticker = %ticker, window = %window, "Yahoo Finance 가격 조회");

        let response = self
            .connector
            .get_quote_history_interval(ticker.as_str(), start, end, DAILY_INTERVAL)
            .await
            .map_err(|e| map_yahoo_error(ticker, e))?;

        let quotes = response
            .quotes()
            .map_err(|e| map_yahoo_error(ticker, e))?;

        let mut bars: Vec<PriceBar> = Vec::with_capacity(quotes.len());
        for q in &quotes {
            let Some(date) = timestamp_to_date(q.timestamp as i64) else {
                continue;
            };
            if !window.contains(date) {
                continue;
            }
            let (Some(open), Some(high), Some(low), Some(close)) =
                (to_price(q.open), to_price(q.high), to_price(q.low), to_price(q.close))
            else {
                debug!(ticker = %ticker, date = %date, "가격 값 누락, 건너뜀");
                continue;
            };
            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: i64::try_from(q.volume).unwrap_or(i64::MAX),
                sector: String::new(),
                industry: String::new(),
            });
        }

        if bars.is_empty() {
            return Ok(Vec::new());
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        let profile = self.profile_or_unknown(ticker).await;

        Ok(bars
            .into_iter()
            .map(|mut bar| {
                bar.sector = profile.sector.clone();
                bar.industry = profile.industry.clone();
                ObservationRecord::price_bar(ticker.clone(), bar)
            })
            .collect())
    }
}

// =============================================================================
// 배당 Provider
// =============================================================================

/// Yahoo Finance 배당 Provider.
pub struct YahooDividendProvider {
    connector: YahooConnector,
}

impl YahooDividendProvider {
    pub fn new() -> Result<Self> {
        let connector = YahooConnector::new()
            .map_err(|e| DataError::ConnectionError(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }
}

#[async_trait]
impl ObservationProvider for YahooDividendProvider {
    fn name(&self) -> &str {
        "yahoo_dividends"
    }

    fn kind(&self) -> DataKind {
        DataKind::Dividends
    }

    async fn fetch(
        &self,
        ticker: &TickerSymbol,
        window: &ObservationWindow,
    ) -> Result<Vec<ObservationRecord>> {
        let start = to_offset_datetime(window.start_date())?;
        let end = to_offset_datetime(window.exclusive_end())?;

        debug!(ticker = %ticker, window = %window, "Yahoo Finance 배당 조회");

        let response = self
            .connector
            .get_quote_history_interval(ticker.as_str(), start, end, DAILY_INTERVAL)
            .await
            .map_err(|e| map_yahoo_error(ticker, e))?;

        let dividends = response
            .dividends()
            .map_err(|e| map_yahoo_error(ticker, e))?;

        let mut events: Vec<DividendEvent> = dividends
            .iter()
            .filter_map(|d| {
                let date = timestamp_to_date(d.date as i64)?;
                let amount = Decimal::from_f64(d.amount)?.round_dp(PRICE_SCALE).normalize();
                window.contains(date).then_some(DividendEvent { date, amount })
            })
            .collect();

        events.sort_by_key(|e| e.date);

        Ok(events
            .into_iter()
            .map(|event| ObservationRecord::dividend(ticker.clone(), event))
            .collect())
    }
}

// =============================================================================
// 변환 헬퍼
// =============================================================================

/// NaiveDate를 UTC 자정 OffsetDateTime으로 변환.
fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| DataError::InvalidData(format!("월 변환 실패 ({}): {}", date, e)))?;
    let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| DataError::InvalidData(format!("날짜 변환 실패 ({}): {}", date, e)))?;
    Ok(day.midnight().assume_utc())
}

/// Yahoo 에러를 `DataError`로 분류.
///
/// 빈 데이터 응답은 `NotFound`(빈 결과), 요청 한도와 연결 실패는 재시도 가능한 에러로 변환합니다.
fn map_yahoo_error(ticker: &TickerSymbol, err: YahooError) -> DataError {
    match err {
        YahooError::NoQuotes | YahooError::NoResult => {
            DataError::NotFound(format!("Yahoo Finance 데이터 없음 ({})", ticker))
        }
        YahooError::TooManyRequests(during) => {
            DataError::RateLimited(format!("Yahoo Finance 요청 한도 초과 ({}): {}", ticker, during))
        }
        YahooError::ConnectionFailed(e) => {
            DataError::ConnectionError(format!("Yahoo Finance 연결 실패 ({}): {}", ticker, e))
        }
        YahooError::NoResponse => {
            DataError::ConnectionError(format!("Yahoo Finance 응답 없음 ({})", ticker))
        }
        other => DataError::FetchError(format!("Yahoo Finance API 오류 ({}): {}", ticker, other)),
    }
}

/// 유닉스 타임스탬프(초)를 UTC 날짜로 변환.
fn timestamp_to_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

fn to_price(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(PRICE_SCALE).normalize())
}
