//! Alpha Vantage 뉴스 감성 Provider.
//!
//! `NEWS_SENTIMENT` 엔드포인트에서 티커별 뉴스 피드와 감성 점수를 조회합니다.
//!
//! Alpha Vantage는 요청 한도를 초과해도 HTTP 200과 함께 `Information`/`Note`
//! 필드만 반환하므로, 이를 `RateLimited`로 분류하여 재시도 대상으로 만듭니다.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use ingest_core::{DataKind, ObservationRecord, ObservationWindow, SentimentItem, TickerSymbol};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::ObservationProvider;
use crate::{DataError, Result};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const FEED_LIMIT: &str = "1000";

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    feed: Option<Vec<FeedItem>>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    title: Option<String>,
    source: Option<String>,
    time_published: Option<String>,
    #[serde(default)]
    overall_sentiment_score: Option<Value>,
    overall_sentiment_label: Option<String>,
    #[serde(default)]
    ticker_sentiment: Vec<TickerSentiment>,
}

#[derive(Debug, Deserialize)]
struct TickerSentiment {
    ticker: Option<String>,
    #[serde(default)]
    relevance_score: Option<Value>,
}

/// Alpha Vantage 뉴스 감성 Provider.
pub struct AlphaVantageSentimentProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl AlphaVantageSentimentProvider {
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// API 엔드포인트 변경 (테스트/프록시용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ObservationProvider for AlphaVantageSentimentProvider {
    fn name(&self) -> &str {
        "alpha_vantage_news"
    }

    fn kind(&self) -> DataKind {
        DataKind::Sentiment
    }

    async fn fetch(
        &self,
        ticker: &TickerSymbol,
        window: &ObservationWindow,
    ) -> Result<Vec<ObservationRecord>> {
        let time_from = format!("{}T0000", window.start_date().format("%Y%m%d"));
        let time_to = format!("{}T2359", window.end_date().format("%Y%m%d"));

        debug!(ticker = %ticker, window = %window, "Alpha Vantage 뉴스 감성 조회");

        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("tickers", ticker.as_str()),
                ("time_from", time_from.as_str()),
                ("time_to", time_to.as_str()),
                ("limit", FEED_LIMIT),
                ("apikey", self.api_key.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::from_status(
                status,
                format!("뉴스 감성 조회 실패 ({})", ticker),
            ));
        }

        let body: NewsResponse = response.json().await?;
        parse_news_response(ticker, window, body)
    }
}

fn parse_news_response(
    ticker: &TickerSymbol,
    window: &ObservationWindow,
    body: NewsResponse,
) -> Result<Vec<ObservationRecord>> {
    if let Some(message) = body.error_message {
        return Err(DataError::FetchError(format!("Alpha Vantage 오류 ({}): {}", ticker, message)));
    }

    let feed = match body.feed {
        Some(feed) => feed,
        None => {
            let notice = body.information.or(body.note).unwrap_or_default();
            return Err(if is_rate_limit_notice(&notice) {
                DataError::RateLimited(notice)
            } else {
                DataError::InvalidData(format!("feed 필드 없음 ({}): {}", ticker, notice))
            });
        }
    };

    let records = feed
        .into_iter()
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.trim().is_empty())?;
            let published_at = item.time_published.as_deref().and_then(parse_time_published);

            // 게시일이 있으면 관측 기간 내 항목만 사용
            if let Some(ts) = published_at {
                if !window.contains(ts.date_naive()) {
                    return None;
                }
            }

            let relevance = item
                .ticker_sentiment
                .iter()
                .find(|s| s.ticker.as_deref() == Some(ticker.as_str()))
                .or_else(|| item.ticker_sentiment.first())
                .and_then(|s| lenient_f64(s.relevance_score.as_ref()));

            Some(ObservationRecord::sentiment(
                ticker.clone(),
                SentimentItem {
                    title,
                    source: item.source,
                    published_at,
                    sentiment_score: lenient_f64(item.overall_sentiment_score.as_ref()),
                    sentiment_label: item.overall_sentiment_label,
                    relevance_score: relevance,
                },
            ))
        })
        .collect();

    Ok(records)
}

fn is_rate_limit_notice(notice: &str) -> bool {
    let lower = notice.to_lowercase();
    lower.contains("rate limit") || lower.contains("call frequency") || lower.contains("requests per")
}

/// `YYYYMMDDTHHMMSS` 또는 `YYYYMMDDTHHMM` 형식 파싱 (UTC).
fn parse_time_published(raw: &str) -> Option<chrono::DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// 숫자 또는 숫자 문자열을 f64로 변환.
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
