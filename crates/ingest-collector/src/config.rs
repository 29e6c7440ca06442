//! 환경변수 기반 설정 모듈.
//!
//! 필수 키가 하나라도 없으면 네트워크 I/O 이전에 `CollectorError::Config`로
//! 실패하며, 누락된 키를 모두 한 번에 보고합니다.

use crate::error::CollectorError;
use crate::modules::fetcher::RetryPolicy;
use crate::Result;
use ingest_core::{DataKind, DEFAULT_LOOKBACK_DAYS};
use ingest_data::storage::warehouse::quote_identifier;
use ingest_data::universe::index_listing::SP500_LISTING_URL;
use ingest_data::S3Config;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 적재 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LoadMode {
    /// 직전 거래일 증분 수집 (오브젝트 존재 시 건너뜀)
    Incremental,
    /// 최근 N년 전체 재적재 (대상 테이블 초기화 후 적재)
    Full,
}

impl LoadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 오브젝트 스토어 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStoreBackend {
    S3,
    Local,
}

impl FromStr for ObjectStoreBackend {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "local" => Ok(Self::Local),
            other => Err(CollectorError::Config(format!(
                "OBJECT_STORE_BACKEND는 s3 또는 local이어야 합니다: '{}'",
                other
            ))),
        }
    }
}

/// Collector 전체 설정
#[derive(Debug)]
pub struct CollectorConfig {
    /// 웨어하우스 데이터베이스 URL
    pub database_url: SecretString,
    /// 웨어하우스 스키마
    pub warehouse_schema: String,
    /// 유니버스 설정
    pub universe: UniverseConfig,
    /// 오브젝트 스토어 설정
    pub object_store: ObjectStoreConfig,
    /// 수집 설정
    pub fetch: FetchConfig,
    /// 데이터 종류별 웨어하우스 테이블
    pub tables: TableNames,
    /// 전체 적재 기간 (년)
    pub history_years: u32,
    /// 직전 거래일 계산 시 조회 일수 (최소 10)
    pub calendar_lookback_days: u32,
    /// 실패 로그 오브젝트 키
    pub failure_log_key: String,
    /// Alpha Vantage API 키 (감성 수집 시에만 필요)
    pub alpha_vantage_api_key: Option<SecretString>,
}

/// 유니버스 설정
#[derive(Debug, Clone)]
pub struct UniverseConfig {
    /// 참조 티커 테이블
    pub ticker_table: String,
    /// 지수 구성종목 페이지 URL
    pub index_url: String,
    /// 지수 구성종목 표의 티커 컬럼
    pub index_column: String,
}

/// 오브젝트 스토어 설정
#[derive(Debug)]
pub struct ObjectStoreConfig {
    pub backend: ObjectStoreBackend,
    pub bucket: String,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<SecretString>,
    /// S3 호환 엔드포인트
    pub endpoint: Option<String>,
    /// local 백엔드 루트 디렉토리 (버킷은 하위 디렉토리)
    pub local_root: PathBuf,
}

/// 수집 설정
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// 배치당 티커 수
    pub batch_size: usize,
    /// 배치 간 대기 시간 (초)
    pub batch_delay_secs: u64,
    /// 티커별 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 티커별 최대 시도 횟수
    pub max_attempts: u32,
    /// 재시도 기본 대기 (밀리초)
    pub backoff_base_ms: u64,
    /// 재시도 최대 대기 (밀리초)
    pub backoff_max_ms: u64,
}

/// 데이터 종류별 웨어하우스 테이블
#[derive(Debug, Clone)]
pub struct TableNames {
    pub prices: String,
    pub prices_daily: String,
    pub dividends: String,
    pub dividends_daily: String,
    pub sentiment: String,
    pub sentiment_daily: String,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로부터 설정 구성
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut missing: Vec<&str> = Vec::new();
        let mut require = |key: &'static str| {
            let value = get(key);
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        };

        let database_url = require("DATABASE_URL");
        let warehouse_schema = require("WAREHOUSE_SCHEMA");
        let ticker_table = require("TICKER_TABLE");
        let bucket = require("OBJECT_STORE_BUCKET");

        let backend: ObjectStoreBackend = get("OBJECT_STORE_BACKEND")
            .as_deref()
            .unwrap_or("s3")
            .parse()?;

        let (region, access_key, secret_key) = match backend {
            ObjectStoreBackend::S3 => (
                Some(require("AWS_REGION")),
                Some(require("AWS_ACCESS_KEY")),
                Some(SecretString::from(require("AWS_SECRET_KEY"))),
            ),
            ObjectStoreBackend::Local => (
                get("AWS_REGION"),
                get("AWS_ACCESS_KEY"),
                get("AWS_SECRET_KEY").map(SecretString::from),
            ),
        };

        if !missing.is_empty() {
            return Err(CollectorError::Config(format!(
                "필수 환경변수가 설정되지 않았습니다: {}",
                missing.join(", ")
            )));
        }

        let tables = TableNames {
            prices: get("PRICES_TABLE").unwrap_or_else(|| "raw_marketdata".to_string()),
            prices_daily: get("PRICES_DAILY_TABLE")
                .unwrap_or_else(|| "raw_marketdata_daily".to_string()),
            dividends: get("DIVIDENDS_TABLE").unwrap_or_else(|| "raw_dividends".to_string()),
            dividends_daily: get("DIVIDENDS_DAILY_TABLE")
                .unwrap_or_else(|| "raw_dividends_daily".to_string()),
            sentiment: get("SENTIMENT_TABLE").unwrap_or_else(|| "raw_sentiments".to_string()),
            sentiment_daily: get("SENTIMENT_DAILY_TABLE")
                .unwrap_or_else(|| "raw_sentiments_daily".to_string()),
        };

        // SQL 식별자는 실행 전에 검증
        for identifier in [
            &warehouse_schema,
            &ticker_table,
            &tables.prices,
            &tables.prices_daily,
            &tables.dividends,
            &tables.dividends_daily,
            &tables.sentiment,
            &tables.sentiment_daily,
        ] {
            quote_identifier(identifier).map_err(|e| CollectorError::Config(e.to_string()))?;
        }

        let fetch = FetchConfig {
            batch_size: parse_or(&get, "BATCH_SIZE", 50usize).max(1),
            batch_delay_secs: parse_or(&get, "BATCH_DELAY_SECS", 30),
            timeout_secs: parse_or(&get, "FETCH_TIMEOUT_SECS", 30u64).max(1),
            max_attempts: parse_or(&get, "FETCH_MAX_ATTEMPTS", 3u32).max(1),
            backoff_base_ms: parse_or(&get, "FETCH_BACKOFF_BASE_MS", 500),
            backoff_max_ms: parse_or(&get, "FETCH_BACKOFF_MAX_MS", 8000),
        };

        Ok(Self {
            database_url: SecretString::from(database_url),
            warehouse_schema,
            universe: UniverseConfig {
                ticker_table,
                index_url: get("UNIVERSE_INDEX_URL")
                    .unwrap_or_else(|| SP500_LISTING_URL.to_string()),
                index_column: get("UNIVERSE_INDEX_COLUMN").unwrap_or_else(|| "Symbol".to_string()),
            },
            object_store: ObjectStoreConfig {
                backend,
                bucket,
                region,
                access_key,
                secret_key,
                endpoint: get("OBJECT_STORE_ENDPOINT"),
                local_root: get("LOCAL_STORE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data")),
            },
            fetch,
            tables,
            history_years: parse_or(&get, "HISTORY_YEARS", 5u32).max(1),
            calendar_lookback_days: parse_or(&get, "CALENDAR_LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS)
                .max(DEFAULT_LOOKBACK_DAYS),
            failure_log_key: get("FAILURE_LOG_KEY")
                .unwrap_or_else(|| "logs/no_data_log.txt".to_string()),
            alpha_vantage_api_key: get("ALPHA_VANTAGE_API_KEY").map(SecretString::from),
        })
    }

    /// 감성 수집용 API 키 (없으면 설정 에러)
    pub fn require_sentiment_key(&self) -> Result<&SecretString> {
        self.alpha_vantage_api_key.as_ref().ok_or_else(|| {
            CollectorError::Config(
                "ALPHA_VANTAGE_API_KEY 환경변수가 설정되지 않았습니다".to_string(),
            )
        })
    }

    /// 데이터 종류의 오브젝트 키 접두사
    pub fn object_prefix(&self, kind: DataKind) -> &'static str {
        kind.as_str()
    }
}

impl ObjectStoreConfig {
    /// S3 백엔드 설정으로 변환
    pub fn s3_config(&self, timeout: Duration) -> Result<S3Config> {
        let missing = || CollectorError::Config("S3 자격증명이 설정되지 않았습니다".to_string());
        Ok(S3Config {
            bucket: self.bucket.clone(),
            region: self.region.clone().ok_or_else(missing)?,
            access_key: self.access_key.clone().ok_or_else(missing)?,
            secret_key: self
                .secret_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_owned()))
                .ok_or_else(missing)?,
            endpoint: self.endpoint.clone(),
            timeout,
        })
    }

    /// local 백엔드 루트 (버킷 포함)
    pub fn local_bucket_root(&self) -> PathBuf {
        self.local_root.join(&self.bucket)
    }
}

impl FetchConfig {
    /// 배치 간 대기 시간을 Duration으로 반환
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    /// 티커별 요청 타임아웃을 Duration으로 반환
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 재시도 정책
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

impl TableNames {
    /// 데이터 종류/적재 모드별 대상 테이블
    ///
    /// 증분 모드는 일별(`*_daily`) 테이블, 전체 모드는 전체 테이블을 사용합니다.
    pub fn table_for(&self, kind: DataKind, mode: LoadMode) -> &str {
        match (kind, mode) {
            (DataKind::Prices, LoadMode::Full) => &self.prices,
            (DataKind::Prices, LoadMode::Incremental) => &self.prices_daily,
            (DataKind::Dividends, LoadMode::Full) => &self.dividends,
            (DataKind::Dividends, LoadMode::Incremental) => &self.dividends_daily,
            (DataKind::Sentiment, LoadMode::Full) => &self.sentiment,
            (DataKind::Sentiment, LoadMode::Incremental) => &self.sentiment_daily,
        }
    }
}

/// 값을 파싱 (없거나 실패 시 기본값 사용)
fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
