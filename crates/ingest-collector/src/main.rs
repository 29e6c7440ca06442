//! Market reference data collector CLI.

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use ingest_collector::modules::{
    FixedDelay, Pipeline, PipelineComponents, PipelineSettings, UniverseKind,
};
use ingest_collector::config::ObjectStoreBackend;
use ingest_collector::{CollectorConfig, CollectorError, LoadMode, RunSummary};
use ingest_core::{init_logging, DataKind, LogConfig, NyseCalendar, TradingCalendar};
use ingest_data::storage::object_store::{LocalObjectStore, ObjectStore, S3ObjectStore};
use ingest_data::storage::warehouse::connect_pool;
use ingest_data::{
    AlphaVantageSentimentProvider, IndexListingSource, ObservationProvider, PgWarehouse,
    ReferenceTableSource, StaticListSource, UniverseSource, YahooDividendProvider,
    YahooPriceProvider,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

const MAX_DB_CONNECTIONS: u32 = 5;

#[derive(Parser)]
#[command(name = "ingest-collector")]
#[command(about = "Market reference data collector (dividends, prices, news sentiment)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 배당 이벤트 수집 (Yahoo Finance)
    Dividends(RunArgs),

    /// 일봉 가격 + 섹터/업종 수집 (Yahoo Finance)
    Prices(RunArgs),

    /// 뉴스 감성 수집 (Alpha Vantage, ALPHA_VANTAGE_API_KEY 필요)
    Sentiment(RunArgs),

    /// 기준일의 직전 거래일과 N년 기간 출력 (I/O 없음)
    Calendar {
        /// 기준일 (YYYY-MM-DD, 기본: 뉴욕 기준 오늘)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// 전체 적재 기간 (년)
        #[arg(long, default_value_t = 5)]
        years: u32,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// 적재 모드
    #[arg(long, value_enum, default_value_t = LoadMode::Incremental)]
    mode: LoadMode,

    /// 유니버스 소스
    #[arg(long, value_enum, default_value_t = UniverseKind::Reference)]
    universe: UniverseKind,

    /// 특정 티커만 수집 (쉼표로 구분, 예: "AAPL,MSFT"). 지정 시 static 소스 사용
    #[arg(long)]
    symbols: Option<String>,

    /// 기준일 (YYYY-MM-DD, 기본: 뉴욕 기준 오늘)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::new(&cli.log_level).with_env_format())?;

    let (kind, args) = match cli.command {
        Commands::Calendar { as_of, years } => {
            print_calendar(as_of.unwrap_or_else(today_in_new_york), years)?;
            return Ok(());
        }
        Commands::Dividends(args) => (DataKind::Dividends, args),
        Commands::Prices(args) => (DataKind::Prices, args),
        Commands::Sentiment(args) => (DataKind::Sentiment, args),
    };

    tracing::info!(kind = %kind, mode = %args.mode, "Data Collector 시작");

    // 설정 로드 (네트워크 I/O 이전에 검증)
    let config = CollectorConfig::from_env()?;
    let sentiment_key = match kind {
        DataKind::Sentiment => Some(SecretString::from(
            config.require_sentiment_key()?.expose_secret().to_owned(),
        )),
        _ => None,
    };
    if args.universe == UniverseKind::Static && args.symbols.is_none() {
        return Err(CollectorError::Config("--universe static에는 --symbols가 필요합니다".to_string()).into());
    }
    tracing::debug!(schema = %config.warehouse_schema, "설정 로드 완료");

    // DB 연결 (실행당 한 번, 결과와 무관하게 종료 시 해제)
    let pool = connect_pool(config.database_url.expose_secret(), MAX_DB_CONNECTIONS).await?;
    tracing::info!("데이터베이스 연결 성공");

    let result = run_collection(&config, &pool, kind, &args, sentiment_key).await;

    pool.close().await;
    tracing::info!("Data Collector 종료");

    let summary = result?;
    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "일부 티커 실패, 실패 로그 확인 필요");
    }
    Ok(())
}

async fn run_collection(
    config: &CollectorConfig,
    pool: &PgPool,
    kind: DataKind,
    args: &RunArgs,
    sentiment_key: Option<SecretString>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let timeout = config.fetch.timeout();
    let reference_date = args.as_of.unwrap_or_else(today_in_new_york);

    let universe: Box<dyn UniverseSource> = match (&args.symbols, args.universe) {
        (Some(symbols), _) => Box::new(StaticListSource::from_csv_list(symbols)),
        (None, UniverseKind::Index) => Box::new(IndexListingSource::new(
            config.universe.index_url.clone(),
            config.universe.index_column.clone(),
            timeout,
        )?),
        (None, _) => Box::new(ReferenceTableSource::new(
            pool.clone(),
            config.warehouse_schema.clone(),
            config.universe.ticker_table.clone(),
        )),
    };

    let provider: Box<dyn ObservationProvider> = match (kind, sentiment_key) {
        (DataKind::Prices, _) => Box::new(YahooPriceProvider::new(timeout)?),
        (DataKind::Dividends, _) => Box::new(YahooDividendProvider::new()?),
        (DataKind::Sentiment, Some(key)) => Box::new(AlphaVantageSentimentProvider::new(key, timeout)?),
        (DataKind::Sentiment, None) => {
            return Err(CollectorError::Config(
                "ALPHA_VANTAGE_API_KEY 환경변수가 설정되지 않았습니다".to_string(),
            )
            .into())
        }
    };

    let store: Box<dyn ObjectStore> = match config.object_store.backend {
        ObjectStoreBackend::S3 => Box::new(S3ObjectStore::new(config.object_store.s3_config(timeout)?)?),
        ObjectStoreBackend::Local => {
            Box::new(LocalObjectStore::new(config.object_store.local_bucket_root()))
        }
    };

    let warehouse = PgWarehouse::new(pool.clone(), config.warehouse_schema.clone());
    let calendar = NyseCalendar::new();
    let pacer = FixedDelay(config.fetch.batch_delay());

    let components = PipelineComponents {
        universe: universe.as_ref(),
        calendar: &calendar,
        provider: provider.as_ref(),
        store: store.as_ref(),
        warehouse: &warehouse,
        pacer: &pacer,
    };
    let settings = PipelineSettings::from_config(config, kind, args.mode, reference_date);

    let mut pipeline = Pipeline::new(components, settings);
    Ok(pipeline.run().await?)
}

/// 뉴욕 기준 오늘 날짜
fn today_in_new_york() -> NaiveDate {
    Utc::now()
        .with_timezone(&chrono_tz::America::New_York)
        .date_naive()
}

fn print_calendar(reference: NaiveDate, years: u32) -> Result<(), Box<dyn std::error::Error>> {
    let calendar = NyseCalendar::new();
    let previous = calendar.previous_trading_day(reference)?;
    let window = calendar.window_for_years(reference, years)?;

    println!("calendar:             {}", calendar.name());
    println!("reference date:       {}", reference);
    println!("previous trading day: {}", previous);
    println!("{}-year window:        {}", years, window);
    Ok(())
}
