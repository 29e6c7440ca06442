//! 통합 테스트용 인메모리 구성 요소.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ingest_collector::modules::{Immediate, PipelineComponents, PipelineSettings, RetryPolicy};
use ingest_collector::LoadMode;
use ingest_core::{
    CoreResult, DataKind, DividendEvent, ObservationRecord, ObservationWindow, TickerSymbol,
    TradingCalendar,
};
use ingest_data::{DataError, ObjectStore, ObservationProvider, UniverseSource, Warehouse};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn ticker(s: &str) -> TickerSymbol {
    TickerSymbol::parse(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dividend(symbol: &str, on: NaiveDate, amount: Decimal) -> ObservationRecord {
    ObservationRecord::dividend(ticker(symbol), DividendEvent { date: on, amount })
}

/// 2024-06-10 (월) 기준 증분 실행 설정. 직전 거래일은 2024-06-07 (금).
pub fn incremental_settings() -> PipelineSettings {
    let mut settings = PipelineSettings::new(DataKind::Dividends, LoadMode::Incremental, date(2024, 6, 10));
    settings.batch_size = 2;
    settings.retry = RetryPolicy::none();
    settings.full_table = "raw_dividends".to_string();
    settings.daily_table = Some("raw_dividends_daily".to_string());
    settings
}

pub fn full_settings() -> PipelineSettings {
    let mut settings = incremental_settings();
    settings.mode = LoadMode::Full;
    settings.history_years = 1;
    settings
}

// =============================================================================
// Provider
// =============================================================================

/// 티커별 고정 응답 Provider
pub struct MemoryProvider {
    kind: DataKind,
    data: Mutex<HashMap<String, Vec<ObservationRecord>>>,
    /// 티커별로 먼저 반환할 에러 (호출마다 하나씩 소비)
    errors: Mutex<HashMap<String, VecDeque<DataError>>>,
    /// 응답하지 않는 티커
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, tokio::time::Instant)>>,
}

impl MemoryProvider {
    pub fn new(kind: DataKind) -> Self {
        Self {
            kind,
            data: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
            hanging: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_records(self, symbol: &str, records: Vec<ObservationRecord>) -> Self {
        self.set_records(symbol, records);
        self
    }

    pub fn set_records(&self, symbol: &str, records: Vec<ObservationRecord>) {
        self.data.lock().unwrap().insert(symbol.to_string(), records);
    }

    pub fn with_error(self, symbol: &str, error: DataError) -> Self {
        self.errors
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back(error);
        self
    }

    pub fn hanging(self, symbol: &str) -> Self {
        self.hanging.lock().unwrap().insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<(String, tokio::time::Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservationProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn kind(&self) -> DataKind {
        self.kind
    }

    async fn fetch(
        &self,
        ticker: &TickerSymbol,
        window: &ObservationWindow,
    ) -> ingest_data::Result<Vec<ObservationRecord>> {
        let symbol = ticker.as_str().to_string();
        self.calls
            .lock()
            .unwrap()
            .push((symbol.clone(), tokio::time::Instant::now()));

        let hangs = self.hanging.lock().unwrap().contains(&symbol);
        if hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let queued = self
            .errors
            .lock()
            .unwrap()
            .get_mut(&symbol)
            .and_then(|q| q.pop_front());
        if let Some(error) = queued {
            return Err(error);
        }

        let records = self.data.lock().unwrap().get(&symbol).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|r| r.observation.date().map_or(true, |d| window.contains(d)))
            .collect())
    }
}

// =============================================================================
// Object store
// =============================================================================

/// 인메모리 오브젝트 스토어
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: Mutex<Vec<String>>,
    /// 존재 확인이 실패하는 키 (403)
    denied: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, body: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.as_bytes().to_vec());
    }

    pub fn insert_bytes(&self, key: &str, body: &[u8]) {
        self.objects.lock().unwrap().insert(key.to_string(), body.to_vec());
    }

    pub fn deny(&self, key: &str) {
        self.denied.lock().unwrap().insert(key.to_string());
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self, key: &str) -> ingest_data::Result<bool> {
        if self.denied.lock().unwrap().contains(key) {
            return Err(DataError::HttpStatus {
                status: 403,
                message: format!("access denied: {}", key),
            });
        }
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> ingest_data::Result<Option<Vec<u8>>> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> ingest_data::Result<()> {
        self.puts.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }
}

// =============================================================================
// Warehouse
// =============================================================================

/// 인메모리 웨어하우스
#[derive(Default)]
pub struct MemoryWarehouse {
    tables: Mutex<HashMap<String, Vec<(ObservationRecord, DateTime<Utc>)>>>,
    truncates: Mutex<Vec<String>>,
    fail_truncate: Mutex<bool>,
    /// 남은 append 실패 횟수
    failing_appends: Mutex<u32>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_truncate(&self) {
        *self.fail_truncate.lock().unwrap() = true;
    }

    pub fn fail_appends(&self, times: u32) {
        *self.failing_appends.lock().unwrap() = times;
    }

    pub fn rows(&self, table: &str) -> Vec<ObservationRecord> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|rows| rows.iter().map(|(r, _)| r.clone()).collect())
            .unwrap_or_default()
    }

    pub fn truncates(&self) -> Vec<String> {
        self.truncates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    fn name(&self) -> &str {
        "memory"
    }

    async fn truncate(&self, table: &str) -> ingest_data::Result<()> {
        if *self.fail_truncate.lock().unwrap() {
            return Err(DataError::ConnectionError("warehouse unreachable".to_string()));
        }
        self.truncates.lock().unwrap().push(table.to_string());
        self.tables.lock().unwrap().remove(table);
        Ok(())
    }

    async fn append(
        &self,
        table: &str,
        records: &[ObservationRecord],
        last_updated: DateTime<Utc>,
    ) -> ingest_data::Result<usize> {
        {
            let mut failing = self.failing_appends.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(DataError::ConnectionError("warehouse connection reset".to_string()));
            }
        }
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        rows.extend(records.iter().cloned().map(|r| (r, last_updated)));
        Ok(records.len())
    }
}

// =============================================================================
// Universe / calendar
// =============================================================================

/// 항상 실패하는 유니버스 소스
pub struct UnreachableUniverse;

#[async_trait]
impl UniverseSource for UnreachableUniverse {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn fetch_tickers(&self) -> ingest_data::Result<Vec<TickerSymbol>> {
        Err(DataError::ConnectionError("connection refused".to_string()))
    }
}

/// 거래일이 없는 캘린더
pub struct ClosedCalendar;

impl TradingCalendar for ClosedCalendar {
    fn name(&self) -> &str {
        "closed"
    }

    fn valid_days(&self, _start: NaiveDate, _end: NaiveDate) -> CoreResult<Vec<NaiveDate>> {
        Ok(Vec::new())
    }
}

/// 테스트 구성 요소 묶음
pub struct Fixture {
    pub provider: MemoryProvider,
    pub store: MemoryObjectStore,
    pub warehouse: MemoryWarehouse,
    pub calendar: ingest_core::NyseCalendar,
    pub pacer: Immediate,
}

impl Fixture {
    pub fn new(provider: MemoryProvider) -> Self {
        Self {
            provider,
            store: MemoryObjectStore::new(),
            warehouse: MemoryWarehouse::new(),
            calendar: ingest_core::NyseCalendar::new(),
            pacer: Immediate,
        }
    }

    pub fn components<'a>(&'a self, universe: &'a dyn UniverseSource) -> PipelineComponents<'a> {
        PipelineComponents {
            universe,
            calendar: &self.calendar,
            provider: &self.provider,
            store: &self.store,
            warehouse: &self.warehouse,
            pacer: &self.pacer,
        }
    }
}
