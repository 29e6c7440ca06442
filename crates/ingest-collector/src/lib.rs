//! Batched market reference data collector.
//!
//! 이 crate는 티커 유니버스 단위로 참조 데이터를 수집하는 파이프라인을 제공합니다:
//! - 배당 이벤트 (Yahoo Finance)
//! - 일봉 가격 + 섹터/업종 (Yahoo Finance)
//! - 뉴스 감성 (Alpha Vantage)
//!
//! 수집 결과는 오브젝트 스토어와 웨어하우스에 멱등적으로 저장되며,
//! 티커별 실패/빈 결과는 실행 종료 시 하나의 로그 오브젝트에 추가됩니다.

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, LoadMode};
pub use error::{CollectorError, Result};
pub use stats::RunSummary;
