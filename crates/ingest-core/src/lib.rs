//! # Ingest Core
//!
//! 시장 참조 데이터 수집 파이프라인의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 수집 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 티커 심볼과 데이터 종류
//! - 관측 기간(ObservationWindow)과 저장 키(SinkKey)
//! - 관측 레코드 (가격 봉, 배당, 뉴스 감성)
//! - NYSE 거래일 캘린더
//! - 로깅 인프라

pub mod calendar;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use calendar::{NyseCalendar, TradingCalendar, DEFAULT_LOOKBACK_DAYS};
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
