//! 핵심 도메인 에러 타입.

use chrono::NaiveDate;
use thiserror::Error;

/// 도메인 타입 생성 및 캘린더 계산 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 잘못된 티커 심볼
    #[error("잘못된 티커 심볼: {0:?}")]
    InvalidTicker(String),

    /// 시작일이 종료일보다 늦은 관측 기간
    #[error("잘못된 관측 기간: {start} > {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    /// 조회 기간 내 거래일 없음 (캘린더 데이터 장애)
    #[error("{reference} 기준 {lookback_days}일 내 거래일을 찾을 수 없습니다")]
    NoTradingDayFound {
        reference: NaiveDate,
        lookback_days: u32,
    },

    /// 날짜 계산 범위 초과
    #[error("날짜 계산 범위 초과: {0}")]
    DateOutOfRange(String),

    /// 캘린더 데이터 소스 에러
    #[error("캘린더 에러: {0}")]
    Calendar(String),
}

/// 핵심 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
