//! 관측 기간 타입.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// 데이터를 요청할 날짜 범위 (양 끝 포함).
///
/// 실행당 한 번 계산되어 모든 배치에서 읽기 전용으로 공유됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservationWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl ObservationWindow {
    /// 새 관측 기간을 생성합니다. `start > end`이면 에러를 반환합니다.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> CoreResult<Self> {
        if start_date > end_date {
            return Err(CoreError::InvalidWindow {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// 하루짜리 관측 기간.
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// 날짜가 기간에 포함되는지 확인.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// 하루짜리 기간인지 여부.
    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }

    /// 종료일 다음 날 (종료일을 배타적으로 받는 API용).
    pub fn exclusive_end(&self) -> NaiveDate {
        self.end_date.succ_opt().unwrap_or(self.end_date)
    }
}

impl fmt::Display for ObservationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_day() {
            write!(f, "{}", self.end_date)
        } else {
            write!(f, "{}..={}", self.start_date, self.end_date)
        }
    }
}
