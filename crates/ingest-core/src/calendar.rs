//! 거래일 캘린더.
//!
//! 주말과 거래소 휴장일을 고려하여 관측 기간을 계산합니다.
//!
//! # 직전 거래일 규칙
//!
//! 기준일로부터 최소 10일 전까지의 유효 거래일 목록을 구한 뒤:
//! - 가장 최근 거래일이 기준일과 같으면 (당일 데이터 미확정) 두 번째로 최근 거래일
//! - 그렇지 않으면 가장 최근 거래일
//!
//! 조회 기간에 거래일이 하나도 없으면 `NoTradingDayFound` 에러를 반환합니다.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::error::{CoreError, CoreResult};
use crate::types::ObservationWindow;

/// 직전 거래일 계산 시 최소 조회 일수.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 10;

/// 거래일 캘린더 trait.
pub trait TradingCalendar: Send + Sync {
    /// 캘린더 이름 (예: "NYSE").
    fn name(&self) -> &str;

    /// `start..=end` 범위의 유효 거래일 목록 (오름차순).
    fn valid_days(&self, start: NaiveDate, end: NaiveDate) -> CoreResult<Vec<NaiveDate>>;

    /// 기준일의 직전 거래일 (기본 조회 기간 사용).
    fn previous_trading_day(&self, reference: NaiveDate) -> CoreResult<NaiveDate> {
        self.previous_trading_day_within(reference, DEFAULT_LOOKBACK_DAYS)
    }

    /// 기준일의 직전 거래일.
    ///
    /// `lookback_days`는 최소 [`DEFAULT_LOOKBACK_DAYS`]로 보정됩니다.
    fn previous_trading_day_within(
        &self,
        reference: NaiveDate,
        lookback_days: u32,
    ) -> CoreResult<NaiveDate> {
        let lookback_days = lookback_days.max(DEFAULT_LOOKBACK_DAYS);
        let start = reference
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or_else(|| CoreError::DateOutOfRange(format!("{} - {}일", reference, lookback_days)))?;

        let mut days = self.valid_days(start, reference)?;
        days.sort_unstable();
        days.dedup();
        days.retain(|d| *d <= reference);

        let not_found = || CoreError::NoTradingDayFound {
            reference,
            lookback_days,
        };

        match days.as_slice() {
            [] => Err(not_found()),
            [.., previous, last] if *last == reference => Ok(*previous),
            [last] if *last == reference => Err(not_found()),
            [.., last] => Ok(*last),
        }
    }

    /// 기준일로부터 `years`년 전까지의 관측 기간.
    fn window_for_years(&self, reference: NaiveDate, years: u32) -> CoreResult<ObservationWindow> {
        let start = reference
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .ok_or_else(|| CoreError::DateOutOfRange(format!("{} - {}년", reference, years)))?;
        ObservationWindow::new(start, reference)
    }
}

/// 규칙 기반 NYSE 캘린더.
///
/// 정규 휴장일만 반영합니다 (임시 휴장은 포함하지 않음).
#[derive(Debug, Clone, Copy, Default)]
pub struct NyseCalendar;

impl NyseCalendar {
    pub fn new() -> Self {
        Self
    }

    /// 주어진 날짜가 거래일인지 확인.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// 주어진 날짜가 NYSE 휴장일인지 확인 (주말 제외).
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        Self::holidays(date.year()).contains(&date)
    }

    /// 연도별 NYSE 정규 휴장일 목록.
    pub fn holidays(year: i32) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(10);

        // 신정: 토요일이면 대체 휴장 없음
        if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
            match new_year.weekday() {
                Weekday::Sat => {}
                Weekday::Sun => days.extend(new_year.succ_opt()),
                _ => days.push(new_year),
            }
        }

        if year >= 1998 {
            days.extend(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr. Day
        }
        days.extend(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
        days.extend(easter_sunday(year).and_then(|d| d.checked_sub_days(Days::new(2)))); // Good Friday
        days.extend(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
        if year >= 2022 {
            days.extend(NaiveDate::from_ymd_opt(year, 6, 19).map(observed)); // Juneteenth
        }
        days.extend(NaiveDate::from_ymd_opt(year, 7, 4).map(observed)); // Independence Day
        days.extend(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
        days.extend(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
        days.extend(NaiveDate::from_ymd_opt(year, 12, 25).map(observed)); // Christmas

        days
    }
}

impl TradingCalendar for NyseCalendar {
    fn name(&self) -> &str {
        "NYSE"
    }

    fn valid_days(&self, start: NaiveDate, end: NaiveDate) -> CoreResult<Vec<NaiveDate>> {
        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .collect())
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 토요일 휴일은 금요일, 일요일 휴일은 월요일로 대체.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date.pred_opt().unwrap_or(date),
        Weekday::Sun => date.succ_opt().unwrap_or(date),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next.pred_opt()?;
    while day.weekday() != weekday {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// 그레고리력 부활절 (Anonymous Gregorian algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
