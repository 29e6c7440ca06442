//! 관측 데이터 Provider 모듈.
//!
//! 티커별 관측 레코드를 외부 소스에서 가져오는 Provider들을 정의합니다.
//!
//! ## Yahoo Finance
//! - `YahooPriceProvider`: 일봉 가격 + 섹터/업종 보강
//! - `YahooDividendProvider`: 배당 이벤트
//!
//! ## Alpha Vantage
//! - `AlphaVantageSentimentProvider`: 뉴스 감성 (API 키 필요)

pub mod alpha_vantage;
pub mod yahoo;

use async_trait::async_trait;
use ingest_core::{DataKind, ObservationRecord, ObservationWindow, TickerSymbol};

use crate::Result;

pub use alpha_vantage::AlphaVantageSentimentProvider;
pub use yahoo::{CompanyProfile, YahooDividendProvider, YahooPriceProvider};

/// 티커별 관측 데이터 Provider trait.
#[async_trait]
pub trait ObservationProvider: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 제공하는 데이터 종류.
    fn kind(&self) -> DataKind;

    /// 관측 기간 내 티커의 레코드 조회 (날짜 오름차순).
    ///
    /// 데이터가 없으면 빈 벡터를 반환합니다 (에러 아님).
    async fn fetch(
        &self,
        ticker: &TickerSymbol,
        window: &ObservationWindow,
    ) -> Result<Vec<ObservationRecord>>;
}
