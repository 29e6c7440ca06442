//! 외부 데이터 소스 및 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 시장 데이터 Provider (Yahoo Finance 가격/배당, Alpha Vantage 뉴스 감성)
//! - 티커 유니버스 소스 (참조 테이블, 지수 구성종목 페이지, 정적 목록)
//! - 오브젝트 스토어 (S3, 로컬 파일시스템)
//! - 분석용 웨어하우스 (PostgreSQL)

pub mod error;
pub mod provider;
pub mod storage;
pub mod universe;

pub use error::{DataError, Result};

pub use provider::{
    AlphaVantageSentimentProvider, ObservationProvider, YahooDividendProvider, YahooPriceProvider,
};
pub use storage::object_store::{LocalObjectStore, ObjectStore, S3Config, S3ObjectStore};
pub use storage::warehouse::{PgWarehouse, Warehouse};
pub use universe::{IndexListingSource, ReferenceTableSource, StaticListSource, UniverseSource};
