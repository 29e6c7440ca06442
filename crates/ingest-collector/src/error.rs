//! 에러 타입 정의.

use ingest_data::DataError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러 (실행 전 검증 실패)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 티커 유니버스를 확보하지 못함
    #[error("Universe unavailable: {0}")]
    UniverseUnavailable(String),

    /// 조회 기간 내 거래일 없음
    #[error("No trading day found: {0}")]
    NoTradingDayFound(String),

    /// 저장소 사용 불가 (실행 중단)
    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),

    /// 오브젝트 존재 여부 확인 실패
    #[error("Existence check failed for '{key}': {source}")]
    SinkExistenceCheck {
        key: String,
        #[source]
        source: DataError,
    },

    /// 저장 실패
    #[error("Write failed for '{key}': {source}")]
    SinkWrite {
        key: String,
        #[source]
        source: DataError,
    },

    /// 레코드 직렬화 실패
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 데이터 소스/저장소 에러
    #[error(transparent)]
    Data(#[from] DataError),
}

impl CollectorError {
    /// 실행 전체를 중단해야 하는 에러인지 확인합니다.
    ///
    /// 티커 단위 저장 실패(`SinkExistenceCheck`, `SinkWrite`, `Serialization`)는
    /// 해당 티커만 실패로 기록하고 실행을 계속합니다.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SinkExistenceCheck { .. } | Self::SinkWrite { .. } | Self::Serialization(_)
        )
    }
}

impl From<csv::Error> for CollectorError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
