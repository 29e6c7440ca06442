//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 소스/저장소 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 연결 오류
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 레코드/오브젝트를 찾을 수 없음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 타임아웃 오류
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// 요청 한도 초과
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// HTTP 상태 코드 오류
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// 데이터 삽입 오류
    #[error("Insert error: {0}")]
    InsertError(String),

    /// 데이터 가져오기 오류 (외부 소스)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 파일 I/O 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// 재시도 가능한 오류인지 확인합니다.
    ///
    /// 네트워크/타임아웃/요청 한도/서버 측 5xx만 재시도합니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::ConnectionError(_) | DataError::Timeout(_) | DataError::RateLimited(_) => {
                true
            }
            DataError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// 대상이 존재하지 않음을 나타내는 오류인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    /// 응답 상태 코드로부터 오류 생성.
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            404 => DataError::NotFound(message),
            429 => DataError::RateLimited(message),
            code => DataError::HttpStatus {
                status: code,
                message,
            },
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::Timeout("Connection pool timed out".to_string()),
            sqlx::Error::Io(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            DataError::ConnectionError(err.to_string())
        } else if let Some(status) = err.status() {
            DataError::from_status(status, err.to_string())
        } else if err.is_decode() {
            DataError::ParseError(err.to_string())
        } else {
            DataError::FetchError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
