//! 수집 작업용 로깅 초기화.
//!
//! 로그는 stderr로 출력합니다. stdout은 `calendar` 같은 명령의 결과 출력용입니다.
//! 형식은 `LOG_FORMAT` (pretty | json | compact)으로, 레벨은 `RUST_LOG` 또는
//! CLI `--log-level`로 정합니다.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// 레벨 지시자를 적용할 수집 파이프라인 crate
const PIPELINE_TARGETS: [&str; 3] = ["ingest_collector", "ingest_data", "ingest_core"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 터미널용 여러 줄 형식
    #[default]
    Pretty,
    /// 스케줄러/로그 수집기용 한 줄 JSON
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("알 수 없는 LOG_FORMAT: {}", other)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 파이프라인 crate에 적용할 레벨 (예: "info", "debug")
    pub level: String,
    pub format: LogFormat,
    /// 의존 crate(sqlx, reqwest 등) 로그 레벨
    pub dependency_level: String,
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            dependency_level: "warn".to_string(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// `LOG_FORMAT` 환경변수가 유효하면 형식을 덮어씀
    pub fn with_env_format(self) -> Self {
        match std::env::var("LOG_FORMAT").ok().map(|s| s.parse::<LogFormat>()) {
            Some(Ok(format)) => self.with_format(format),
            _ => self,
        }
    }

    /// `EnvFilter` 지시자 문자열
    ///
    /// 의존 crate는 `dependency_level`, 파이프라인 crate는 `level`을 따릅니다.
    pub fn directives(&self) -> String {
        let mut directives = vec![self.dependency_level.clone()];
        directives.extend(
            PIPELINE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, self.level)),
        );
        directives.join(",")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// 전역 subscriber 설치. `RUST_LOG`가 있으면 설정 레벨보다 우선합니다.
///
/// 프로세스당 한 번만 성공하며, 두 번째 호출은 에러를 반환합니다.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directives())?,
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).try_init()?;

    tracing::debug!(format = ?config.format, directives = %config.directives(), "로깅 초기화");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_directives_scope_level_to_pipeline_crates() {
        let config = LogConfig::new("debug");
        assert_eq!(
            config.directives(),
            "warn,ingest_collector=debug,ingest_data=debug,ingest_core=debug"
        );
    }
}
