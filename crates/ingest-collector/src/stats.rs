//! 실행 요약 통계.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 번의 수집 실행 요약
///
/// 모든 티커는 정확히 하나의 결과로 집계됩니다:
/// `failed + empty + written + skipped == attempted`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// 시도한 티커 수 (유니버스 크기)
    pub attempted: usize,
    /// 빈 결과 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 저장 완료
    pub written: usize,
    /// 건너뜀 (이미 저장됨)
    pub skipped: usize,
    /// 실패 (조회 또는 저장)
    pub failed: usize,
    /// 저장된 총 레코드 수
    pub total_records: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 결과가 집계된 티커 수
    pub fn accounted(&self) -> usize {
        self.failed + self.empty + self.written + self.skipped
    }

    /// 성공률 계산 (%) - 저장 또는 건너뜀
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            ((self.written + self.skipped) as f64 / self.attempted as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            attempted = self.attempted,
            written = self.written,
            skipped = self.skipped,
            empty = self.empty,
            failed = self.failed,
            total_records = self.total_records,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
