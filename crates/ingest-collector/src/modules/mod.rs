//! 데이터 수집 모듈.

pub mod failure_log;
pub mod fetcher;
pub mod pipeline;
pub mod sink;
pub mod universe;

pub use failure_log::{FailureAggregator, FailureLogEntry};
pub use fetcher::{
    partition, BatchFetcher, FetchOutcome, FetchedBatch, FixedDelay, Immediate, Pacer, RetryPolicy,
};
pub use pipeline::{Pipeline, PipelineComponents, PipelineSettings, RunState};
pub use sink::{encode_csv, IdempotentSink, WriteOutcome, WritePolicy};
pub use universe::{resolve_universe, UniverseKind};
