//! 도메인 모델.

pub mod record;

pub use record::*;
