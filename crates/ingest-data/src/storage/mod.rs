//! 저장소 모듈.
//!
//! - `object_store`: 스킵-if-존재 정책의 대상인 오브젝트 스토어 (S3, 로컬)
//! - `warehouse`: 분석용 웨어하우스 (PostgreSQL)

pub mod object_store;
pub mod warehouse;
