//! 오브젝트 스토어.
//!
//! 존재 확인은 `exists(key) -> Result<bool>`로 명시적으로 모델링합니다.
//! "없음"은 `Ok(false)`이며, 그 외의 실패(권한, 네트워크 등)는 에러로 전파됩니다.

pub mod local;
pub mod s3;

use async_trait::async_trait;

use crate::Result;

pub use local::LocalObjectStore;
pub use s3::{S3Config, S3ObjectStore};

/// 오브젝트 스토어 trait.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 스토어 이름 (로그용).
    fn name(&self) -> &str;

    /// 키에 해당하는 오브젝트 존재 여부.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// 오브젝트 내용 조회. 없으면 `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 오브젝트를 하나의 단위로 기록 (덮어쓰기).
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}
