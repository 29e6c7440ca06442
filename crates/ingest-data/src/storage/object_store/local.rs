//! 로컬 파일시스템 오브젝트 스토어.
//!
//! 루트 디렉터리 아래에 키를 상대 경로로 저장합니다. 쓰기는 임시 파일에
//! 기록한 뒤 rename하여 부분 기록된 오브젝트가 보이지 않도록 합니다.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::ObjectStore;
use crate::{DataError, Result};

/// 로컬 파일시스템 오브젝트 스토어.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 키를 루트 하위 경로로 변환 (루트 밖을 가리키는 키는 거부).
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.trim().is_empty() || escapes {
            return Err(DataError::InvalidData(format!("잘못된 오브젝트 키: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".partial");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
