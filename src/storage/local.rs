use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::{ObjectEntry, ObjectStorage, UploadRequest, UploadResponse, compute_etag};
use crate::error::StorageError;

/// 上传暂存目录（位于根目录下，写完后 rename 到最终位置）
const STAGING_DIR: &str = ".staging";

/// 本地文件系统对象存储：每个 key 对应根目录下的一个文件
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 临时文件目录；列举时跳过
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// 确保根目录存在
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// key 只能是根目录下的单个文件名
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let invalid = key.is_empty()
            || key == "."
            || key == ".."
            || key == STAGING_DIR
            || key.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn list(&self) -> Result<HashSet<String>, StorageError> {
        let mut keys = HashSet::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => {
                    keys.insert(name);
                }
                Err(raw) => tracing::warn!("跳过非 UTF-8 文件名: {:?}", raw),
            }
        }
        Ok(keys)
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, StorageError> {
        let target = self.object_path(&request.key)?;
        let staging = self.staging_dir();
        tokio::fs::create_dir_all(&staging).await?;

        let tmp = staging.join(format!("{}.part", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp, &request.bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(key = %request.key, bytes = request.bytes.len(), "对象已写入 {:?}", target);
        Ok(UploadResponse {
            etag: compute_etag(&request.bytes),
            key: request.key,
        })
    }

    async fn retrieve(&self, key: &str) -> Result<Option<ObjectEntry>, StorageError> {
        let path = self.object_path(key)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some(ObjectEntry {
            key: key.to_string(),
            content_type: None,
            content_length: Some(metadata.len()),
            stream: ReaderStream::new(file).boxed(),
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
