//! 对象存储抽象
//!
//! 服务只依赖 [`ObjectStorage`] 提供的四种能力（列举/上传/读取/删除），
//! 具体后端在启动时根据配置选择并注入到 `AppState`。

pub mod local;
pub mod memory;

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::BoxStream;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageError;

pub use local::LocalStorage;
pub use memory::InMemoryStorage;

/// 对象内容字节流（由响应层惰性消费）
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// 上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadRequest {
    pub fn new(key: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            key: key.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// 上传结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub key: String,
    /// 内容标识（已带引号的强校验 ETag）
    pub etag: String,
}

/// 读取到的对象
pub struct ObjectEntry {
    pub key: String,
    /// 后端记录的内容类型（文件系统后端不记录）
    pub content_type: Option<String>,
    /// 内容长度（已知时用于 Content-Length）
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("key", &self.key)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl ObjectEntry {
    /// 将字节流完整读入内存
    pub(crate) async fn read_to_end(self) -> std::io::Result<Vec<u8>> {
        use futures_util::TryStreamExt;

        let mut stream = self.stream;
        let capacity = self
            .content_length
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }
}

/// 以字符串为 key 的对象存储
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 后端名称（用于日志）
    fn backend_name(&self) -> &'static str;

    /// 列出当前所有 key（无序）
    async fn list(&self) -> Result<HashSet<String>, StorageError>;

    /// 上传对象；key 已存在时覆盖
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, StorageError>;

    /// 读取对象；不存在时返回 `Ok(None)`
    async fn retrieve(&self, key: &str) -> Result<Option<ObjectEntry>, StorageError>;

    /// 删除对象；不存在时视为成功
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// 计算内容的强校验 ETag（带引号的 SHA-256 十六进制）
pub fn compute_etag(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(bytes)))
}

/// 根据配置构建存储后端
pub fn build_storage(config: &StorageConfig) -> Arc<dyn ObjectStorage> {
    match config.backend {
        StorageBackend::Local => Arc::new(LocalStorage::new(&config.local.path)),
        StorageBackend::Memory => Arc::new(InMemoryStorage::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::{build_storage, compute_etag};
    use crate::config::{StorageBackend, StorageConfig};

    #[test]
    fn etag_is_quoted_sha256_hex() {
        let etag = compute_etag(b"abc");
        assert_eq!(
            etag,
            "\"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\""
        );
    }

    #[test]
    fn build_storage_honours_backend_kind() {
        let memory = build_storage(&StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        });
        assert_eq!(memory.backend_name(), "memory");

        let local = build_storage(&StorageConfig::default());
        assert_eq!(local.backend_name(), "local");
    }
}
