use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::StreamExt;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::{ObjectEntry, ObjectStorage, UploadRequest, UploadResponse, compute_etag};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    bytes: Bytes,
}

/// 进程内对象存储，主要用于测试与本地调试
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<HashSet<String>, StorageError> {
        Ok(self.objects.read().await.keys().cloned().collect())
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, StorageError> {
        let etag = compute_etag(&request.bytes);
        self.objects.write().await.insert(
            request.key.clone(),
            StoredObject {
                content_type: request.content_type,
                bytes: request.bytes,
            },
        );
        Ok(UploadResponse {
            key: request.key,
            etag,
        })
    }

    async fn retrieve(&self, key: &str) -> Result<Option<ObjectEntry>, StorageError> {
        let Some(object) = self.objects.read().await.get(key).cloned() else {
            return Ok(None);
        };
        let content_length = Some(object.bytes.len() as u64);
        let bytes = object.bytes;
        Ok(Some(ObjectEntry {
            key: key.to_string(),
            content_type: Some(object.content_type),
            content_length,
            stream: futures_util::stream::once(async move { Ok(bytes) }).boxed(),
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryStorage;
    use crate::storage::{ObjectStorage, UploadRequest, compute_etag};
    use axum::body::Bytes;

    #[tokio::test]
    async fn upload_then_retrieve_returns_same_bytes() {
        let storage = InMemoryStorage::new();
        let resp = storage
            .upload(UploadRequest::new(
                "alice.jpg",
                "image/jpeg",
                Bytes::from_static(b"b1"),
            ))
            .await
            .expect("upload");
        assert_eq!(resp.key, "alice.jpg");
        assert_eq!(resp.etag, compute_etag(b"b1"));

        let entry = storage
            .retrieve("alice.jpg")
            .await
            .expect("retrieve")
            .expect("present");
        assert_eq!(entry.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(entry.content_length, Some(2));
        assert_eq!(entry.read_to_end().await.expect("read"), b"b1");
    }

    #[tokio::test]
    async fn upload_overwrites_existing_key() {
        let storage = InMemoryStorage::new();
        for body in [&b"old"[..], &b"new"[..]] {
            storage
                .upload(UploadRequest::new(
                    "bob.jpg",
                    "image/jpeg",
                    Bytes::copy_from_slice(body),
                ))
                .await
                .expect("upload");
        }
        let entry = storage.retrieve("bob.jpg").await.expect("retrieve");
        let bytes = entry.expect("present").read_to_end().await.expect("read");
        assert_eq!(bytes, b"new");
        assert_eq!(storage.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_none_and_delete_is_idempotent() {
        let storage = InMemoryStorage::new();
        assert!(storage.retrieve("ghost.jpg").await.expect("retrieve").is_none());
        storage.delete("ghost.jpg").await.expect("delete absent");
        assert!(storage.list().await.expect("list").is_empty());
    }
}
