use crate::config::{AppConfig, StorageBackend};
use crate::error::AppError;
use crate::storage::LocalStorage;

/// 执行启动检查
///
/// 本地存储后端：确保根目录存在且可写。
pub async fn run_startup_checks(config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");

    match config.storage.backend {
        StorageBackend::Local => ensure_local_storage(config).await?,
        StorageBackend::Memory => {
            tracing::warn!("⚠️ 使用内存存储后端，进程退出后所有头像将丢失");
        }
    }

    tracing::info!("✅ 启动检查完成");
    Ok(())
}

/// 确保本地存储根目录存在，并通过一次写删探测可写性
async fn ensure_local_storage(config: &AppConfig) -> Result<(), AppError> {
    let root = config.local_storage_path();
    let storage = LocalStorage::new(&root);

    if !root.exists() {
        tracing::warn!("📁 未找到存储目录，正在创建: {:?}", root);
    }
    storage
        .ensure_root()
        .await
        .map_err(|e| AppError::Internal(format!("创建存储目录失败 {root:?}: {e}")))?;

    // 探测文件放在暂存目录，残留时也不会出现在列表中
    let staging = storage.staging_dir();
    tokio::fs::create_dir_all(&staging)
        .await
        .map_err(|e| AppError::Internal(format!("创建暂存目录失败 {staging:?}: {e}")))?;
    let probe = staging.join(".write-probe");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| AppError::Internal(format!("存储目录不可写 {root:?}: {e}")))?;
    if let Err(e) = tokio::fs::remove_file(&probe).await {
        tracing::warn!("清理写入探测文件失败: {}", e);
    }

    tracing::info!("✅ 存储目录可用: {:?}", storage.root());
    Ok(())
}
