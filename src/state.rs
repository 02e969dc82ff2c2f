use std::sync::Arc;

use crate::host::HostResolver;
use crate::storage::ObjectStorage;

/// 聚合的应用共享状态（启动时构建，之后只读）
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn ObjectStorage>,
    pub host_resolver: Arc<dyn HostResolver>,
    /// 业务路由挂载前缀（规范化为空串或 `/xxx`），用于拼接 Location
    pub api_prefix: Arc<str>,
}

impl AppState {
    pub fn new(storage: Arc<dyn ObjectStorage>, host_resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            storage,
            host_resolver,
            api_prefix: Arc::from(""),
        }
    }

    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = Arc::from(normalize_prefix(prefix));
        self
    }
}

/// `""`、`"/"` -> `""`；`"api/"` -> `"/api"`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
