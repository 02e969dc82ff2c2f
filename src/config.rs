use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例（仅在启动阶段读取，请求路径通过 AppState 获取依赖）
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
}

impl LoggingConfig {
    /// 生成 tracing EnvFilter 指令
    pub fn filter_directive(&self) -> String {
        format!("profile_pictures={0},tower_http={0}", self.level)
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 业务路由挂载前缀（为空表示挂载在根路径）
    #[serde(default)]
    pub prefix: String,
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 本地文件系统
    #[default]
    Local,
    /// 进程内内存（重启即丢失）
    Memory,
}

/// 本地文件系统存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// 对象根目录
    #[serde(default = "LocalStorageConfig::default_path")]
    pub path: String,
}

impl LocalStorageConfig {
    fn default_path() -> String {
        "./data/pictures".to_string()
    }
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// 对象存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub local: LocalStorageConfig,
}

/// 对外地址解析配置（用于构造 Location 响应头）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostResolutionConfig {
    /// 固定的对外基础地址，例如 https://pics.example.com；设置后忽略请求头
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// 是否信任 Forwarded / X-Forwarded-* 请求头（仅在反向代理之后开启）
    #[serde(default)]
    pub trust_forwarded_headers: bool,
    /// 允许的主机列表（为空表示不限制）；不在列表中的主机回退为监听地址
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 单次请求体最大字节数
    #[serde(default = "UploadConfig::default_max_bytes")]
    pub max_bytes: usize,
}

impl UploadConfig {
    fn default_max_bytes() -> usize {
        10 * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: Self::default_max_bytes(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 等待在途请求完成的超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    /// 对象存储配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// 对外地址解析配置
    #[serde(default)]
    pub host_resolution: HostResolutionConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 以内置默认值为底，叠加配置文件（可选）与环境变量
    ///
    /// 环境变量示例：`APP_SERVER__PORT=8080`、`APP_STORAGE__BACKEND=memory`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        let builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default())?)
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("host_resolution.allowed_hosts")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 初始化全局配置，重复调用返回同一份配置
    pub fn init_global() -> Result<&'static AppConfig, ConfigError> {
        CONFIG.get_or_try_init(Self::load)
    }

    /// 获取配置文件路径（可通过 APP_CONFIG 指定）
    pub fn get_config_path() -> PathBuf {
        std::env::var_os("APP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 无法从请求推断主机时使用的基础地址
    pub fn fallback_base_url(&self) -> String {
        format!("http://{}", self.server_addr())
    }

    /// 获取本地存储根目录
    pub fn local_storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.local.path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            api: ApiConfig {
                prefix: String::new(),
            },
            storage: StorageConfig::default(),
            host_resolution: HostResolutionConfig::default(),
            upload: UploadConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, StorageBackend};

    #[test]
    fn defaults_serve_at_root_with_local_storage() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.prefix, "");
        assert_eq!(cfg.storage.backend, StorageBackend::Local);
        assert_eq!(cfg.server_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.fallback_base_url(), "http://0.0.0.0:8080");
        assert_eq!(cfg.upload.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn storage_backend_parses_lowercase() {
        let v: StorageBackend = serde_json::from_str("\"memory\"").expect("parse backend");
        assert_eq!(v, StorageBackend::Memory);
    }

    #[test]
    fn logging_filter_targets_crate_and_tower_http() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.logging.filter_directive(),
            "profile_pictures=info,tower_http=info"
        );
    }
}
