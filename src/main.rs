use profile_pictures::startup::run_startup_checks;
use profile_pictures::{
    AppConfig, AppState, DefaultHostResolver, build_router, shutdown, storage,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // 配置先于日志加载：日志级别来自配置
    let config = match AppConfig::init_global() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter_directive().into()),
        )
        .init();
    tracing::info!("配置已加载: {:?}", AppConfig::get_config_path());

    if let Err(e) = run_startup_checks(config).await {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    let storage = storage::build_storage(&config.storage);
    let host_resolver = Arc::new(DefaultHostResolver::from_config(config));
    tracing::info!("存储后端: {}", storage.backend_name());

    let state = AppState::new(storage, host_resolver).with_api_prefix(&config.api.prefix);
    let api_prefix = state.api_prefix.clone();
    let app = build_router(state, &config.upload);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Pictures API: http://{}{}/pictures", addr, api_prefix);

    let served = shutdown::run_until_signal(
        move |drain| async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown::drained(drain))
                .await
        },
        shutdown::wait_for_signal(),
        config.shutdown.timeout_duration(),
    )
    .await;

    if let Err(e) = served {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
