//! 优雅退出
//!
//! 监听 SIGINT/SIGTERM（Windows 下为 Ctrl+C），收到后停止接收新连接，
//! 并在超时时间内等待在途请求结束。

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
}

/// 等待第一个退出信号
pub async fn wait_for_signal() -> ShutdownReason {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("注册 SIGTERM 处理器失败（仅监听 Ctrl+C）: {}", e);
                return wait_for_ctrl_c().await;
            }
        };
        tokio::select! {
            reason = wait_for_ctrl_c() => reason,
            _ = sigterm.recv() => {
                info!("接收到SIGTERM信号");
                ShutdownReason::Terminate
            }
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await
    }
}

async fn wait_for_ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("监听Ctrl+C信号失败: {}", e);
        // 无法监听时永不触发，由进程外部终止
        std::future::pending::<()>().await;
    }
    info!("接收到SIGINT信号 (Ctrl+C)");
    ShutdownReason::Interrupt
}

/// 运行服务直到 `server` 自行结束或 `signal` 触发；触发后给予 `timeout` 的排空时间。
///
/// `server` 由调用方用 `drain` 接收端构造：其值变为 `true` 时应停止接收新连接。
pub async fn run_until_signal<S, F>(
    server: impl FnOnce(watch::Receiver<bool>) -> S,
    signal: F,
    timeout: Duration,
) -> std::io::Result<()>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
    F: Future<Output = ShutdownReason>,
{
    let (drain_tx, drain_rx) = watch::channel(false);
    let mut handle = tokio::spawn(server(drain_rx));

    tokio::select! {
        res = &mut handle => {
            return res.map_err(std::io::Error::other)?;
        }
        reason = signal => {
            info!("接收到退出信号: {:?}，开始优雅退出（超时 {}s）...", reason, timeout.as_secs());
            let _ = drain_tx.send(true);
        }
    }

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(res) => {
            res.map_err(std::io::Error::other)??;
            info!("优雅退出完成");
            Ok(())
        }
        Err(_) => {
            warn!("优雅退出超时，强制退出");
            handle.abort();
            Ok(())
        }
    }
}

/// 将 drain 接收端转换为 axum `with_graceful_shutdown` 所需的 future
pub async fn drained(mut rx: watch::Receiver<bool>) {
    // 发送端被丢弃同样视为退出
    let _ = rx.wait_for(|draining| *draining).await;
}

#[cfg(test)]
mod tests {
    use super::{ShutdownReason, drained, run_until_signal};
    use std::time::Duration;

    #[tokio::test]
    async fn signal_drains_cooperative_server() {
        let res = run_until_signal(
            |rx| async move {
                drained(rx).await;
                Ok::<(), std::io::Error>(())
            },
            async { ShutdownReason::Terminate },
            Duration::from_secs(1),
        )
        .await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn stuck_server_is_aborted_after_timeout() {
        let started = std::time::Instant::now();
        let res = run_until_signal(
            |_rx| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<(), std::io::Error>(())
            },
            async { ShutdownReason::Interrupt },
            Duration::from_millis(50),
        )
        .await;
        assert!(res.is_ok());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn server_error_is_returned_without_signal() {
        let res = run_until_signal(
            |_rx| async move { Err::<(), _>(std::io::Error::other("bind lost")) },
            std::future::pending::<ShutdownReason>(),
            Duration::from_secs(1),
        )
        .await;
        assert!(res.is_err());
    }
}
