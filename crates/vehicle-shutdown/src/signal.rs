use std::io;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT - Ctrl+C
    Interrupt,

    /// 手动触发
    Manual,
}

/// 信号处理器
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl SignalHandler {
    pub fn new() -> (Self, broadcast::Receiver<ShutdownSignal>) {
        let (tx, rx) = broadcast::channel(16);
        (Self { shutdown_tx: tx }, rx)
    }

    /// 等待系统信号并广播
    #[cfg(unix)]
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        use signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                ShutdownSignal::Term
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
                ShutdownSignal::Interrupt
            }
        };

        let _ = self.shutdown_tx.send(received);
        Ok(received)
    }

    /// 等待系统信号（Windows 版本）
    #[cfg(not(unix))]
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        let _ = self.shutdown_tx.send(ShutdownSignal::Interrupt);
        Ok(ShutdownSignal::Interrupt)
    }

    /// 在后台监听系统信号
    pub fn listen(&self) -> JoinHandle<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handler.wait_for_system_signal().await {
                // 无法安装信号处理时只能靠进程被杀死退出
                warn!("Failed to install signal handler: {}", e);
            }
        })
    }

    /// 手动触发关闭
    pub fn trigger_shutdown(&self) {
        info!("Manual shutdown triggered");
        let _ = self.shutdown_tx.send(ShutdownSignal::Manual);
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_handler_creation() {
        let (handler, mut rx) = SignalHandler::new();

        handler.trigger_shutdown();

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal, ShutdownSignal::Manual);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let (handler, _rx1) = SignalHandler::new();
        let mut rx2 = handler.subscribe();
        let mut rx3 = handler.subscribe();

        handler.trigger_shutdown();

        assert_eq!(rx2.recv().await.unwrap(), ShutdownSignal::Manual);
        assert_eq!(rx3.recv().await.unwrap(), ShutdownSignal::Manual);
    }

    #[tokio::test]
    async fn test_clone_shares_channel() {
        let (handler, mut rx) = SignalHandler::new();
        let cloned = handler.clone();

        cloned.trigger_shutdown();
        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Manual);
    }
}
