use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// 建立一对关停信号：runner 侧 / 宿主侧
pub fn channel() -> (ShutdownSignal, ShutdownHandle) {
    let token = CancellationToken::new();
    let (tx, rx) = watch::channel(false);
    (
        ShutdownSignal {
            token: token.clone(),
            drained: Arc::new(tx),
        },
        ShutdownHandle { token, drained: rx },
    )
}

/// runner 侧：观察停止请求，排空后上报
#[derive(Clone)]
pub struct ShutdownSignal {
    token: CancellationToken,
    drained: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// 幂等
    pub fn mark_drained(&self) {
        if !*self.drained.borrow() {
            tracing::info!("Indexing runner drained");
        }
        self.drained.send_replace(true);
    }

    pub fn is_drained(&self) -> bool {
        *self.drained.borrow()
    }
}

/// 宿主侧：请求停止，等待排空
#[derive(Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
    drained: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn request_stop(&self) {
        self.token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_drained(&self) -> bool {
        *self.drained.borrow()
    }

    /// 等待 runner 排空；runner 已被 drop 也视为排空
    pub async fn wait_drained(&self) {
        let mut rx = self.drained.clone();
        let _ = rx.wait_for(|d| *d).await;
    }

    /// 限时等待，超时返回 false（宿主可据此强制终止）
    pub async fn wait_drained_timeout(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.wait_drained()).await.is_ok()
    }
}
