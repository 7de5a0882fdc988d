//! 会话中断
//!
//! 第一次 Ctrl+C / SIGTERM 只置位中断句柄，不取消正在进行的模型调用或能力调用（第二次直接退出进程）：
//! 输入读取处立刻返回 Interrupted，回合进行中则在回合结束后由会话收尾。

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// 中断来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    /// Ctrl+C
    CtrlC,
    /// SIGTERM
    Terminate,
}

/// 中断句柄：克隆后共享同一状态，只记录第一次中断的来源
#[derive(Clone, Default)]
pub struct SessionInterrupt {
    token: CancellationToken,
    source: Arc<OnceLock<InterruptSource>>,
}

impl SessionInterrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交给输入源监听的 token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn trigger(&self, source: InterruptSource) {
        if self.source.set(source).is_ok() {
            tracing::info!(?source, "interrupt received, closing session after the current step");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn source(&self) -> Option<InterruptSource> {
        self.source.get().copied()
    }

    /// 处理一次信号：首次只置位，会话在当前回合结束后收尾；已置位时要求立即退出
    pub fn on_signal(&self, source: InterruptSource) -> SignalAction {
        if self.is_triggered() {
            SignalAction::Exit
        } else {
            self.trigger(source);
            SignalAction::Close
        }
    }

    /// 后台持续监听 Ctrl+C 与 SIGTERM（非 unix 只有 Ctrl+C）。
    /// 第二次信号不再等待进行中的调用，直接以 130 退出进程。
    pub fn listen_for_signals(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            loop {
                let source = wait_for_signal().await;
                if handle.on_signal(source) == SignalAction::Exit {
                    tracing::warn!(?source, "second interrupt, exiting without waiting for the current step");
                    std::process::exit(130);
                }
            }
        });
    }
}

/// 收到信号后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// 在下一个输入边界收尾
    Close,
    /// 立即退出进程
    Exit,
}

#[cfg(unix)]
async fn wait_for_signal() -> InterruptSource {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM, only Ctrl+C will interrupt");
            let _ = tokio::signal::ctrl_c().await;
            return InterruptSource::CtrlC;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => InterruptSource::CtrlC,
        _ = terminate.recv() => InterruptSource::Terminate,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> InterruptSource {
    let _ = tokio::signal::ctrl_c().await;
    InterruptSource::CtrlC
}
