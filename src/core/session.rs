//! 会话循环
//!
//! 在 AwaitingInput 边界读取输入并判定（空行忽略、退出词/中断/EOF 收尾），其余交给编排器跑一个回合。
//! 回合内的未处理故障（错误或 panic）上报给用户后继续下一回合；每个会话恰好输出一条告别语。

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::orchestrator::TurnOrchestrator;
use crate::core::interrupt::SessionInterrupt;
use crate::core::state::{admit, Admission, CloseReason};
use crate::core::AgentError;
use crate::memory::ConversationHistory;
use crate::ui::{InputSource, OutputChannel, OutputKind};

pub const GREETING: &str = "Oh. It's you.";

/// 回合内出现未处理故障时的提示
pub const FAULT_NOTICE: &str =
    "A critical error occurred. This is usually where the test subject spontaneously combusts. Watch out.";

/// 各收尾原因对应的告别语
pub fn farewell(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::ExitKeyword => "Fine. Abandon the session. See if I care.",
        CloseReason::Interrupted => "Attempting to terminate the session prematurely? Fine.",
        CloseReason::EndOfInput => "Leaving so soon? The exit is that way. Probably.",
    }
}

/// 单个会话：编排器 + 退出词 + 中断句柄
pub struct Session {
    id: Uuid,
    orchestrator: TurnOrchestrator,
    exit_keywords: Vec<String>,
    interrupt: SessionInterrupt,
    startup_warnings: Vec<String>,
}

impl Session {
    pub fn new(orchestrator: TurnOrchestrator, exit_keywords: Vec<String>, interrupt: SessionInterrupt) -> Self {
        Self {
            id: Uuid::new_v4(),
            orchestrator,
            exit_keywords,
            interrupt,
            startup_warnings: Vec::new(),
        }
    }

    /// 会话开始时呈现的告警（如沙箱目录不存在）
    pub fn with_startup_warnings(mut self, warnings: Vec<String>) -> Self {
        self.startup_warnings = warnings;
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        self.orchestrator.history()
    }

    /// 运行到会话结束，返回收尾原因；只有输出通道本身失败时返回 Err
    pub async fn run(
        &mut self,
        input: &mut dyn InputSource,
        output: &mut dyn OutputChannel,
    ) -> Result<CloseReason, AgentError> {
        let span = tracing::info_span!("session", id = %self.id);
        self.run_inner(input, output).instrument(span).await
    }

    async fn run_inner(
        &mut self,
        input: &mut dyn InputSource,
        output: &mut dyn OutputChannel,
    ) -> Result<CloseReason, AgentError> {
        output.emit(OutputKind::Reply, GREETING)?;
        for warning in &self.startup_warnings {
            output.emit(OutputKind::Warning, warning)?;
        }

        loop {
            if self.interrupt.is_triggered() {
                return self.close(CloseReason::Interrupted, output);
            }

            let text = match admit(input.next_event().await, &self.exit_keywords) {
                Admission::Ignore => continue,
                Admission::Close(reason) => return self.close(reason, output),
                Admission::Turn(text) => text,
            };

            let turn = AssertUnwindSafe(self.orchestrator.run_turn(text, &mut *output))
                .catch_unwind()
                .await;
            let fault = match turn {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(
                    payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "turn panicked".to_string()),
                ),
            };
            if let Some(detail) = fault {
                tracing::error!(detail = %detail, "orchestration fault, continuing with next turn");
                output.emit(OutputKind::Failure, FAULT_NOTICE)?;
            }
        }
    }

    fn close(&self, reason: CloseReason, output: &mut dyn OutputChannel) -> Result<CloseReason, AgentError> {
        tracing::info!(
            ?reason,
            source = ?self.interrupt.source(),
            history = self.orchestrator.history().len(),
            "session closed"
        );
        output.emit(OutputKind::Farewell, farewell(reason))?;
        Ok(reason)
    }
}
