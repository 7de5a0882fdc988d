//! 观察消息组成
//!
//! 把一次工具结果写成一条 System 消息喂回模型。失败时带上（截断后的）失败文本；
//! 成功时，脱敏工具只写出目标名，其余工具直接带结果。

use std::collections::HashMap;

use crate::config::ObservationSection;
use crate::memory::Message;
use crate::tools::{CapabilityRegistry, OutcomeOrigin, OutcomeStatus, Parameters, ToolOutcome};

/// 观察消息组成器
#[derive(Clone, Debug)]
pub struct ObservationComposer {
    /// tool_id → 作为目标名的参数
    redacted: HashMap<String, &'static str>,
    max_detail_chars: usize,
    lexical_error_marker: bool,
}

impl ObservationComposer {
    pub fn new(redacted: impl IntoIterator<Item = (String, &'static str)>, policy: &ObservationSection) -> Self {
        Self {
            redacted: redacted.into_iter().collect(),
            max_detail_chars: policy.max_detail_chars,
            lexical_error_marker: policy.lexical_error_marker,
        }
    }

    pub fn from_registry(registry: &CapabilityRegistry, policy: &ObservationSection) -> Self {
        Self::new(registry.redacted_targets(), policy)
    }

    /// 是否按失败处理：状态为 Failure，或开启词法标记且文本含 "Error"
    pub fn is_failure(&self, outcome: &ToolOutcome) -> bool {
        outcome.status == OutcomeStatus::Failure || (self.lexical_error_marker && outcome.text.contains("Error"))
    }

    pub fn compose(&self, tool_id: &str, parameters: &Parameters, outcome: &ToolOutcome) -> Message {
        let content = if outcome.origin == OutcomeOrigin::Dispatch {
            format!(
                "System Observation: Error during execution of tool '{tool_id}'. Details: {}",
                self.bounded(&outcome.text)
            )
        } else if self.is_failure(outcome) {
            if outcome.status == OutcomeStatus::Success {
                tracing::debug!(tool = tool_id, "successful result treated as failure by lexical marker");
            }
            format!(
                "System Observation: Tool '{tool_id}' reported an error. Details: {}",
                self.bounded(&outcome.text)
            )
        } else {
            match self.redacted_target(tool_id, parameters) {
                Some(target) => format!("System Observation: Tool '{tool_id}' executed successfully on file '{target}'."),
                None => format!(
                    "System Observation: Tool '{tool_id}' executed successfully. Result data: {}",
                    outcome.text
                ),
            }
        };
        Message::system(content)
    }

    fn redacted_target<'a>(&self, tool_id: &str, parameters: &'a Parameters) -> Option<&'a str> {
        let param = self.redacted.get(tool_id)?;
        parameters.get(*param).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }

    fn bounded(&self, text: &str) -> String {
        match text.char_indices().nth(self.max_detail_chars) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text.to_string(),
        }
    }
}
