//! 点评阶段
//!
//! 工具结果写入历史后，以 tool_choice = "none" 再请求一次模型，只接受纯文本。
//! 其它任何形状都视为阶段失败并换成占位消息，绝不重新进入调度。

use std::sync::Arc;

use crate::core::state::Emission;
use crate::llm::{LlmClient, ModelRequest, ToolChoice};
use crate::memory::ConversationHistory;
use crate::turn::classifier::{classify_result, ClassifiedResponse};
use crate::ui::OutputKind;

/// 被点评的对象：正常结果，或调用时抛出的错误（占位文案不同）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentarySubject {
    Outcome,
    DispatchError,
}

/// 点评阶段：持有客户端与点评提示词
pub struct CommentaryStage {
    client: Arc<dyn LlmClient>,
    prompt: String,
}

impl CommentaryStage {
    pub fn new(client: Arc<dyn LlmClient>, prompt: impl Into<String>) -> Self {
        Self {
            client,
            prompt: prompt.into(),
        }
    }

    /// 以禁用工具的方式请求点评并分类
    pub async fn get_commentary(&self, history: &ConversationHistory) -> ClassifiedResponse {
        let request = ModelRequest::new(self.prompt.clone(), history, ToolChoice::None);
        classify_result(self.client.complete(&request).await)
    }
}

/// 把点评结果落成一次输出；非文本一律变为占位消息
pub fn settle(response: ClassifiedResponse, subject: CommentarySubject) -> Emission {
    let on_error = subject == CommentarySubject::DispatchError;
    match response {
        ClassifiedResponse::Text { content } if !content.is_empty() => Emission::reply(content),
        ClassifiedResponse::Text { .. } => {
            tracing::warn!(?subject, "commentary was empty");
            let (said, recorded) = if on_error {
                ("An error occurred, and apparently I am speechless about it.", "[Error commentary was empty]")
            } else {
                ("I... have nothing to say about that. How unusual.", "[Commentary was empty]")
            };
            Emission::new(OutputKind::Status, said, Some(recorded.to_string()))
        }
        ClassifiedResponse::Error { content } => {
            tracing::warn!(?subject, "commentary request failed");
            let recorded = if on_error {
                format!("[Error Commentary Error: {content}]")
            } else {
                format!("[Commentary Error: {content}]")
            };
            Emission::new(OutputKind::Failure, content, Some(recorded))
        }
        other => {
            let kind = other.kind();
            tracing::warn!(?subject, kind, "commentary returned a non-text shape, discarding");
            let (said, recorded) = if on_error {
                (
                    format!("An error occurred, and then I attempted a '{kind}'. This is getting ridiculous."),
                    format!("[Error Commentary Failed: Unexpected type {kind}]"),
                )
            } else {
                (
                    format!("I seem to have attempted a '{kind}' when I should have been commenting. Ignore that."),
                    format!("[Commentary Failed: Unexpected type {kind}]"),
                )
            };
            Emission::new(OutputKind::Failure, said, Some(recorded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, RawReply};
    use crate::memory::Message;
    use crate::tools::{Parameters, ToolInvocationRequest};

    #[tokio::test]
    async fn test_commentary_request_disables_tools() {
        let mock = MockLlmClient::with_replies([RawReply::text("  Lovely.  ")]);
        let stage = CommentaryStage::new(Arc::new(mock.clone()), "COMMENTARY");
        let mut history = ConversationHistory::new(4);
        history.push(Message::system("System Observation: ..."));

        let response = stage.get_commentary(&history).await;
        assert_eq!(response, ClassifiedResponse::Text { content: "Lovely.".into() });

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_choice, ToolChoice::None);
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[0].system_message, "COMMENTARY");
    }

    #[test]
    fn test_text_is_recorded_verbatim() {
        let e = settle(ClassifiedResponse::Text { content: "Done.".into() }, CommentarySubject::Outcome);
        assert_eq!(e.kind, OutputKind::Reply);
        assert_eq!(e.record.as_deref(), Some("Done."));
    }

    #[test]
    fn test_empty_text_placeholder() {
        let e = settle(ClassifiedResponse::Text { content: String::new() }, CommentarySubject::Outcome);
        assert_eq!(e.record.as_deref(), Some("[Commentary was empty]"));
        let e = settle(ClassifiedResponse::Text { content: String::new() }, CommentarySubject::DispatchError);
        assert_eq!(e.record.as_deref(), Some("[Error commentary was empty]"));
    }

    #[test]
    fn test_error_placeholder() {
        let e = settle(ClassifiedResponse::Error { content: "timeout".into() }, CommentarySubject::Outcome);
        assert_eq!(e.kind, OutputKind::Failure);
        assert_eq!(e.text, "timeout");
        assert_eq!(e.record.as_deref(), Some("[Commentary Error: timeout]"));
    }

    #[test]
    fn test_tool_call_placeholder() {
        let call = ClassifiedResponse::StandardToolCall(ToolInvocationRequest::new("get_cpu_usage", Parameters::new()));
        let e = settle(call, CommentarySubject::Outcome);
        assert_eq!(e.record.as_deref(), Some("[Commentary Failed: Unexpected type standard_tool_call]"));
        let call = ClassifiedResponse::EmbeddedToolCall(ToolInvocationRequest::new("x", Parameters::new()));
        let e = settle(call, CommentarySubject::DispatchError);
        assert_eq!(e.record.as_deref(), Some("[Error Commentary Failed: Unexpected type embedded_tool_call]"));
    }
}
