//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序回放预先排好的回复，并记录收到的每个请求，便于断言调用次数与 tool_choice。
//! 克隆体共享同一份脚本与记录。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::LlmError;
use crate::llm::{LlmClient, ModelRequest, RawReply};

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<RawReply, LlmError>>,
    requests: Vec<ModelRequest>,
}

/// Mock 客户端：脚本耗尽时返回连接错误
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    script: Arc<Mutex<Script>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = RawReply>) -> Self {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, reply: RawReply) {
        self.lock().replies.push_back(Ok(reply));
    }

    pub fn push_error(&self, err: LlmError) {
        self.lock().replies.push_back(Err(err));
    }

    /// 已收到的请求（按调用顺序）
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &ModelRequest) -> Result<RawReply, LlmError> {
        let mut script = self.lock();
        script.requests.push(request.clone());
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Connection("mock script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolChoice;
    use crate::memory::ConversationHistory;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let mock = MockLlmClient::with_replies([RawReply::text("one"), RawReply::text("two")]);
        let history = ConversationHistory::new(2);
        let req = ModelRequest::new("sys", &history, ToolChoice::None);

        let first = mock.complete(&req).await.unwrap();
        assert_eq!(first.first_message().unwrap().content.as_deref(), Some("one"));
        let _ = mock.complete(&req).await.unwrap();
        assert!(matches!(mock.complete(&req).await, Err(LlmError::Connection(_))));

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.tool_choice == ToolChoice::None));
    }

    #[tokio::test]
    async fn test_clones_share_script() {
        let mock = MockLlmClient::new();
        let handle = mock.clone();
        mock.push_error(LlmError::Timeout);
        let history = ConversationHistory::new(1);
        let req = ModelRequest::new("sys", &history, ToolChoice::Auto);
        assert_eq!(handle.complete(&req).await.unwrap_err(), LlmError::Timeout);
        assert_eq!(mock.call_count(), 1);
    }
}
