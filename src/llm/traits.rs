//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：一次请求对应一次 complete，
//! 超时与网络错误以 LlmError 返回，由上层决定如何呈现。

use async_trait::async_trait;

use crate::core::LlmError;
use crate::llm::{ModelRequest, RawReply};

/// LLM 客户端 trait：非流式完成，返回原始回复
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<RawReply, LlmError>;

    /// 后端标识（用于日志）
    fn name(&self) -> &str {
        "llm"
    }
}
