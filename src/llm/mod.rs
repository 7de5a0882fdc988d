//! LLM 层：客户端抽象、请求/回复类型与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;
pub mod types;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;
pub use types::{
    ModelRequest, RawReply, ReplyChoice, ReplyFunction, ReplyMessage, ReplyToolCall, ToolChoice, ToolSpec,
};
