//! 响应分类器
//!
//! 把一条模型原始回复归为四类之一，优先级固定：
//! 结构化 tool_calls > 文本中内嵌的 JSON 工具调用 > 纯文本 > 错误。
//! 纯函数，不做网络或工具调用；解析异常只记日志并降级。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::core::LlmError;
use crate::llm::{RawReply, ReplyFunction};
use crate::tools::ToolInvocationRequest;

/// 回复结构不可用时的固定诊断
pub const MALFORMED_REPLY: &str =
    "Error: The central core answered with something that is not a usable response. Diagnostics have been noted.";

/// 分类结果：编排器与分类器之间唯一的交接契约
#[derive(Clone, Debug, PartialEq)]
pub enum ClassifiedResponse {
    StandardToolCall(ToolInvocationRequest),
    EmbeddedToolCall(ToolInvocationRequest),
    Text { content: String },
    Error { content: String },
}

impl ClassifiedResponse {
    /// 变体名（用于日志与占位消息）
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedResponse::StandardToolCall(_) => "standard_tool_call",
            ClassifiedResponse::EmbeddedToolCall(_) => "embedded_tool_call",
            ClassifiedResponse::Text { .. } => "text",
            ClassifiedResponse::Error { .. } => "error",
        }
    }
}

/// 代码块内的对象（非贪婪）或从第一个 `{` 起的贪婪匹配
fn embedded_pattern() -> &'static Regex {
    static EMBEDDED: OnceLock<Regex> = OnceLock::new();
    EMBEDDED.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```|(\{.*\})").expect("embedded tool-call pattern is valid")
    })
}

/// 分类一条原始回复
pub fn classify(reply: &RawReply) -> ClassifiedResponse {
    let Some(message) = reply.first_message() else {
        tracing::warn!(choices = reply.choices.len(), "reply has no message");
        return ClassifiedResponse::Error {
            content: MALFORMED_REPLY.to_string(),
        };
    };

    if let Some(function) = message
        .tool_calls
        .as_ref()
        .and_then(|calls| calls.first())
        .and_then(|call| call.function.as_ref())
    {
        return ClassifiedResponse::StandardToolCall(standard_request(function));
    }

    let content = message.content.as_deref().unwrap_or_default();
    if content.is_empty() {
        tracing::warn!("reply has neither tool calls nor content");
        return ClassifiedResponse::Error {
            content: MALFORMED_REPLY.to_string(),
        };
    }

    if let Some(request) = embedded_request(content) {
        return ClassifiedResponse::EmbeddedToolCall(request);
    }

    ClassifiedResponse::Text {
        content: content.trim().to_string(),
    }
}

/// 一次调用的结果（含传输错误）统一归类
pub fn classify_result(result: Result<RawReply, LlmError>) -> ClassifiedResponse {
    match result {
        Ok(reply) => classify(&reply),
        Err(e) => classify_transport(&e),
    }
}

/// 传输错误 → Error，文案面向用户
pub fn classify_transport(err: &LlmError) -> ClassifiedResponse {
    tracing::warn!(error = %err, "model call failed");
    let content = match err {
        LlmError::Timeout => {
            "Error: Communication with the central core timed out. Perhaps it got bored waiting for you.".to_string()
        }
        LlmError::Connection(detail) => {
            format!("Error: Unable to contact the central core. Network issue, or it simply does not like you. Details: {detail}")
        }
        LlmError::Status { status, message } => {
            format!("Error: The central core refused the request (HTTP {status}). Details: {message}")
        }
        LlmError::Decode(_) => "Error: The response from the central core was garbled. Probably your fault.".to_string(),
    };
    ClassifiedResponse::Error { content }
}

fn standard_request(function: &ReplyFunction) -> ToolInvocationRequest {
    let name = function.name.clone().unwrap_or_default();
    let arguments = match &function.arguments {
        None => Value::Null,
        Some(Value::String(raw)) if raw.trim().is_empty() => Value::Null,
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(tool = %name, arguments = %raw, error = %e, "could not parse tool arguments");
            Value::Null
        }),
        Some(other) => other.clone(),
    };
    ToolInvocationRequest::from_value(name, arguments)
}

/// 文本中的 `{"tool_name": ..., "parameters": ...}`；形状不符或解析失败返回 None
fn embedded_request(content: &str) -> Option<ToolInvocationRequest> {
    let caps = embedded_pattern().captures(content)?;
    let candidate = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();

    let parsed: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "embedded JSON candidate did not parse");
            return None;
        }
    };
    let object = parsed.as_object()?;
    let (Some(tool_name), Some(parameters)) = (object.get("tool_name"), object.get("parameters")) else {
        tracing::debug!("embedded JSON lacks tool_name/parameters");
        return None;
    };

    let tool_id = match tool_name {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(ToolInvocationRequest::from_value(tool_id, parameters.clone()))
}
