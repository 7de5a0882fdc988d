//! 嵌入式工具调用的 JSON Schema 生成（schemars）
//!
//! 用于将「合法 tool call」的 JSON 结构注入 system prompt，减少 LLM 输出格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 文本内嵌的工具调用格式 `{"tool_name": "...", "parameters": {...}}`（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct EmbeddedToolCall {
    /// 工具名，如 list_safe_directory、read_safe_file、get_cpu_usage
    pub tool_name: String,
    /// 工具参数，依工具不同而不同（filename、path、message、title 等）；无参数时为 {}
    pub parameters: HashMap<String, Value>,
}

/// 返回嵌入式工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(EmbeddedToolCall);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
