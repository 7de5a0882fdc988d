//! 模型请求与原始回复
//!
//! ModelRequest 是每次调用的完整输入（系统提示词单独携带，发送时临时前置）；
//! RawReply 按 OpenAI 兼容的 chat/completions 形状宽松反序列化，所有字段都可缺省，
//! 形状是否可用由分类器判断。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::{ConversationHistory, Message};

/// 工具使用开关：初始请求为 Auto，点评阶段必须为 None
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
        }
    }
}

/// 随请求下发的工具声明（function calling 格式）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema object
    pub parameters: Value,
}

/// 单次模型调用
#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub system_message: String,
    pub messages: Vec<Message>,
    pub tool_choice: ToolChoice,
    pub tools: Vec<ToolSpec>,
}

impl ModelRequest {
    pub fn new(system_message: impl Into<String>, history: &ConversationHistory, tool_choice: ToolChoice) -> Self {
        Self {
            system_message: system_message.into(),
            messages: history.snapshot(),
            tool_choice,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// 发送用的消息序列：系统提示词在最前
    pub fn wire_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(Message::system(self.system_message.clone()));
        out.extend(self.messages.iter().cloned());
        out
    }
}

/// chat/completions 响应体
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawReply {
    #[serde(default)]
    pub choices: Vec<ReplyChoice>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplyChoice {
    #[serde(default)]
    pub message: Option<ReplyMessage>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ReplyToolCall>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplyToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<ReplyFunction>,
}

/// arguments 通常是 JSON 编码的字符串，部分网关会直接给对象，这里统一收成 Value
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplyFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl RawReply {
    /// 只含文本内容的回复
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_message(ReplyMessage {
            content: Some(content.into()),
            tool_calls: None,
        })
    }

    /// 只含一个结构化工具调用的回复；arguments 为 JSON 编码字符串
    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::from_message(ReplyMessage {
            content: None,
            tool_calls: Some(vec![ReplyToolCall {
                id: Some("call_0".to_string()),
                function: Some(ReplyFunction {
                    name: Some(name.into()),
                    arguments: Some(Value::String(arguments.into())),
                }),
            }]),
        })
    }

    pub fn from_message(message: ReplyMessage) -> Self {
        Self {
            choices: vec![ReplyChoice { message: Some(message) }],
        }
    }

    /// 第一条 choice 的 message
    pub fn first_message(&self) -> Option<&ReplyMessage> {
        self.choices.first().and_then(|c| c.message.as_ref())
    }
}
