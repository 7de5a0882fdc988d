//! OpenAI 兼容 API 客户端
//!
//! 直接用 reqwest 调用 chat/completions 端点（默认 OpenRouter），以便原样携带
//! tool_choice、tools 与 OpenRouter 的 HTTP-Referer / X-Title 头，并拿到未经加工的 tool_calls。
//! 每次请求带显式超时，超时与非 2xx 都不重试。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::LlmSection;
use crate::core::{AgentError, LlmError};
use crate::llm::{LlmClient, ModelRequest, RawReply};

/// OpenAI 兼容客户端：持有 HTTP Client、端点与 model 名
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    headers: HeaderMap,
}

impl OpenAiClient {
    /// api_key 应已通过 AppConfig::resolve_api_key 校验
    pub fn new(settings: &LlmSection, api_key: String) -> Result<Self, AgentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeouts.request))
            .build()
            .map_err(|e| AgentError::ConfigError(format!("HTTP client build failed: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("http-referer", settings.site_url.as_deref()),
            ("x-title", settings.app_title.as_deref()),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                match HeaderValue::from_str(value) {
                    Ok(v) => {
                        headers.insert(HeaderName::from_static(name), v);
                    }
                    Err(_) => tracing::warn!(header = name, "Skipping header with invalid value"),
                }
            }
        }

        Ok(Self {
            http,
            endpoint: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key,
            headers,
        })
    }

    /// 组装请求体；仅当有工具声明时才携带 tools
    pub fn build_payload(&self, request: &ModelRequest) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": request.wire_messages(),
            "tool_choice": request.tool_choice.as_str(),
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            payload["tools"] = Value::Array(tools);
        }
        payload
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &ModelRequest) -> Result<RawReply, LlmError> {
        let payload = self.build_payload(request);
        tracing::debug!(
            model = %self.model,
            tool_choice = request.tool_choice.as_str(),
            messages = request.messages.len(),
            "chat completion request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Connection(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str::<RawReply>(&body).map_err(|e| LlmError::Decode(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// 从错误响应体中取 error.message，取不到时返回截断的原文
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
