//! 工具调度器
//!
//! 持有 CapabilityRegistry，dispatch(request) 先查名、再校验参数、最后调用能力；
//! 任何情况下都返回 ToolOutcome，不向外抛错。能力返回 Err 或 panic 都转成调度错误。
//! 每次调用输出结构化审计日志（JSON）。

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::tools::{CapabilityRegistry, OutcomeOrigin, Parameters, ToolOutcome};

/// 模型请求的一次工具调用；parameters 始终是对象
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocationRequest {
    pub tool_id: String,
    pub parameters: Parameters,
}

impl ToolInvocationRequest {
    pub fn new(tool_id: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            tool_id: tool_id.into(),
            parameters,
        }
    }

    /// 任意 JSON 值作为参数：非对象时记录异常并归一为空对象
    pub fn from_value(tool_id: impl Into<String>, parameters: Value) -> Self {
        let tool_id = tool_id.into();
        let parameters = match parameters {
            Value::Object(map) => map,
            Value::Null => Parameters::new(),
            other => {
                tracing::warn!(tool = %tool_id, parameters = %other, "tool parameters are not a mapping, using empty");
                Parameters::new()
            }
        };
        Self { tool_id, parameters }
    }
}

/// 工具调度器
pub struct ToolDispatcher {
    registry: Arc<CapabilityRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// 执行一次调用；未知工具与参数非法在调用能力之前即返回 Failure
    pub fn dispatch(&self, request: &ToolInvocationRequest) -> ToolOutcome {
        let start = Instant::now();
        let outcome = self.dispatch_inner(request);

        let kind = match (outcome.is_success(), outcome.origin) {
            (true, _) => "ok",
            (false, OutcomeOrigin::Capability) => "failure",
            (false, OutcomeOrigin::Rejected) => "rejected",
            (false, OutcomeOrigin::Dispatch) => "dispatch_error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": request.tool_id,
            "ok": outcome.is_success(),
            "outcome": kind,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&request.parameters),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        outcome
    }

    fn dispatch_inner(&self, request: &ToolInvocationRequest) -> ToolOutcome {
        let Some(capability) = self.registry.get(&request.tool_id) else {
            tracing::warn!(tool = %request.tool_id, "unknown tool requested");
            return ToolOutcome::rejected(format!("unknown tool '{}'", request.tool_id));
        };

        let params = match self.registry.validate_parameters(&request.tool_id, &request.parameters) {
            Ok(params) => params,
            Err(param) => {
                tracing::warn!(tool = %request.tool_id, param = %param, "parameter validation failed");
                return ToolOutcome::rejected(format!("{param}-missing-or-invalid"));
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| capability.invoke(&params))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(tool = %request.tool_id, error = %e, "capability raised");
                ToolOutcome::dispatch_error(format!("{e:#}"))
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "capability panicked".to_string());
                tracing::warn!(tool = %request.tool_id, detail = %detail, "capability panicked");
                ToolOutcome::dispatch_error(detail)
            }
        }
    }
}

fn args_preview(args: &Parameters) -> String {
    let s = Value::Object(args.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
