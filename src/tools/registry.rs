//! 能力注册表
//!
//! 所有本地能力实现 Capability trait（name / description / parameters / invoke），由 CapabilityRegistry
//! 按名注册与查找。参数声明在注册时校验一次；调用前由 validate_parameters 校验实参。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::core::AgentError;
use crate::llm::ToolSpec;

/// 能力实参：始终是 JSON 对象
pub type Parameters = Map<String, Value>;

/// 参数的原始类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// 路径样式的字符串（非空、不含 NUL）
    Path,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String | ParamKind::Path => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    /// 值是否满足该类型
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            ParamKind::Path => value
                .as_str()
                .is_some_and(|s| !s.trim().is_empty() && !s.contains('\0')),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// 单个参数声明
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// 成功结果在观察消息中的呈现方式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObservationMode {
    /// 直接带上结果文本
    Inline,
    /// 结果可能是大块或敏感内容，只写出目标（取自指定参数）
    Redacted { target_param: &'static str },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// 结果来源：能力自身 / 调度前被拒绝（未知工具、参数非法）/ 调用时抛错
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeOrigin {
    Capability,
    Rejected,
    Dispatch,
}

/// 一次能力调用的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutcome {
    pub status: OutcomeStatus,
    pub text: String,
    pub origin: OutcomeOrigin,
}

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            text: text.into(),
            origin: OutcomeOrigin::Capability,
        }
    }

    /// 能力自报的领域失败（如文件不存在）
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            text: text.into(),
            origin: OutcomeOrigin::Capability,
        }
    }

    pub fn rejected(text: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            text: text.into(),
            origin: OutcomeOrigin::Rejected,
        }
    }

    pub fn dispatch_error(detail: impl fmt::Display) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            text: format!("dispatch error: {detail}"),
            origin: OutcomeOrigin::Dispatch,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// 能力 trait：名称、描述（供 LLM 理解）、参数声明、同步调用
///
/// 预期内的失败返回 `Ok(ToolOutcome::failure(..))`；真正的异常返回 `Err`，由调度器转成调度错误。
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    fn observation(&self) -> ObservationMode {
        ObservationMode::Inline
    }

    fn invoke(&self, params: &Parameters) -> anyhow::Result<ToolOutcome>;
}

struct Entry {
    capability: Arc<dyn Capability>,
    params: Vec<ParamSpec>,
}

/// 能力注册表：按名称有序存储，保证工具列表与 prompt 的输出稳定
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Entry>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册能力；名称为空或重复、参数重名、必填参数带默认值时拒绝
    pub fn register(&mut self, capability: impl Capability + 'static) -> Result<(), AgentError> {
        let name = capability.name().trim().to_string();
        if name.is_empty() {
            return Err(AgentError::Registration("capability name is empty".to_string()));
        }
        if self.entries.contains_key(&name) {
            return Err(AgentError::Registration(format!("duplicate capability '{name}'")));
        }

        let params = capability.parameters();
        for (i, spec) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == spec.name) {
                return Err(AgentError::Registration(format!(
                    "capability '{name}' declares parameter '{}' twice",
                    spec.name
                )));
            }
            if spec.required && spec.default.is_some() {
                return Err(AgentError::Registration(format!(
                    "capability '{name}': required parameter '{}' cannot have a default",
                    spec.name
                )));
            }
            if let Some(default) = &spec.default {
                if !spec.kind.accepts(default) {
                    return Err(AgentError::Registration(format!(
                        "capability '{name}': default for '{}' does not match its type",
                        spec.name
                    )));
                }
            }
        }

        tracing::debug!(capability = %name, params = params.len(), "registered capability");
        self.entries.insert(
            name,
            Entry {
                capability: Arc::new(capability),
                params,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).map(|e| e.capability.clone())
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 已注册的参数声明
    pub fn params_of(&self, name: &str) -> Option<&[ParamSpec]> {
        self.entries.get(name).map(|e| e.params.as_slice())
    }

    /// 返回 (name, mode) 中需要脱敏的能力
    pub fn redacted_targets(&self) -> Vec<(String, &'static str)> {
        self.entries
            .iter()
            .filter_map(|(name, e)| match e.capability.observation() {
                ObservationMode::Redacted { target_param } => Some((name.clone(), target_param)),
                ObservationMode::Inline => None,
            })
            .collect()
    }

    /// 按声明校验实参，返回补全默认值后的参数；失败时给出首个不合法的参数名
    pub fn validate_parameters(&self, name: &str, params: &Parameters) -> Result<Parameters, String> {
        let specs = self.params_of(name).unwrap_or(&[]);
        let mut resolved = params.clone();
        for spec in specs {
            match params.get(spec.name) {
                Some(value) if spec.kind.accepts(value) => {}
                Some(value) if !spec.required => {
                    tracing::warn!(
                        tool = name,
                        param = spec.name,
                        value = %value,
                        "optional parameter has wrong type, falling back to default"
                    );
                    match &spec.default {
                        Some(default) => {
                            resolved.insert(spec.name.to_string(), default.clone());
                        }
                        None => {
                            resolved.remove(spec.name);
                        }
                    }
                }
                None if !spec.required => {
                    if let Some(default) = &spec.default {
                        resolved.insert(spec.name.to_string(), default.clone());
                    }
                }
                _ => return Err(spec.name.to_string()),
            }
        }
        Ok(resolved)
    }

    /// function calling 用的工具声明
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.entries
            .iter()
            .map(|(name, e)| ToolSpec {
                name: name.clone(),
                description: e.capability.description().to_string(),
                parameters: parameters_schema(&e.params),
            })
            .collect()
    }

    /// 人类可读的工具清单（含参数），拼入 system prompt
    pub fn describe_for_prompt(&self) -> String {
        let mut out = String::new();
        for (name, e) in &self.entries {
            out.push_str(&format!("- {name}: {}\n", e.capability.description()));
            for p in &e.params {
                let req = if p.required { "required" } else { "optional" };
                out.push_str(&format!(
                    "    - {} ({}, {req}): {}\n",
                    p.name,
                    p.kind.json_type(),
                    p.description
                ));
            }
        }
        out
    }
}

/// 参数声明 → JSON Schema object
pub fn parameters_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        let mut prop = json!({ "type": p.kind.json_type(), "description": p.description });
        if let Some(default) = &p.default {
            prop["default"] = default.clone();
        }
        properties.insert(p.name.to_string(), prop);
        if p.required {
            required.push(Value::String(p.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
