//! 会话装配
//!
//! 由启动时构建好的 AppConfig 组装能力注册表、LLM 客户端、提示词、编排器与会话。
//! 凭据校验在这里完成，失败即为致命错误，不会进入主循环。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, OrchestratorSettings, Session, SessionInterrupt, TurnOrchestrator};
use crate::llm::{LlmClient, OpenAiClient};
use crate::tools::{default_registry, CapabilityRegistry};
use crate::turn::PromptSet;

/// 用生产客户端（OpenAI 兼容 / OpenRouter）构建会话
pub fn build_session(config: &AppConfig, interrupt: SessionInterrupt) -> Result<Session, AgentError> {
    let api_key = config.resolve_api_key()?;
    let client: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(&config.llm, api_key)?);
    let registry = default_registry(&config.tools)?;
    assemble_session(config, client, registry, interrupt)
}

/// 用任意客户端与注册表构建会话（测试注入 Mock 客户端与自定义能力）
pub fn assemble_session(
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    registry: CapabilityRegistry,
    interrupt: SessionInterrupt,
) -> Result<Session, AgentError> {
    let persona = config.persona_text()?;
    let prompts = PromptSet::build(&persona, &registry);
    let settings = OrchestratorSettings {
        history_capacity: config.app.history_capacity,
        advertise_tools: config.llm.advertise_tools,
        observation: config.observation.clone(),
    };

    tracing::info!(
        client = client.name(),
        tools = registry.len(),
        history_capacity = settings.history_capacity,
        "assembling session"
    );

    let orchestrator = TurnOrchestrator::new(client, Arc::new(registry), prompts, settings);
    Ok(Session::new(orchestrator, config.app.exit_keywords.clone(), interrupt)
        .with_startup_warnings(startup_warnings(config)))
}

/// 启动时需要提醒用户的配置问题
pub fn startup_warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if !config.tools.safe_dir.is_dir() {
        warnings.push(format!(
            "Warning: the safe directory '{}' does not exist. File tools will report errors until it is created.",
            config.tools.safe_dir.display()
        ));
    }
    warnings
}
