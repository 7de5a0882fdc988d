//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FAMILIAR__*` 覆盖（双下划线表示嵌套，如 `FAMILIAR__LLM__MODEL=...`）。
//! 配置值在启动时构建一次，之后显式传入会话，回合内不再读取进程级状态。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 仓库附带的占位密钥，视同未配置
pub const PLACEHOLDER_API_KEY: &str = "sk-or-v1-abc...";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub persona: PersonaSection,
    pub observation: ObservationSection,
}

/// [app] 段：应用名、历史容量、退出词、日志级别
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 对话历史保留的消息条数（不含系统提示词）
    pub history_capacity: usize,
    /// 退出词，大小写不敏感
    pub exit_keywords: Vec<String>,
    /// 默认日志级别，RUST_LOG 优先
    pub log_level: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Familiar".to_string(),
            history_capacity: 10,
            exit_keywords: vec!["quit".into(), "exit".into(), "bye".into(), "goodbye".into()],
            log_level: "warn".to_string(),
        }
    }
}

/// [llm] 段：端点、模型、凭据与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    /// 直接写在配置里的密钥（优先于 api_key_env）
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// OpenRouter 的 HTTP-Referer
    pub site_url: Option<String>,
    /// OpenRouter 的 X-Title
    pub app_title: Option<String>,
    /// 初始请求是否附带 tools 声明
    pub advertise_tools: bool,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "google/gemini-2.0-flash-001".to_string(),
            api_key: None,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            site_url: Some("http://localhost".to_string()),
            app_title: Some("Familiar".to_string()),
            advertise_tools: true,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 45 }
    }
}

/// [tools] 段：文件工具沙箱目录、读取上限、通知参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub safe_dir: PathBuf,
    pub read_limit_chars: usize,
    pub notification_app_name: String,
    pub notification_title: String,
    pub notification_title_limit: usize,
    pub notification_message_limit: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            safe_dir: PathBuf::from("workspace"),
            read_limit_chars: 2000,
            notification_app_name: "Familiar".to_string(),
            notification_title: "Familiar Notification".to_string(),
            notification_title_limit: 64,
            notification_message_limit: 256,
        }
    }
}

/// [persona] 段：人设文本（内联或文件），都未设置时使用内置的中性人设
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonaSection {
    pub character: Option<String>,
    pub character_file: Option<PathBuf>,
}

/// [observation] 段：观察消息的组成策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservationSection {
    /// 失败详情的最大字符数
    pub max_detail_chars: usize,
    /// 结果文本包含 "Error" 子串时按失败处理（与状态位无关）
    pub lexical_error_marker: bool,
}

impl Default for ObservationSection {
    fn default() -> Self {
        Self {
            max_detail_chars: 500,
            lexical_error_marker: true,
        }
    }
}

impl AppConfig {
    /// 取得可用的 API Key：先看 llm.api_key，再看 llm.api_key_env 指向的环境变量；
    /// 缺失、为空或仍是占位符时返回 AuthConfiguration
    pub fn resolve_api_key(&self) -> Result<String, AgentError> {
        let from_env = || std::env::var(&self.llm.api_key_env).ok();
        let key = self
            .llm
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty() && k.trim() != PLACEHOLDER_API_KEY)
            .or_else(from_env)
            .map(|k| k.trim().to_string())
            .unwrap_or_default();

        if key.is_empty() {
            return Err(AgentError::AuthConfiguration(format!(
                "no API key configured (set llm.api_key or {})",
                self.llm.api_key_env
            )));
        }
        if key == PLACEHOLDER_API_KEY {
            return Err(AgentError::AuthConfiguration(
                "API key is still the placeholder value".to_string(),
            ));
        }
        Ok(key)
    }

    /// 人设文本：inline 优先，其次文件，最后内置默认
    pub fn persona_text(&self) -> Result<String, AgentError> {
        if let Some(text) = self.persona.character.as_ref().filter(|t| !t.trim().is_empty()) {
            return Ok(text.clone());
        }
        if let Some(path) = &self.persona.character_file {
            return std::fs::read_to_string(path).map_err(|e| {
                AgentError::ConfigError(format!("persona file {}: {e}", path.display()))
            });
        }
        Ok(crate::turn::prompt::DEFAULT_PERSONA.to_string())
    }
}

/// 从 config 目录加载配置，环境变量 FAMILIAR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FAMILIAR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FAMILIAR")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("app.exit_keywords")
            .try_parsing(true),
    );

    let c = builder.build()?;
    Ok(c.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.history_capacity, 10);
        assert_eq!(cfg.app.exit_keywords, vec!["quit", "exit", "bye", "goodbye"]);
        assert_eq!(cfg.llm.timeouts.request, 45);
        assert_eq!(cfg.tools.read_limit_chars, 2000);
        assert!(cfg.observation.lexical_error_marker);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[llm]\nmodel = \"other/model\"\n[app]\nhistory_capacity = 4\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.llm.model, "other/model");
        assert_eq!(cfg.llm.timeouts.request, 45);
        assert_eq!(cfg.app.history_capacity, 4);
        assert_eq!(cfg.app.exit_keywords.len(), 4);
    }

    #[test]
    fn test_inline_key_accepted() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("  sk-or-v1-real  ".into());
        assert_eq!(cfg.resolve_api_key().unwrap(), "sk-or-v1-real");
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some(PLACEHOLDER_API_KEY.into());
        cfg.llm.api_key_env = "FAMILIAR_TEST_KEY_THAT_IS_NEVER_SET".into();
        assert!(matches!(cfg.resolve_api_key(), Err(AgentError::AuthConfiguration(_))));
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = None;
        cfg.llm.api_key_env = "FAMILIAR_TEST_KEY_THAT_IS_NEVER_SET".into();
        assert!(matches!(cfg.resolve_api_key(), Err(AgentError::AuthConfiguration(_))));
    }

    #[test]
    fn test_persona_inline_then_default() {
        let mut cfg = AppConfig::default();
        assert!(!cfg.persona_text().unwrap().is_empty());
        cfg.persona.character = Some("You are a teapot.".into());
        assert_eq!(cfg.persona_text().unwrap(), "You are a teapot.");
    }

    #[test]
    fn test_persona_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.txt");
        std::fs::write(&path, "File persona").unwrap();
        let mut cfg = AppConfig::default();
        cfg.persona.character_file = Some(path);
        assert_eq!(cfg.persona_text().unwrap(), "File persona");
    }

    #[test]
    fn test_malformed_config_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[app]\nhistory_capacity = [").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(_)));
        assert!(err.is_fatal());
    }
}
