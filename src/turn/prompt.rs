//! 系统提示词
//!
//! 通用提示词 = 人设 + 工具清单 + 嵌入式调用格式；点评提示词 = 人设 + 只点评、不调用工具的约束。

use crate::tools::{tool_call_schema_json, CapabilityRegistry};

/// 未配置人设时使用的中性人设
pub const DEFAULT_PERSONA: &str = "You are Familiar, a dry-witted assistant that lives on the user's computer. \
You keep answers short, you are a little sarcastic, and you never pretend to have done something you did not do.";

/// 一次会话使用的两份提示词
#[derive(Clone, Debug)]
pub struct PromptSet {
    pub general: String,
    pub commentary: String,
}

impl PromptSet {
    pub fn build(persona: &str, registry: &CapabilityRegistry) -> Self {
        Self {
            general: general_prompt(persona, registry),
            commentary: commentary_prompt(persona),
        }
    }
}

fn general_prompt(persona: &str, registry: &CapabilityRegistry) -> String {
    format!(
        "{persona}\n\n\
## Local tools\n\
You can interact with the user's machine through these tools:\n\
{tools}\n\
## How to call a tool\n\
When a tool is needed, reply with ONLY a JSON object and nothing else:\n\
{{\"tool_name\": \"<name>\", \"parameters\": {{...}}}}\n\
Use {{}} for tools without parameters. The object must match this schema:\n\
```json\n{schema}\n```\n\n\
## Rules\n\
- Call at most one tool per reply.\n\
- Never invent tool names; use only the tools listed above.\n\
- Messages starting with \"System Observation:\" are results of a tool you called.\n\
- When no tool is needed, answer in plain text.",
        tools = registry.describe_for_prompt(),
        schema = tool_call_schema_json(),
    )
}

fn commentary_prompt(persona: &str) -> String {
    format!(
        "{persona}\n\n\
## Commentary\n\
The most recent \"System Observation:\" message describes the outcome of a local operation you requested. \
Comment on it in character, in plain text, addressed to the user.\n\
- Do NOT call any tool and do NOT output JSON.\n\
- If the observation reports an error, say so honestly.\n\
- Keep it to a few sentences."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsSection;
    use crate::tools::default_registry;

    #[test]
    fn test_general_prompt_lists_tools_and_format() {
        let registry = default_registry(&ToolsSection::default()).unwrap();
        let prompts = PromptSet::build("PERSONA", &registry);
        assert!(prompts.general.starts_with("PERSONA"));
        assert!(prompts.general.contains("- read_safe_file:"));
        assert!(prompts.general.contains("\"tool_name\""));
    }

    #[test]
    fn test_commentary_prompt_forbids_tools() {
        let registry = CapabilityRegistry::new();
        let prompts = PromptSet::build("PERSONA", &registry);
        assert!(prompts.commentary.contains("Do NOT call any tool"));
        assert!(!prompts.commentary.contains("## Local tools"));
    }
}
