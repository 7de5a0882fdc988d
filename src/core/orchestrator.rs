//! 回合编排器
//!
//! 以显式状态机驱动一个用户回合：Requesting → {Dispatching → Observing → RequestingCommentary → Emitting} | {Emitting}。
//! advance 只做一次状态转移，便于单独测试；run_turn 从 Requesting 跑到回到 AwaitingInput。
//! 对话历史由编排器独占，只在状态转移之间修改。

use std::sync::Arc;

use crate::config::ObservationSection;
use crate::core::state::{Emission, TurnState};
use crate::core::AgentError;
use crate::llm::{LlmClient, ModelRequest, ToolChoice, ToolSpec};
use crate::memory::{ConversationHistory, Message};
use crate::tools::{CapabilityRegistry, OutcomeOrigin, ToolDispatcher};
use crate::turn::commentary::{settle, CommentaryStage, CommentarySubject};
use crate::turn::{classify_result, ClassifiedResponse, ObservationComposer, PromptSet};
use crate::ui::{OutputChannel, OutputKind};

/// 工具成功但没有产出内容时的回复
pub const EMPTY_RESULT_REPLY: &str =
    "The requested local operation produced no meaningful result. How utterly predictable.";

/// 编排器的构造参数
#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    pub history_capacity: usize,
    /// 初始请求是否附带 tools 声明
    pub advertise_tools: bool,
    pub observation: ObservationSection,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            advertise_tools: true,
            observation: ObservationSection::default(),
        }
    }
}

/// 回合编排器：持有客户端、调度器、观察组成器、点评阶段、提示词与对话历史
pub struct TurnOrchestrator {
    client: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    composer: ObservationComposer,
    commentary: CommentaryStage,
    general_prompt: String,
    tools: Vec<ToolSpec>,
    history: ConversationHistory,
}

impl TurnOrchestrator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        registry: Arc<CapabilityRegistry>,
        prompts: PromptSet,
        settings: OrchestratorSettings,
    ) -> Self {
        let tools = if settings.advertise_tools {
            registry.tool_specs()
        } else {
            Vec::new()
        };
        Self {
            composer: ObservationComposer::from_registry(&registry, &settings.observation),
            commentary: CommentaryStage::new(client.clone(), prompts.commentary),
            dispatcher: ToolDispatcher::new(registry),
            client,
            general_prompt: prompts.general,
            tools,
            history: ConversationHistory::new(settings.history_capacity),
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// 执行一个完整回合，直到回到 AwaitingInput
    pub async fn run_turn(&mut self, input: String, output: &mut dyn OutputChannel) -> Result<(), AgentError> {
        let mut state = TurnState::Requesting { input };
        loop {
            state = self.advance(state, output).await?;
            if state == TurnState::AwaitingInput {
                return Ok(());
            }
        }
    }

    /// 单步状态转移
    pub async fn advance(&mut self, state: TurnState, output: &mut dyn OutputChannel) -> Result<TurnState, AgentError> {
        let from = state.name();
        let next = match state {
            TurnState::Requesting { input } => self.request(input).await,
            TurnState::Dispatching { request } => {
                output.emit(
                    OutputKind::Status,
                    &format!("Acknowledged. Attempting local system interaction: {}", request.tool_id),
                )?;
                let outcome = self.dispatcher.dispatch(&request);
                if outcome.origin == OutcomeOrigin::Dispatch {
                    output.emit(
                        OutputKind::Failure,
                        &format!(
                            "An internal malfunction occurred while attempting to execute '{}'. Or maybe I just did not feel like it.",
                            request.tool_id
                        ),
                    )?;
                }
                if outcome.is_success() && outcome.text.trim().is_empty() {
                    TurnState::Emitting(Emission::reply(EMPTY_RESULT_REPLY))
                } else {
                    TurnState::Observing { request, outcome }
                }
            }
            TurnState::Observing { request, outcome } => {
                let observation = self.composer.compose(&request.tool_id, &request.parameters, &outcome);
                tracing::info!(tool = %request.tool_id, observation = %observation.content, "observation logged");
                self.history.push(observation);
                let subject = if outcome.origin == OutcomeOrigin::Dispatch {
                    CommentarySubject::DispatchError
                } else {
                    CommentarySubject::Outcome
                };
                TurnState::RequestingCommentary { subject }
            }
            TurnState::RequestingCommentary { subject } => {
                let response = self.commentary.get_commentary(&self.history).await;
                TurnState::Emitting(settle(response, subject))
            }
            TurnState::Emitting(emission) => {
                output.emit(emission.kind, &emission.text)?;
                if let Some(record) = emission.record {
                    self.history.push(Message::assistant(record));
                }
                TurnState::AwaitingInput
            }
            TurnState::AwaitingInput | TurnState::Closed(_) => {
                return Err(AgentError::Orchestration(format!("cannot advance from '{from}' inside a turn")));
            }
        };
        tracing::debug!(from, to = next.name(), history = self.history.len(), "turn transition");
        Ok(next)
    }

    /// 记录用户消息，以通用提示词、tool_choice=auto 请求并分类
    async fn request(&mut self, input: String) -> TurnState {
        self.history.push(Message::user(input));
        let request = ModelRequest::new(self.general_prompt.clone(), &self.history, ToolChoice::Auto)
            .with_tools(self.tools.clone());
        let response = classify_result(self.client.complete(&request).await);
        match response {
            ClassifiedResponse::StandardToolCall(request) | ClassifiedResponse::EmbeddedToolCall(request) => {
                TurnState::Dispatching { request }
            }
            ClassifiedResponse::Text { content } => TurnState::Emitting(Emission::reply(content)),
            ClassifiedResponse::Error { content } => TurnState::Emitting(Emission::failure(content)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LlmError;
    use crate::llm::{MockLlmClient, RawReply};
    use crate::memory::Role;
    use crate::tools::{Capability, Parameters, ToolInvocationRequest, ToolOutcome};
    use crate::ui::RecordingOutput;

    struct Fixed(&'static str, &'static str);

    impl Capability for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "fixed"
        }

        fn invoke(&self, _params: &Parameters) -> anyhow::Result<ToolOutcome> {
            Ok(ToolOutcome::success(self.1))
        }
    }

    fn orchestrator(mock: &MockLlmClient) -> TurnOrchestrator {
        let mut registry = CapabilityRegistry::new();
        registry.register(Fixed("get_cpu_usage", "Current overall CPU load is 7.0%.")).unwrap();
        registry.register(Fixed("silent", "")).unwrap();
        TurnOrchestrator::new(
            Arc::new(mock.clone()),
            Arc::new(registry),
            PromptSet {
                general: "GENERAL".into(),
                commentary: "COMMENTARY".into(),
            },
            OrchestratorSettings::default(),
        )
    }

    fn cpu_request() -> ToolInvocationRequest {
        ToolInvocationRequest::new("get_cpu_usage", Parameters::new())
    }

    #[tokio::test]
    async fn test_requesting_text_goes_to_emitting() {
        let mock = MockLlmClient::with_replies([RawReply::text("Hello.")]);
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let next = orch
            .advance(TurnState::Requesting { input: "hi".into() }, &mut out)
            .await
            .unwrap();
        assert_eq!(next, TurnState::Emitting(Emission::reply("Hello.")));
        assert_eq!(orch.history().len(), 1);
        let req = &mock.requests()[0];
        assert_eq!(req.tool_choice, ToolChoice::Auto);
        assert_eq!(req.system_message, "GENERAL");
        assert_eq!(req.tools.len(), 2);
    }

    #[tokio::test]
    async fn test_requesting_tool_call_goes_to_dispatching() {
        let mock = MockLlmClient::with_replies([RawReply::tool_call("get_cpu_usage", "{}")]);
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let next = orch
            .advance(TurnState::Requesting { input: "cpu?".into() }, &mut out)
            .await
            .unwrap();
        assert_eq!(next, TurnState::Dispatching { request: cpu_request() });
    }

    #[tokio::test]
    async fn test_transport_error_is_not_recorded() {
        let mock = MockLlmClient::new();
        mock.push_error(LlmError::Timeout);
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        orch.run_turn("hi".into(), &mut out).await.unwrap();
        assert_eq!(orch.history().len(), 1);
        assert_eq!(out.count(OutputKind::Failure), 1);
    }

    #[tokio::test]
    async fn test_dispatching_acknowledges_then_observes() {
        let mock = MockLlmClient::new();
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let next = orch
            .advance(TurnState::Dispatching { request: cpu_request() }, &mut out)
            .await
            .unwrap();
        assert!(matches!(next, TurnState::Observing { ref outcome, .. } if outcome.is_success()));
        assert_eq!(
            out.texts_of(OutputKind::Status),
            vec!["Acknowledged. Attempting local system interaction: get_cpu_usage".to_string()]
        );
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_skips_commentary() {
        let mock = MockLlmClient::new();
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let request = ToolInvocationRequest::new("silent", Parameters::new());
        let next = orch.advance(TurnState::Dispatching { request }, &mut out).await.unwrap();
        assert_eq!(next, TurnState::Emitting(Emission::reply(EMPTY_RESULT_REPLY)));
    }

    #[tokio::test]
    async fn test_observing_appends_system_message() {
        let mock = MockLlmClient::new();
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let next = orch
            .advance(
                TurnState::Observing {
                    request: cpu_request(),
                    outcome: ToolOutcome::success("CPU 7%"),
                },
                &mut out,
            )
            .await
            .unwrap();
        assert_eq!(
            next,
            TurnState::RequestingCommentary {
                subject: CommentarySubject::Outcome
            }
        );
        let last = orch.history().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.content.contains("Result data: CPU 7%"));
    }

    #[tokio::test]
    async fn test_commentary_tool_call_becomes_placeholder() {
        let mock = MockLlmClient::with_replies([RawReply::tool_call("get_cpu_usage", "{}")]);
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let next = orch
            .advance(
                TurnState::RequestingCommentary {
                    subject: CommentarySubject::Outcome,
                },
                &mut out,
            )
            .await
            .unwrap();
        let TurnState::Emitting(emission) = next else {
            panic!("expected emitting");
        };
        assert_eq!(
            emission.record.as_deref(),
            Some("[Commentary Failed: Unexpected type standard_tool_call]")
        );
        assert_eq!(mock.requests()[0].tool_choice, ToolChoice::None);
    }

    #[tokio::test]
    async fn test_emitting_records_and_returns_to_awaiting() {
        let mock = MockLlmClient::new();
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let next = orch
            .advance(TurnState::Emitting(Emission::reply("Done.")), &mut out)
            .await
            .unwrap();
        assert_eq!(next, TurnState::AwaitingInput);
        assert_eq!(orch.history().last(), Some(&Message::assistant("Done.")));
        assert_eq!(out.texts_of(OutputKind::Reply), vec!["Done.".to_string()]);
    }

    #[tokio::test]
    async fn test_advance_outside_turn_is_fault() {
        let mock = MockLlmClient::new();
        let mut orch = orchestrator(&mock);
        let mut out = RecordingOutput::new();
        let err = orch.advance(TurnState::AwaitingInput, &mut out).await.unwrap_err();
        assert!(matches!(err, AgentError::Orchestration(_)));
    }
}
