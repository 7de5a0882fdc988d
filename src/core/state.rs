//! 状态定义：回合状态机、输出、会话收尾原因
//!
//! AwaitingInput → Requesting → {Dispatching → Observing → RequestingCommentary → Emitting} | {Emitting}
//! → AwaitingInput；Closed 为终态。每个状态只携带推进到下一状态所需的数据。

use crate::tools::{ToolInvocationRequest, ToolOutcome};
use crate::turn::CommentarySubject;
use crate::ui::{InputEvent, OutputKind};

/// 一次要呈现给用户的输出，以及（可选）要记入历史的 Assistant 消息
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emission {
    pub kind: OutputKind,
    pub text: String,
    pub record: Option<String>,
}

impl Emission {
    pub fn new(kind: OutputKind, text: impl Into<String>, record: Option<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            record,
        }
    }

    /// 正常回复：呈现并原样记入历史
    pub fn reply(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: OutputKind::Reply,
            record: Some(text.clone()),
            text,
        }
    }

    /// 失败提示：只呈现，不记入历史
    pub fn failure(text: impl Into<String>) -> Self {
        Self::new(OutputKind::Failure, text, None)
    }
}

/// 回合状态
#[derive(Clone, Debug, PartialEq)]
pub enum TurnState {
    AwaitingInput,
    Requesting { input: String },
    Dispatching { request: ToolInvocationRequest },
    Observing { request: ToolInvocationRequest, outcome: ToolOutcome },
    RequestingCommentary { subject: CommentarySubject },
    Emitting(Emission),
    Closed(CloseReason),
}

impl TurnState {
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::AwaitingInput => "awaiting_input",
            TurnState::Requesting { .. } => "requesting",
            TurnState::Dispatching { .. } => "dispatching",
            TurnState::Observing { .. } => "observing",
            TurnState::RequestingCommentary { .. } => "requesting_commentary",
            TurnState::Emitting(_) => "emitting",
            TurnState::Closed(_) => "closed",
        }
    }
}

/// 会话结束原因（各自对应一条告别语）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    ExitKeyword,
    Interrupted,
    EndOfInput,
}

/// 一行输入的处理决定
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// 空输入：重新提示，不消耗回合
    Ignore,
    Close(CloseReason),
    Turn(String),
}

/// 在 AwaitingInput 边界上判定输入事件
pub fn admit(event: InputEvent, exit_keywords: &[String]) -> Admission {
    match event {
        InputEvent::Interrupted => Admission::Close(CloseReason::Interrupted),
        InputEvent::Eof => Admission::Close(CloseReason::EndOfInput),
        InputEvent::Line(line) => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                Admission::Ignore
            } else if exit_keywords.iter().any(|k| k.eq_ignore_ascii_case(trimmed)) {
                Admission::Close(CloseReason::ExitKeyword)
            } else {
                Admission::Turn(line)
            }
        }
    }
}
