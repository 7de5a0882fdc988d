//! 核心编排层：错误、回合状态机、编排器、会话循环、中断处理

pub mod error;
pub mod interrupt;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use error::{AgentError, LlmError};
pub use interrupt::{InterruptSource, SessionInterrupt, SignalAction};
pub use orchestrator::{OrchestratorSettings, TurnOrchestrator, EMPTY_RESULT_REPLY};
pub use session::{farewell, Session, FAULT_NOTICE, GREETING};
pub use state::{admit, Admission, CloseReason, Emission, TurnState};
