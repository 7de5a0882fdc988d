//! 回合流水线：响应分类、观察消息、点评阶段、系统提示词

pub mod classifier;
pub mod commentary;
pub mod observation;
pub mod prompt;

pub use classifier::{classify, classify_result, classify_transport, ClassifiedResponse};
pub use commentary::{CommentaryStage, CommentarySubject};
pub use observation::ObservationComposer;
pub use prompt::{PromptSet, DEFAULT_PERSONA};
