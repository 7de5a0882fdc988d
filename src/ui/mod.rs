//! 交互层：逐行输入源与输出通道
//!
//! 会话只依赖 InputSource / OutputChannel 两个 trait；终端实现在 console，
//! 脚本化实现（预置输入、录制输出）在 scripted，供测试驱动完整会话。

pub mod console;
pub mod scripted;

use async_trait::async_trait;

pub use console::{ConsoleInput, ConsoleOutput};
pub use scripted::{RecordingOutput, ScriptedInput};

/// 输入事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// 输入流结束（Ctrl+D / 管道关闭）
    Eof,
    /// 用户中断（Ctrl+C）
    Interrupted,
}

/// 输出类别，终端按类别着色
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    /// 助手的回复
    Reply,
    /// 过程提示（如正在调用工具）
    Status,
    /// 启动告警
    Warning,
    /// 面向用户的错误提示
    Failure,
    Farewell,
}

/// 逐行输入源
#[async_trait]
pub trait InputSource: Send {
    async fn next_event(&mut self) -> InputEvent;
}

/// 输出通道
pub trait OutputChannel: Send {
    fn emit(&mut self, kind: OutputKind, text: &str) -> std::io::Result<()>;
}
