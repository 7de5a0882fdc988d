//! Familiar - 终端对话智能体
//!
//! 模块划分：
//! - **agent**: 会话装配（配置 → 注册表 / 客户端 / 提示词 / 编排器）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、回合状态机、编排器、会话循环、中断处理
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 有界对话历史
//! - **observability**: 日志
//! - **tools**: 能力注册表、调度器与内置本地能力
//! - **turn**: 响应分类、观察消息、点评阶段、系统提示词
//! - **ui**: 终端与脚本化输入输出

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;
pub mod turn;
pub mod ui;
