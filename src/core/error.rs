//! 错误类型
//!
//! LlmError 描述一次模型调用的传输层失败；AgentError 是会话层的错误分类，
//! 只有 AuthConfiguration / ConfigError 会在启动时终止会话，其余都在回合边界内被恢复。
//! 传输层失败不会上升为 AgentError，而是由分类器归为 Error 响应。

use thiserror::Error;

/// 模型调用失败（超时、连接、非 2xx、响应体无法解码），不自动重试
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Response decode failed: {0}")]
    Decode(String),
}

/// 会话运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 凭据缺失或仍是占位符；在进入主循环前即终止
    #[error("Auth configuration error: {0}")]
    AuthConfiguration(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    /// 能力注册时校验失败（重名、空名、参数声明冲突）
    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// 回合内的其它未处理故障；上报后会话继续
    #[error("Orchestration fault: {0}")]
    Orchestration(String),
}

impl AgentError {
    /// 该错误是否应在启动阶段直接终止会话
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::AuthConfiguration(_) | AgentError::ConfigError(_))
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::ConfigError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts_and_is_fatal() {
        let err: AgentError = config::ConfigError::Message("bad toml".into()).into();
        assert!(matches!(err, AgentError::ConfigError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_auth_is_fatal() {
        assert!(AgentError::AuthConfiguration("missing".into()).is_fatal());
        assert!(!AgentError::Orchestration("boom".into()).is_fatal());
    }

    #[test]
    fn test_status_display() {
        let err = LlmError::Status {
            status: 401,
            message: "No auth credentials found".into(),
        };
        assert_eq!(err.to_string(), "HTTP 401: No auth credentials found");
    }
}
