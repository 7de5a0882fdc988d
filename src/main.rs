//! Familiar - 终端对话智能体
//!
//! 入口：加载配置、初始化日志、装配会话（凭据无效即退出），并在 stdin/stdout 上运行对话循环。

use std::path::PathBuf;

use anyhow::Context;
use familiar::agent::build_session;
use familiar::config::load_config;
use familiar::core::SessionInterrupt;
use familiar::observability;
use familiar::ui::{ConsoleInput, ConsoleOutput};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 可选：第一个参数为额外的配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load configuration")?;

    observability::init(&config.app.log_level);

    let interrupt = SessionInterrupt::new();
    let mut session = match build_session(&config, interrupt.clone()) {
        Ok(session) => session,
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "cannot start session");
            eprintln!("Critical error: {e}. Check config/default.toml or the OPENROUTER_API_KEY environment variable.");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to start session"),
    };
    interrupt.listen_for_signals();

    let mut input = ConsoleInput::new(interrupt.token());
    let mut output = ConsoleOutput::new(config.app.name.clone());
    let reason = session
        .run(&mut input, &mut output)
        .await
        .context("Session ended abnormally")?;
    tracing::info!(?reason, "bye");

    Ok(())
}
