//! 桌面通知能力
//!
//! 调用平台通知程序（Linux: notify-send，macOS: osascript）。标题与正文按配置截断；
//! 找不到通知程序属于预期内失败，启动进程本身出错才视为异常。

use std::process::Command;

use crate::config::ToolsSection;
use crate::tools::{Capability, ParamKind, ParamSpec, Parameters, ToolOutcome};

/// send_notification：发送桌面通知
pub struct SendNotification {
    app_name: String,
    default_title: String,
    title_limit: usize,
    message_limit: usize,
}

impl SendNotification {
    pub fn new(settings: &ToolsSection) -> Self {
        Self {
            app_name: settings.notification_app_name.clone(),
            default_title: settings.notification_title.clone(),
            title_limit: settings.notification_title_limit,
            message_limit: settings.notification_message_limit,
        }
    }

    /// 按平台构造通知命令；不支持或未安装时返回 None
    fn command(&self, title: &str, message: &str) -> Option<Command> {
        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(message),
                escape_applescript(title)
            );
            let program = which::which("osascript").ok()?;
            let mut cmd = Command::new(program);
            cmd.arg("-e").arg(script);
            Some(cmd)
        } else {
            let program = which::which("notify-send").ok()?;
            let mut cmd = Command::new(program);
            cmd.arg("--app-name").arg(&self.app_name).arg(title).arg(message);
            Some(cmd)
        }
    }
}

impl Capability for SendNotification {
    fn name(&self) -> &str {
        "send_notification"
    }

    fn description(&self) -> &str {
        "Show a desktop notification to the user."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("message", ParamKind::String, "notification body"),
            ParamSpec::optional("title", ParamKind::String, "notification title"),
        ]
    }

    fn invoke(&self, params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let message = params.get("message").and_then(|v| v.as_str()).unwrap_or_default();
        let title = params
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_title);
        let title = truncate(title, self.title_limit);
        let message = truncate(message, self.message_limit);

        let Some(mut cmd) = self.command(&title, &message) else {
            return Ok(ToolOutcome::failure(
                "Notification system unavailable. No desktop notifier was found.",
            ));
        };
        tracing::info!(title = %title, "send_notification");

        let output = cmd.output()?;
        if output.status.success() {
            Ok(ToolOutcome::success(format!("Notification titled '{title}' sent.")))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Ok(ToolOutcome::failure(format!(
                "Failed to send notification ({}): {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
