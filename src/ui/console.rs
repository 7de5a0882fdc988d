//! 终端输入输出
//!
//! ConsoleInput 从 stdin 逐行读取，同时监听中断 token（Ctrl+C / SIGTERM），二者先到先得；
//! ConsoleOutput 按输出类别用 crossterm 着色写到 stdout。

use std::io::Write;

use async_trait::async_trait;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

use crate::ui::{InputEvent, InputSource, OutputChannel, OutputKind};

/// stdin 输入源
pub struct ConsoleInput {
    lines: Lines<BufReader<Stdin>>,
    interrupt: CancellationToken,
    prompt: String,
}

impl ConsoleInput {
    pub fn new(interrupt: CancellationToken) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            interrupt,
            prompt: "You: ".to_string(),
        }
    }

    fn show_prompt(&self) {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", self.prompt.as_str().bold());
        let _ = stdout.flush();
    }
}

#[async_trait]
impl InputSource for ConsoleInput {
    async fn next_event(&mut self) -> InputEvent {
        if self.interrupt.is_cancelled() {
            return InputEvent::Interrupted;
        }
        self.show_prompt();
        tokio::select! {
            biased;
            _ = self.interrupt.cancelled() => {
                println!();
                InputEvent::Interrupted
            }
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => InputEvent::Line(line),
                Ok(None) => {
                    println!();
                    InputEvent::Eof
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed, treating as end of input");
                    InputEvent::Eof
                }
            },
        }
    }
}

/// stdout 输出通道
pub struct ConsoleOutput {
    assistant_name: String,
}

impl ConsoleOutput {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }
}

impl OutputChannel for ConsoleOutput {
    fn emit(&mut self, kind: OutputKind, text: &str) -> std::io::Result<()> {
        let label = format!("{}:", self.assistant_name);
        let line = match kind {
            OutputKind::Reply => format!("{} {}", label.cyan().bold(), text),
            OutputKind::Status => format!("{} {}", label.cyan(), text.dim()),
            OutputKind::Warning => format!("{}", text.yellow().bold()),
            OutputKind::Failure => format!("{} {}", label.red().bold(), text.red()),
            OutputKind::Farewell => format!("{} {}", label.cyan().bold(), text.italic()),
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()
    }
}
