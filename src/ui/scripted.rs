//! 脚本化输入与录制输出（测试与非交互运行）

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ui::{InputEvent, InputSource, OutputChannel, OutputKind};

/// 按顺序回放预置事件，耗尽后返回 Eof
#[derive(Debug, Default)]
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// 每行一个 Line 事件
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(|l| InputEvent::Line(l.into())))
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_event(&mut self) -> InputEvent {
        self.events.pop_front().unwrap_or(InputEvent::Eof)
    }
}

/// 录制所有输出；克隆体共享同一份记录
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    entries: Arc<Mutex<Vec<(OutputKind, String)>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(OutputKind, String)> {
        self.lock().clone()
    }

    pub fn texts_of(&self, kind: OutputKind) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn count(&self, kind: OutputKind) -> usize {
        self.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(OutputKind, String)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputChannel for RecordingOutput {
    fn emit(&mut self, kind: OutputKind, text: &str) -> std::io::Result<()> {
        self.lock().push((kind, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_input_ends_with_eof() {
        let mut input = ScriptedInput::lines(["hello"]);
        assert_eq!(input.next_event().await, InputEvent::Line("hello".into()));
        assert_eq!(input.next_event().await, InputEvent::Eof);
        assert_eq!(input.next_event().await, InputEvent::Eof);
    }

    #[test]
    fn test_recording_output_shared() {
        let out = RecordingOutput::new();
        let mut handle = out.clone();
        handle.emit(OutputKind::Reply, "a").unwrap();
        handle.emit(OutputKind::Status, "b").unwrap();
        assert_eq!(out.count(OutputKind::Reply), 1);
        assert_eq!(out.texts_of(OutputKind::Status), vec!["b".to_string()]);
        assert_eq!(out.entries().len(), 2);
    }
}
