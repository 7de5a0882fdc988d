//! 短期记忆：对话历史
//!
//! 固定容量的 FIFO 消息日志，超出容量时淘汰最旧的一条。系统提示词不在其中，
//! 每次请求时由调用方临时前置。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致，序列化为小写）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 对话历史：按插入顺序保存，长度永不超过 capacity
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl ConversationHistory {
    /// 容量至少为 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 追加一条消息；若超出容量，返回被淘汰的最旧消息
    pub fn push(&mut self, msg: Message) -> Option<Message> {
        let evicted = if self.messages.len() == self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(msg);
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// 按顺序复制当前全部消息（用于组装请求）
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity_keeps_order() {
        let mut history = ConversationHistory::new(3);
        assert!(history.push(Message::user("a")).is_none());
        assert!(history.push(Message::assistant("b")).is_none());
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut history = ConversationHistory::new(10);
        for i in 0..37 {
            history.push(Message::user(format!("m{i}")));
            assert!(history.len() <= 10);
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().next().map(|m| m.content.as_str()), Some("m27"));
        assert_eq!(history.last().map(|m| m.content.as_str()), Some("m36"));
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut history = ConversationHistory::new(2);
        history.push(Message::user("first"));
        history.push(Message::system("second"));
        let evicted = history.push(Message::assistant("third"));
        assert_eq!(evicted, Some(Message::user("first")));
        assert_eq!(history.snapshot(), vec![Message::system("second"), Message::assistant("third")]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut history = ConversationHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.push(Message::user("x"));
        history.push(Message::user("y"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::system("obs")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"obs"}"#);
    }
}
