//! 决策历史：单个 Agent 实例独占的只追加日志
//!
//! 每步一行，最新在末尾；读回用于拼接下一轮 prompt，顺序有语义。只能整体 clear。

use serde::Serialize;

use crate::prompt::FIRST_STEP;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DecisionHistory {
    entries: Vec<String>,
}

impl DecisionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 供 prompt 使用的文本；空历史返回 FIRST_STEP
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            FIRST_STEP.to_string()
        } else {
            self.entries.join("\n")
        }
    }
}
