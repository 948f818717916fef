//! Agent 契约
//!
//! 所有 Agent 共享同一形态：名称、可选的 LLM 句柄、独占的决策历史（AgentBase），
//! 并实现 Agent::run。具体工作流有两类：题目发现（ParsingPipeline）与单题求解（ProblemSolverAgent），
//! 编排器 MasterAgent 也以同一契约组合二者。

pub mod history;
pub mod solver;

use std::sync::Arc;

use async_trait::async_trait;

pub use history::DecisionHistory;
pub use solver::{ProblemSolverAgent, SolveOutcome, SolverState};

use crate::llm::LlmClient;

/// Agent 公共部分
pub struct AgentBase {
    pub name: String,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub history: DecisionHistory,
}

impl AgentBase {
    pub fn new(name: impl Into<String>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            name: name.into(),
            llm,
            history: DecisionHistory::new(),
        }
    }
}

impl std::fmt::Debug for AgentBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBase")
            .field("name", &self.name)
            .field("llm", &self.llm.as_ref().map(|l| l.model_name().to_string()))
            .field("history", &self.history.len())
            .finish()
    }
}

/// Agent trait：Context 为本次运行的输入，Outcome 为运行结果
#[async_trait]
pub trait Agent: Send {
    type Context: Send;
    type Outcome;

    fn base(&self) -> &AgentBase;

    fn base_mut(&mut self) -> &mut AgentBase;

    async fn run(&mut self, context: Self::Context) -> Self::Outcome;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn history(&self) -> &DecisionHistory {
        &self.base().history
    }

    /// 清空决策历史（实例复用时调用，幂等）
    fn clear(&mut self) {
        self.base_mut().history.clear();
    }
}
