//! cpbee - 竞赛编程多 Agent 求解系统
//!
//! 模块划分：
//! - **agent**: Agent 契约（AgentBase / 决策历史）与单题求解循环
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 消息信封、错误、扇出汇聚、比赛编排器
//! - **fetch**: 比赛 / 题目页面抓取（AtCoder）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **pipeline**: 解析流水线（题目发现与落盘）
//! - **prompt**: Prompt 模板
//! - **store**: 题目目录下的产物读写
//! - **tools**: 能力注册表、执行器与求解能力

pub mod agent;
pub mod config;
pub mod core;
pub mod fetch;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod prompt;
pub mod store;
pub mod tools;

pub use crate::agent::{Agent, ProblemSolverAgent};
pub use crate::core::{AgentMessage, ContestReport, ContestRun, MasterAgent};
pub use crate::pipeline::ParsingPipeline;
