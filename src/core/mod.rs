//! 核心层：消息信封、错误分类、扇出汇聚、比赛编排器

pub mod error;
pub mod fanout;
pub mod message;
pub mod orchestrator;

pub use error::AgentError;
pub use fanout::join_isolated;
pub use message::{AgentMessage, MessageStatus};
pub use orchestrator::{ContestReport, ContestRun, MasterAgent};
