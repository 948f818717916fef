//! 比赛编排器：主控 Agent
//!
//! 负责：构建本场唯一的能力注册表与工具执行器，运行解析流水线；流水线失败则记录并停止，
//! 否则为每个题目目录创建一个 ProblemSolverAgent，扇出并发求解，全部结束后汇总 successful/total。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

use crate::agent::{Agent, AgentBase, ProblemSolverAgent};
use crate::config::AppConfig;
use crate::core::{join_isolated, AgentMessage};
use crate::fetch::ProblemSource;
use crate::llm::{LlmClient, Usage};
use crate::pipeline::{problem_directories, ParsingPipeline};
use crate::tools::{solver_registry, ToolExecutor, ToolRegistry};

const SOURCE: &str = "MasterAgent";

/// 一次比赛运行的输入
#[derive(Debug, Clone)]
pub struct ContestRun {
    pub contest_url: String,
    pub goal: String,
}

impl ContestRun {
    pub fn new(contest_url: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            contest_url: contest_url.into(),
            goal: goal.into(),
        }
    }
}

/// 比赛级结果：流水线结果 + 每题求解结果（与题目目录同序）
#[derive(Debug, Clone, Serialize)]
pub struct ContestReport {
    pub run_id: String,
    pub contest_url: String,
    pub pipeline: AgentMessage,
    pub outcomes: Vec<AgentMessage>,
    pub successful: usize,
    /// 本场累计 token 用量（共享的 LLM 客户端统计）
    pub llm_usage: Usage,
    pub finished_at: DateTime<Utc>,
}

impl ContestReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// 流水线阶段 A 失败，没有派发任何 Solver
    pub fn pipeline_failed(&self) -> bool {
        self.pipeline.is_failure()
    }

    /// successful/total
    pub fn summary(&self) -> String {
        format!("{}/{}", self.successful, self.total())
    }
}

/// 主控 Agent：同一场比赛内所有 Solver 共享一个只读的工具执行器
pub struct MasterAgent {
    base: AgentBase,
    source: Arc<dyn ProblemSource>,
    executor: Arc<ToolExecutor>,
    output_root: PathBuf,
    max_steps: usize,
}

impl MasterAgent {
    /// 按配置装配求解能力全集
    pub fn new(cfg: &AppConfig, llm: Arc<dyn LlmClient>, source: Arc<dyn ProblemSource>) -> Self {
        let registry = solver_registry(llm.clone(), &cfg.solver.language, cfg.solver.num_test_cases);
        Self::with_registry(cfg, llm, source, registry)
    }

    /// 使用给定注册表（测试或自定义能力集）
    pub fn with_registry(
        cfg: &AppConfig,
        llm: Arc<dyn LlmClient>,
        source: Arc<dyn ProblemSource>,
        registry: ToolRegistry,
    ) -> Self {
        tracing::info!(tools = ?registry.tool_names(), "capability registry ready");
        Self {
            base: AgentBase::new(SOURCE, Some(llm)),
            source,
            executor: Arc::new(ToolExecutor::new(registry, cfg.tools.tool_timeout_secs)),
            output_root: cfg.app.output_root.clone(),
            max_steps: cfg.solver.max_steps,
        }
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// 只跑解析流水线
    pub async fn parse_contest(&mut self, contest_url: &str) -> AgentMessage {
        let mut pipeline = ParsingPipeline::new(self.source.clone(), self.output_root.clone());
        let result = pipeline.run(contest_url.to_string()).await;
        self.base.history.push(format!(
            "Parsing pipeline for {contest_url} finished with status {:?}",
            result.status()
        ));
        result
    }

    /// 每个题目目录一个 Solver，并发跑完
    async fn solve_all(&self, dirs: Vec<PathBuf>, goal: &str) -> Vec<AgentMessage> {
        let tasks = dirs.into_iter().map(|dir| {
            let label = dir.display().to_string();
            let mut solver = ProblemSolverAgent::new(
                dir,
                self.executor.clone(),
                self.base.llm.clone(),
                self.max_steps,
            );
            let goal = goal.to_string();
            (label, async move { solver.run(goal).await })
        });
        join_isolated(SOURCE, tasks).await
    }

    async fn run_contest(&mut self, run: ContestRun, run_id: String) -> ContestReport {
        tracing::info!(goal = %run.goal, "activating master agent");
        let parsed = self.parse_contest(&run.contest_url).await;

        let outcomes = if parsed.is_failure() {
            tracing::error!(
                error = parsed.error().unwrap_or_default(),
                "parsing pipeline failed, no problems dispatched"
            );
            Vec::new()
        } else {
            let dirs = problem_directories(&parsed);
            tracing::info!(count = dirs.len(), "dispatching solvers");
            self.solve_all(dirs, &run.goal).await
        };

        let successful = outcomes.iter().filter(|m| m.is_success()).count();
        let llm_usage = self.base.llm.as_ref().map(|l| l.total_usage()).unwrap_or_default();
        let report = ContestReport {
            run_id,
            contest_url: run.contest_url,
            pipeline: parsed,
            successful,
            outcomes,
            llm_usage,
            finished_at: Utc::now(),
        };
        tracing::info!(
            successful = report.successful,
            total = report.total(),
            prompt_tokens = report.llm_usage.prompt_tokens,
            completion_tokens = report.llm_usage.completion_tokens,
            "all problems processed: {}",
            report.summary()
        );
        self.base.history.push(format!("Solved {}", report.summary()));
        report
    }
}

#[async_trait]
impl Agent for MasterAgent {
    type Context = ContestRun;
    type Outcome = ContestReport;

    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    async fn run(&mut self, run: ContestRun) -> ContestReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("contest", run_id = %run_id, contest = %run.contest_url);
        self.run_contest(run, run_id).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, ProblemPage};
    use crate::llm::{ChatResponse, LlmError, Message, ResponseFormat, ScriptedLlmClient};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct TwoProblems;

    #[async_trait]
    impl ProblemSource for TwoProblems {
        async fn fetch_contest(&self, contest_url: &str) -> Result<Vec<String>, FetchError> {
            if contest_url.ends_with("broken") {
                return Err(FetchError::Timeout(contest_url.to_string()));
            }
            Ok(vec![
                format!("{contest_url}/tasks/x_a"),
                format!("{contest_url}/tasks/x_b"),
            ])
        }

        async fn fetch_problem(&self, problem_url: &str) -> Result<ProblemPage, FetchError> {
            Ok(ProblemPage {
                url: problem_url.to_string(),
                title: "T".into(),
                description: "D".into(),
                limits: None,
                samples: vec![],
            })
        }
    }

    fn config(root: &std::path::Path) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.app.output_root = root.to_path_buf();
        cfg.solver.max_steps = 3;
        cfg
    }

    #[tokio::test]
    async fn test_every_problem_gets_a_solver() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool_name": "finish", "parameters": {"reason": "done"}}"#,
        ]));
        let mut master = MasterAgent::with_registry(&config(dir.path()), llm.clone(), Arc::new(TwoProblems), ToolRegistry::new());

        let report = master
            .run(ContestRun::new("https://atcoder.jp/contests/x", "solve"))
            .await;
        assert!(!report.pipeline_failed());
        assert_eq!(report.total(), 2);
        assert_eq!(report.summary(), "2/2");
        assert_eq!(llm.calls(), 2);
        assert!(!report.run_id.is_empty());
        assert_eq!(master.history().len(), 2);
    }

    #[tokio::test]
    async fn test_pipeline_failure_dispatches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedLlmClient::new(["{}"]));
        let mut master = MasterAgent::new(&config(dir.path()), llm.clone(), Arc::new(TwoProblems));

        let report = master
            .run(ContestRun::new("https://atcoder.jp/contests/broken", "solve"))
            .await;
        assert!(report.pipeline_failed());
        assert_eq!(report.summary(), "0/0");
        assert_eq!(llm.calls(), 0);
    }

    /// 每次调用计 7+3 个 token 的客户端
    #[derive(Default)]
    struct MeteredLlm {
        calls: AtomicU64,
    }

    #[async_trait]
    impl LlmClient for MeteredLlm {
        async fn chat(&self, _messages: &[Message], _format: ResponseFormat) -> Result<ChatResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(ChatResponse::text(r#"{"tool_name": "finish", "parameters": null}"#))
        }

        fn total_usage(&self) -> Usage {
            let calls = self.calls.load(Ordering::Relaxed);
            Usage { prompt_tokens: 7 * calls, completion_tokens: 3 * calls }
        }
    }

    #[tokio::test]
    async fn test_report_carries_llm_usage() {
        let dir = tempfile::tempdir().unwrap();
        let mut master = MasterAgent::with_registry(
            &config(dir.path()),
            Arc::new(MeteredLlm::default()),
            Arc::new(TwoProblems),
            ToolRegistry::new(),
        );

        let report = master
            .run(ContestRun::new("https://atcoder.jp/contests/x", "solve"))
            .await;
        assert_eq!(report.summary(), "2/2");
        assert_eq!(report.llm_usage, Usage { prompt_tokens: 14, completion_tokens: 6 });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["llm_usage"]["prompt_tokens"], 14);
    }

    #[test]
    fn test_registry_is_built_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.solver.language = "python".into();
        let master = MasterAgent::new(&cfg, Arc::new(ScriptedLlmClient::new(["{}"])), Arc::new(TwoProblems));
        assert_eq!(master.executor().registry().len(), 4);
        assert!(master.executor().registry().render_catalog().contains("main.py"));
    }
}
