//! 解析流水线：题目发现 Agent
//!
//! 阶段 A（顺序）：抓取比赛题目列表，失败即整条流水线失败，不留下任何部分状态。
//! 阶段 B（扇出）：每个题目 URL 一个「抓取 + 落盘」工作流，并发执行、全部等待；
//! 单题失败只体现在该题的子结果里。阶段 A 成功即整体 success，payload 携带全部题目目录与子结果。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::agent::{Agent, AgentBase};
use crate::core::{join_isolated, AgentMessage};
use crate::fetch::{trailing_segment, ProblemSource};
use crate::store::{case_file_names, write_batch};

const SOURCE: &str = "parser_pipeline";

/// 流水线：持有题目来源与输出根目录
pub struct ParsingPipeline {
    base: AgentBase,
    source: Arc<dyn ProblemSource>,
    output_root: PathBuf,
}

impl ParsingPipeline {
    pub fn new(source: Arc<dyn ProblemSource>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            base: AgentBase::new("ParsingPipeline", None),
            source,
            output_root: output_root.into(),
        }
    }

    /// 比赛目录：{output_root}/{比赛 URL 末段}
    pub fn contest_dir(&self, contest_url: &str) -> PathBuf {
        self.output_root.join(trailing_segment(contest_url))
    }

    /// 阶段 A：题目 URL，按首次出现去重。
    ///
    /// 题目目录以 URL 末段命名，末段相同的 URL（结尾 /、查询串不同）只保留第一个，
    /// 保证阶段 B 与后续 Solver 不会有两个任务写同一目录。
    async fn discover(&mut self, contest_url: &str) -> Result<Vec<String>, String> {
        let urls = self
            .source
            .fetch_contest(contest_url)
            .await
            .map_err(|e| format!("Error parsing contest page {contest_url}: {e}"))?;
        let mut unique: Vec<String> = Vec::with_capacity(urls.len());
        let mut ids: HashSet<String> = HashSet::new();
        for url in urls {
            if unique.contains(&url) {
                continue;
            }
            if !ids.insert(trailing_segment(&url).to_string()) {
                tracing::warn!(url = %url, "problem id already taken by an earlier URL, skipped");
                continue;
            }
            unique.push(url);
        }
        if unique.is_empty() {
            return Err(format!(
                "Pipeline failed: Could not retrieve any problem URLs from {contest_url}."
            ));
        }
        self.base
            .history
            .push(format!("Discovered {} problems at {contest_url}", unique.len()));
        Ok(unique)
    }
}

/// 阶段 B 单题工作流：抓取题目页并写入题目目录
pub async fn fetch_and_persist(source: &dyn ProblemSource, problem_url: &str, target_dir: &Path) -> AgentMessage {
    const TOOL: &str = "parse_problem_page";
    tracing::info!(url = %problem_url, "start processing problem");

    let page = match source.fetch_problem(problem_url).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(url = %problem_url, error = %e, "failed to access problem page");
            return AgentMessage::failure(TOOL, "error", format!("Failed to access page {problem_url}: {e}"));
        }
    };

    let mut files = vec![
        (target_dir.join("problem.md"), Some(page.statement_markdown())),
        (target_dir.join("limits.txt"), page.limits.clone()),
    ];
    for (i, sample) in page.samples.iter().enumerate() {
        let (input_name, output_name) = case_file_names(i + 1);
        files.push((target_dir.join(input_name), Some(sample.input.clone())));
        files.push((target_dir.join(output_name), Some(sample.output.clone())));
    }
    let failed = write_batch(files).await;

    let summary = format!(
        "Successfully fetched the problem '{}' into the folder: {}",
        page.title,
        target_dir.display()
    );
    tracing::info!("{summary}");
    AgentMessage::success(
        TOOL,
        "tool_result",
        json!({
            "summary": summary,
            "target_dir": target_dir.to_string_lossy(),
            "title": page.title,
            "samples": page.samples.len(),
            "write_failures": failed.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
        }),
    )
}

#[async_trait]
impl Agent for ParsingPipeline {
    /// 比赛 URL
    type Context = String;
    type Outcome = AgentMessage;

    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    async fn run(&mut self, contest_url: String) -> AgentMessage {
        tracing::info!(contest = %contest_url, "running parsing pipeline");

        let urls = match self.discover(&contest_url).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(contest = %contest_url, "{e}");
                self.base.history.push(e.clone());
                return AgentMessage::failure(SOURCE, "error", e);
            }
        };

        let base_dir = self.contest_dir(&contest_url);
        let targets: Vec<(String, PathBuf)> = urls
            .iter()
            .map(|url| (url.clone(), base_dir.join(trailing_segment(url))))
            .collect();
        tracing::info!(
            count = targets.len(),
            dir = %base_dir.display(),
            "processing problems"
        );

        let source = self.source.as_ref();
        let results = join_isolated(
            SOURCE,
            targets
                .iter()
                .map(|(url, dir)| (url.clone(), fetch_and_persist(source, url, dir))),
        )
        .await;

        let failed = results.iter().filter(|r| r.is_failure()).count();
        let summary = format!(
            "Parsing pipeline completed. Processed {} problems into '{}' ({} failed).",
            targets.len(),
            base_dir.display(),
            failed
        );
        tracing::info!("{summary}");
        self.base.history.push(summary.clone());

        AgentMessage::success(
            SOURCE,
            "pipeline_result",
            json!({
                "message": summary,
                "problem_directories": targets
                    .iter()
                    .map(|(_, dir)| dir.to_string_lossy().into_owned())
                    .collect::<Vec<_>>(),
                "results": results,
            }),
        )
    }
}

/// 从流水线结果中取出题目目录
pub fn problem_directories(result: &AgentMessage) -> Vec<PathBuf> {
    result.payload()["problem_directories"]
        .as_array()
        .map(|dirs| dirs.iter().filter_map(|d| d.as_str()).map(PathBuf::from).collect())
        .unwrap_or_default()
}
