//! cpbee - 竞赛编程多 Agent 求解系统
//!
//! 入口：初始化日志、加载配置，解析比赛并为每道题运行求解 Agent，最后输出每题结果与 successful/total。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use cpbee::agent::Agent;
use cpbee::config::load_config;
use cpbee::core::{ContestRun, MasterAgent};
use cpbee::fetch::AtCoderSource;
use cpbee::llm::create_llm_from_config;
use cpbee::observability;

#[derive(Parser, Debug)]
#[command(name = "cpbee", version, about = "Parse a contest and solve its problems with LLM agents")]
struct Cli {
    /// 比赛地址，如 https://atcoder.jp/contests/abc363
    contest_url: String,

    /// 额外配置文件（覆盖 config/default.toml）
    #[arg(short, long, env = "CPBEE_CONFIG")]
    config: Option<PathBuf>,

    /// 总体目标
    #[arg(long)]
    goal: Option<String>,

    /// 每题最大步数
    #[arg(long)]
    max_steps: Option<usize>,

    /// 比赛目录的根
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// 只解析比赛与题目，不求解
    #[arg(long)]
    parse_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.clone()).context("Failed to load configuration")?;
    if let Some(goal) = cli.goal {
        cfg.solver.goal = goal;
    }
    if let Some(max_steps) = cli.max_steps {
        cfg.solver.max_steps = max_steps;
    }
    if let Some(root) = cli.output_root {
        cfg.app.output_root = root;
    }

    let llm = create_llm_from_config(&cfg);
    let source = Arc::new(
        AtCoderSource::new(cfg.fetch.timeout_secs, &cfg.fetch.user_agent)
            .context("Failed to build HTTP client")?,
    );
    let mut master = MasterAgent::new(&cfg, llm, source);

    if cli.parse_only {
        let result = master.parse_contest(&cli.contest_url).await;
        println!("{}", result.to_json());
        if result.is_failure() {
            anyhow::bail!("parsing pipeline failed for {}", cli.contest_url);
        }
        return Ok(());
    }

    let report = master
        .run(ContestRun::new(cli.contest_url.clone(), cfg.solver.goal.clone()))
        .await;
    if report.pipeline_failed() {
        println!("{}", report.pipeline.to_json());
        anyhow::bail!("parsing pipeline failed for {}", cli.contest_url);
    }

    println!("\n======= Contest Processing Finished =======");
    for outcome in &report.outcomes {
        println!("{}", outcome.to_json());
    }
    println!("Successfully solved {} problems.", report.summary());
    println!(
        "LLM usage: {} prompt tokens, {} completion tokens.",
        report.llm_usage.prompt_tokens, report.llm_usage.completion_tokens
    );
    Ok(())
}
