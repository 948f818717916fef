//! 题目抓取：比赛页 -> 题目 URL 列表；题目页 -> 标题 / 题面 / 限制 / 样例

pub mod atcoder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use atcoder::AtCoderSource;

/// 抓取错误
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// 一组官方样例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub input: String,
    pub output: String,
}

/// 题目页解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemPage {
    pub url: String,
    pub title: String,
    pub description: String,
    /// 时间 / 内存限制原文（页面没有时为 None）
    pub limits: Option<String>,
    pub samples: Vec<Sample>,
}

impl ProblemPage {
    /// problem.md 内容
    pub fn statement_markdown(&self) -> String {
        format!(
            "# {}\n\n**URL:** {}\n\n---\n\n{}",
            self.title, self.url, self.description
        )
    }
}

/// 题目来源（比赛站点）
#[async_trait]
pub trait ProblemSource: Send + Sync {
    /// 比赛内全部题目的绝对 URL，按页面顺序
    async fn fetch_contest(&self, contest_url: &str) -> Result<Vec<String>, FetchError>;

    async fn fetch_problem(&self, problem_url: &str) -> Result<ProblemPage, FetchError>;
}

/// URL 末段（去掉查询串、锚点与结尾 /），用作比赛名与题目 ID
pub fn trailing_segment(url: &str) -> &str {
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_segment() {
        assert_eq!(trailing_segment("https://atcoder.jp/contests/abc363/"), "abc363");
        assert_eq!(
            trailing_segment("https://atcoder.jp/contests/abc363/tasks/abc363_a"),
            "abc363_a"
        );
        assert_eq!(
            trailing_segment("https://atcoder.jp/contests/abc363/tasks/abc363_a/?lang=en#top"),
            "abc363_a"
        );
    }

    #[test]
    fn test_statement_markdown() {
        let page = ProblemPage {
            url: "https://atcoder.jp/contests/abc363/tasks/abc363_a".into(),
            title: "A - Piling Up".into(),
            description: "Print the answer.".into(),
            limits: None,
            samples: vec![],
        };
        assert_eq!(
            page.statement_markdown(),
            "# A - Piling Up\n\n**URL:** https://atcoder.jp/contests/abc363/tasks/abc363_a\n\n---\n\nPrint the answer."
        );
    }
}
