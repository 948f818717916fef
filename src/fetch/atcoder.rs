//! AtCoder 抓取实现
//!
//! 比赛页：GET {contest}/tasks，取任务表 tbody 每行第一个链接，相对路径按 tasks URL 解析并去重。
//! 题目页：h2 标题（去掉 Editorial 链接）、英文题面（无则整段 task-statement）经 html2text 转文本、
//! Time Limit / Memory Limit 行、Sample Input i / Sample Output i 的 pre 块（解 HTML 实体后配对）。

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::fetch::{FetchError, ProblemPage, ProblemSource, Sample};

const TITLE_NOT_FOUND: &str = "Title not found";
const DESCRIPTION_NOT_FOUND: &str = "Description not found.";

static HREF_RE: OnceLock<Regex> = OnceLock::new();
static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static H2_RE: OnceLock<Regex> = OnceLock::new();
static ANCHOR_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();
static LIMITS_RE: OnceLock<Regex> = OnceLock::new();
static SAMPLE_RE: OnceLock<Regex> = OnceLock::new();

/// AtCoder 题目来源
pub struct AtCoderSource {
    client: Client,
}

impl AtCoderSource {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Request(format!("build client: {e}")))?;
        Ok(Self { client })
    }

    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Request(format!("read body: {e}")))
    }
}

#[async_trait]
impl ProblemSource for AtCoderSource {
    async fn fetch_contest(&self, contest_url: &str) -> Result<Vec<String>, FetchError> {
        let tasks_url = format!("{}/tasks", contest_url.trim_end_matches('/'));
        tracing::info!(url = %tasks_url, "requesting problem list page");
        let html = self.get_html(&tasks_url).await?;
        let urls = parse_task_links(&html, &tasks_url)?;
        if urls.is_empty() {
            tracing::warn!(url = %tasks_url, "no task rows found");
        } else {
            tracing::info!(count = urls.len(), "parsed contest page");
        }
        Ok(urls)
    }

    async fn fetch_problem(&self, problem_url: &str) -> Result<ProblemPage, FetchError> {
        let html = self.get_html(problem_url).await?;
        Ok(parse_problem_html(&html, problem_url))
    }
}

/// 从任务表中提取题目链接（绝对 URL，保持顺序去重）
pub fn parse_task_links(html: &str, tasks_url: &str) -> Result<Vec<String>, FetchError> {
    let base = Url::parse(tasks_url).map_err(|e| FetchError::Parse(format!("{tasks_url}: {e}")))?;
    let table_start = html.find("table-responsive").unwrap_or(0);
    let Some(tbody_start) = html[table_start..].find("<tbody").map(|i| table_start + i) else {
        return Ok(Vec::new());
    };
    let tbody = balanced_element(html, tbody_start, "tbody");

    let href_re = HREF_RE.get_or_init(|| Regex::new(r#"<a\b[^>]*\bhref\s*=\s*"([^"]+)""#).unwrap());
    let mut urls: Vec<String> = Vec::new();
    for row in tbody.split("<tr").skip(1) {
        let Some(cap) = href_re.captures(row) else {
            continue;
        };
        let href = unescape_html(&cap[1]);
        let full = base
            .join(&href)
            .map_err(|e| FetchError::Parse(format!("bad link '{href}': {e}")))?
            .to_string();
        if !urls.contains(&full) {
            urls.push(full);
        }
    }
    Ok(urls)
}

/// 解析题目页；缺失部分使用占位文本
pub fn parse_problem_html(html: &str, problem_url: &str) -> ProblemPage {
    ProblemPage {
        url: problem_url.to_string(),
        title: extract_title(html).unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
        description: statement_section(html)
            .map(html_to_text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string()),
        limits: extract_limits(html),
        samples: statement_section(html).map(extract_samples).unwrap_or_default(),
    }
}

fn extract_title(html: &str) -> Option<String> {
    let title_re = TITLE_RE.get_or_init(|| Regex::new(r#"(?s)<span class="h2">(.*?)</span>"#).unwrap());
    let h2_re = H2_RE.get_or_init(|| Regex::new(r"(?s)<h2[^>]*>(.*?)</h2>").unwrap());
    let raw = title_re
        .captures(html)
        .or_else(|| h2_re.captures(html))
        .map(|c| c[1].to_string())?;
    // 标题里带的 Editorial 按钮不属于标题
    let anchor_re = ANCHOR_RE.get_or_init(|| Regex::new(r"(?s)<a\b.*?</a>").unwrap());
    let text = strip_tags(&anchor_re.replace_all(&raw, ""));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn extract_limits(html: &str) -> Option<String> {
    let re = LIMITS_RE.get_or_init(|| {
        Regex::new(r"Time Limit:\s*([^<]*?)\s*/\s*Memory Limit:\s*([^<]*?)\s*<").unwrap()
    });
    re.captures(html)
        .map(|c| format!("Time Limit: {} / Memory Limit: {}", c[1].trim(), c[2].trim()))
}

/// 英文题面；没有语言切分时退回整个 task-statement
fn statement_section(html: &str) -> Option<&str> {
    if let Some(start) = html.find(r#"<span class="lang-en">"#) {
        return Some(balanced_element(html, start, "span"));
    }
    html.find(r#"<div id="task-statement">"#)
        .map(|start| balanced_element(html, start, "div"))
}

fn extract_samples(section: &str) -> Vec<Sample> {
    let re = SAMPLE_RE.get_or_init(|| {
        Regex::new(r"(?s)<h3>\s*Sample (Input|Output)\s*(\d+)\s*</h3>\s*<pre[^>]*>(.*?)</pre>").unwrap()
    });
    let mut inputs: BTreeMap<usize, String> = BTreeMap::new();
    let mut outputs: BTreeMap<usize, String> = BTreeMap::new();
    for cap in re.captures_iter(section) {
        let Ok(index) = cap[2].parse::<usize>() else {
            continue;
        };
        let body = unescape_html(&strip_tags(&cap[3]));
        match &cap[1] {
            "Input" => inputs.entry(index).or_insert(body),
            _ => outputs.entry(index).or_insert(body),
        };
    }
    inputs
        .into_iter()
        .filter_map(|(i, input)| outputs.remove(&i).map(|output| Sample { input, output }))
        .collect()
}

/// 从 start 处的开标签起，截取到与之配对的闭标签（含）；不配对时截到末尾
fn balanced_element<'a>(html: &'a str, start: usize, tag: &str) -> &'a str {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut depth = 0usize;
    let mut pos = start;
    loop {
        let next_open = html[pos..].find(&open).map(|i| pos + i);
        let next_close = html[pos..].find(&close).map(|i| pos + i);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                pos = o + open.len();
            }
            (_, Some(c)) => {
                depth = depth.saturating_sub(1);
                pos = c + close.len();
                if depth == 0 {
                    return &html[start..pos];
                }
            }
            _ => return &html[start..],
        }
    }
}

fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 100) {
        Ok(text) => text.trim().to_string(),
        Err(_) => strip_tags(html).trim().to_string(),
    }
}

fn strip_tags(s: &str) -> String {
    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    re.replace_all(s, "").into_owned()
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
