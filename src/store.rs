//! 产物存储：题面、测试数据、源代码写入题目目录
//!
//! 写入时自动创建父目录，先写临时文件再 rename；data 为 None 时什么也不做。
//! 批量写入中单个文件失败只记录日志，不影响同批其他文件。

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use tokio::fs;

/// 写入单个文件；None 为约定的空操作
pub async fn write_artifact(path: &Path, data: Option<&str>) -> std::io::Result<()> {
    let Some(data) = data else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, data).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// 并发写入一批文件，返回失败的路径
pub async fn write_batch(files: Vec<(PathBuf, Option<String>)>) -> Vec<PathBuf> {
    let writes = files.into_iter().map(|(path, data)| async move {
        match write_artifact(&path, data.as_deref()).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "artifact write failed");
                Some(path)
            }
        }
    });
    join_all(writes).await.into_iter().flatten().collect()
}

/// 读取文本产物
pub async fn read_artifact(path: &Path) -> std::io::Result<String> {
    fs::read_to_string(path).await
}

/// 官方样例与生成用例的文件名：sol_{i}.in / ans_{i}.out
pub fn case_file_names(index: usize) -> (String, String) {
    (format!("sol_{index}.in"), format!("ans_{index}.out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc363").join("abc363_a").join("problem.md");
        write_artifact(&path, Some("# A")).await.unwrap();
        assert_eq!(read_artifact(&path).await.unwrap(), "# A");
        assert!(!dir.path().join("abc363/abc363_a/.problem.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_none_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.txt");
        write_artifact(&path, None).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_batch_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        // 以普通文件占位，使其下的写入必然失败
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let failed = write_batch(vec![
            (dir.path().join("sol_1.in"), Some("1 2\n".to_string())),
            (blocker.join("ans_1.out"), Some("3\n".to_string())),
        ])
        .await;

        assert_eq!(failed, vec![blocker.join("ans_1.out")]);
        assert_eq!(std::fs::read_to_string(dir.path().join("sol_1.in")).unwrap(), "1 2\n");
    }

    #[test]
    fn test_case_file_names() {
        assert_eq!(case_file_names(101), ("sol_101.in".to_string(), "ans_101.out".to_string()));
    }
}
