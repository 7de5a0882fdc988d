//! 沙箱文件系统能力
//!
//! SafeDir 绑定一个目录，只允许操作其中的直接子文件（拒绝 ../ 与分隔符，并校验规范化后仍在目录内）；
//! ListSafeDirectory / ReadSafeFile 基于 SafeDir 提供列目录与读文件能力。

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::tools::{Capability, ObservationMode, ParamKind, ParamSpec, Parameters, ToolOutcome};

/// 沙箱目录
#[derive(Debug, Clone)]
pub struct SafeDir {
    root_dir: PathBuf,
}

impl SafeDir {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn exists(&self) -> bool {
        self.root_dir.is_dir()
    }

    /// 解析文件名：必须是沙箱内已存在的路径
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, String> {
        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err("Error: Invalid filename. Directory traversal is not permitted.".to_string());
        }
        let root = self
            .root_dir
            .canonicalize()
            .map_err(|_| "Error: The designated safe directory is missing.".to_string())?;
        let canonical = root
            .join(filename)
            .canonicalize()
            .map_err(|_| format!("Error: File '{filename}' not found in the designated area."))?;
        if canonical.starts_with(&root) {
            Ok(canonical)
        } else {
            // 指向沙箱外的符号链接
            Err("Error: Attempted access outside the designated area.".to_string())
        }
    }

    /// 目录中的文件名（不含子目录），已排序
    pub fn list_files(&self) -> std::io::Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                files.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// list_safe_directory：列出沙箱目录中的文件
pub struct ListSafeDirectory {
    dir: SafeDir,
}

impl ListSafeDirectory {
    pub fn new(dir: SafeDir) -> Self {
        Self { dir }
    }
}

impl Capability for ListSafeDirectory {
    fn name(&self) -> &str {
        "list_safe_directory"
    }

    fn description(&self) -> &str {
        "List the files in the designated safe directory. Takes no parameters."
    }

    fn invoke(&self, _params: &Parameters) -> anyhow::Result<ToolOutcome> {
        if !self.dir.exists() {
            return Ok(ToolOutcome::failure(format!(
                "Error: The designated directory '{}' is missing.",
                self.dir.root().display()
            )));
        }
        tracing::info!(dir = %self.dir.root().display(), "list_safe_directory");
        match self.dir.list_files() {
            Ok(files) if files.is_empty() => Ok(ToolOutcome::success("Result: The directory is empty.")),
            Ok(files) => Ok(ToolOutcome::success(format!("Result: Files found: {}", files.join(", ")))),
            Err(e) => Ok(ToolOutcome::failure(format!("Error: Could not access directory: {e}"))),
        }
    }
}

/// read_safe_file：读取沙箱内文件的前 limit 个字符
pub struct ReadSafeFile {
    dir: SafeDir,
    limit: usize,
}

impl ReadSafeFile {
    pub fn new(dir: SafeDir, limit: usize) -> Self {
        Self { dir, limit }
    }
}

impl Capability for ReadSafeFile {
    fn name(&self) -> &str {
        "read_safe_file"
    }

    fn description(&self) -> &str {
        "Read a text file from the designated safe directory. Only plain file names are accepted."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "filename",
            ParamKind::Path,
            "name of a file inside the safe directory, e.g. notes.txt",
        )]
    }

    fn observation(&self) -> ObservationMode {
        ObservationMode::Redacted { target_param: "filename" }
    }

    fn invoke(&self, params: &Parameters) -> anyhow::Result<ToolOutcome> {
        let filename = params.get("filename").and_then(|v| v.as_str()).unwrap_or_default();
        tracing::info!(filename = %filename, "read_safe_file");

        let path = match self.dir.resolve(filename) {
            Ok(p) => p,
            Err(msg) => return Ok(ToolOutcome::failure(msg)),
        };
        if !path.is_file() {
            return Ok(ToolOutcome::failure(format!("Error: '{filename}' is not a file.")));
        }

        // 前 limit + 1 个字符最多占 (limit + 1) * 4 字节，多读一个字符用于判断是否截断
        let budget = (self.limit as u64 + 1) * 4;
        let mut bytes = Vec::new();
        if let Err(e) = std::fs::File::open(&path).and_then(|f| f.take(budget).read_to_end(&mut bytes)) {
            return Ok(ToolOutcome::failure(format!("Error: Could not read file '{filename}': {e}")));
        }
        let content = String::from_utf8_lossy(&bytes);
        Ok(ToolOutcome::success(truncate_chars(&content, self.limit)))
    }
}

/// 按字符截断，超出时追加截断标记
fn truncate_chars(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}\n...(file truncated)", &content[..idx]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::OutcomeStatus;
    use serde_json::json;

    fn params(v: serde_json::Value) -> Parameters {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_list_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let tool = ListSafeDirectory::new(SafeDir::new(dir.path()));
        let out = tool.invoke(&Parameters::new()).unwrap();
        assert_eq!(out.text, "Result: Files found: a.txt, b.txt");
    }

    #[test]
    fn test_list_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListSafeDirectory::new(SafeDir::new(dir.path()));
        assert_eq!(tool.invoke(&Parameters::new()).unwrap().text, "Result: The directory is empty.");

        let missing = ListSafeDirectory::new(SafeDir::new(dir.path().join("nope")));
        assert_eq!(missing.invoke(&Parameters::new()).unwrap().status, OutcomeStatus::Failure);
    }

    #[test]
    fn test_read_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadSafeFile::new(SafeDir::new(dir.path()), 2000);
        for bad in ["../etc/passwd", "/etc/passwd", "sub\\x.txt", "a/b.txt"] {
            let out = tool.invoke(&params(json!({ "filename": bad }))).unwrap();
            assert_eq!(out.status, OutcomeStatus::Failure, "{bad}");
        }
    }

    #[test]
    fn test_read_missing_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let tool = ReadSafeFile::new(SafeDir::new(dir.path()), 2000);
        let missing = tool.invoke(&params(json!({"filename": "ghost.txt"}))).unwrap();
        assert!(missing.text.contains("not found"));
        let sub = tool.invoke(&params(json!({"filename": "sub"}))).unwrap();
        assert_eq!(sub.status, OutcomeStatus::Failure);
    }

    #[test]
    fn test_read_truncates_by_chars() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("long.txt"), "äöü".repeat(10)).unwrap();
        std::fs::write(dir.path().join("short.txt"), "hey").unwrap();
        std::fs::write(dir.path().join("exact.txt"), "four").unwrap();
        let tool = ReadSafeFile::new(SafeDir::new(dir.path()), 4);
        let out = tool.invoke(&params(json!({"filename": "long.txt"}))).unwrap();
        assert_eq!(out.text, "äöüä\n...(file truncated)");
        let out = tool.invoke(&params(json!({"filename": "short.txt"}))).unwrap();
        assert_eq!(out.text, "hey");
        assert!(out.is_success());
        let out = tool.invoke(&params(json!({"filename": "exact.txt"}))).unwrap();
        assert_eq!(out.text, "four");
    }

    #[test]
    fn test_read_non_utf8_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("latin1.txt"), b"caf\xe9 notes").unwrap();
        let tool = ReadSafeFile::new(SafeDir::new(dir.path()), 2000);
        let out = tool.invoke(&params(json!({"filename": "latin1.txt"}))).unwrap();
        assert!(out.is_success());
        assert_eq!(out.text, "caf\u{FFFD} notes");
    }

    #[test]
    fn test_read_large_file_keeps_prefix_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(1_000_000)).unwrap();
        let tool = ReadSafeFile::new(SafeDir::new(dir.path()), 10);
        let out = tool.invoke(&params(json!({"filename": "big.txt"}))).unwrap();
        assert_eq!(out.text, format!("{}\n...(file truncated)", "x".repeat(10)));
    }

    #[test]
    fn test_read_is_redacted_in_observations() {
        let tool = ReadSafeFile::new(SafeDir::new("."), 10);
        assert_eq!(tool.observation(), ObservationMode::Redacted { target_param: "filename" });
    }
}
