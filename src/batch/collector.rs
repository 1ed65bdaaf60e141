//! # 结构文件收集器
//!
//! 根据输入路径和 glob 模式收集待处理的 CIF 文件。
//!
//! ## 规则
//! - 输入为文件时直接返回该文件（不检查模式）
//! - 输入为目录时按文件名匹配，模式以逗号分隔，如 `"*.cif,*.mcif"`
//! - 非法模式被忽略；没有合法模式时匹配全部文件
//! - 结果按路径排序，保证批量输出顺序稳定
//!
//! ## 依赖关系
//! - 被 `commands/bragg.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 默认匹配模式
pub const DEFAULT_PATTERN: &str = "*.cif,*.mcif";

/// 文件收集器
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    recursive: bool,
}

impl FileCollector {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| Pattern::new(s).ok())
            .collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn is_single_file(&self) -> bool {
        self.input.is_file()
    }

    pub fn is_directory(&self) -> bool {
        self.input.is_dir()
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.is_single_file() {
            return vec![self.input.clone()];
        }
        if !self.is_directory() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_pattern_matching() {
        let collector = FileCollector::new(PathBuf::from(".")).with_pattern(DEFAULT_PATTERN);
        assert!(collector.matches(Path::new("NaCl.cif")));
        assert!(collector.matches(Path::new("dir/Fe3O4.mcif")));
        assert!(!collector.matches(Path::new("NaCl_bragg_positions.txt")));

        let collector = FileCollector::new(PathBuf::from(".")).with_pattern("phase?.cif");
        assert!(collector.matches(Path::new("phase1.cif")));
        assert!(!collector.matches(Path::new("phase12.cif")));
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.cif"), "data_b").unwrap();
        fs::write(dir.path().join("a.cif"), "data_a").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.cif"), "data_c").unwrap();

        let flat = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.cif")
            .collect();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.cif", "b.cif"]);

        let deep = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.cif")
            .recursive(true)
            .collect();
        assert_eq!(deep.len(), 3);

        let single = FileCollector::new(dir.path().join("notes.txt"))
            .with_pattern("*.cif")
            .collect();
        assert_eq!(single.len(), 1);
    }
}
