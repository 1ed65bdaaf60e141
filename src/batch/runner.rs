//! # 批量执行器
//!
//! 在独立的 rayon 线程池中并行处理结构文件，汇总成功/跳过/失败统计。
//!
//! ## 依赖关系
//! - 被 `commands/bragg.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条，`utils/output.rs` 打印汇总
//! - 使用 `rayon` 进行并行计算

use crate::utils::{output, progress};

use rayon::prelude::*;
use std::path::PathBuf;

/// 汇总中最多列出的失败文件数
const MAX_LISTED_FAILURES: usize = 10;

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    Success(String),
    /// 跳过（如输出已存在）
    Skipped(String),
    /// (文件路径, 错误信息)
    Failed(String, String),
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    /// 打印统计与前若干个失败文件
    pub fn report(&self) {
        output::print_separator();
        output::print_done(&format!(
            "Batch complete: {} files, {} success, {} skipped, {} failed",
            self.total(),
            self.success,
            self.skipped,
            self.failed
        ));

        if !self.failures.is_empty() {
            output::print_warning("Failed files:");
            for (path, err) in self.failures.iter().take(MAX_LISTED_FAILURES) {
                output::print_error(&format!("  {}: {}", path, err));
            }
            if self.failures.len() > MAX_LISTED_FAILURES {
                output::print_warning(&format!(
                    "  ... and {} more",
                    self.failures.len() - MAX_LISTED_FAILURES
                ));
            }
        }
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// `jobs == 0` 时使用全部 CPU 核数
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    /// 并行处理文件列表
    ///
    /// 专用线程池创建失败时退回全局线程池。
    pub fn run<F>(&self, files: Vec<PathBuf>, processor: F) -> BatchResult
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Generating Bragg positions");

        let work = || -> Vec<ProcessResult> {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(_) => work(),
        };

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        batch_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_counts() {
        let mut result = BatchResult::default();
        result.merge(ProcessResult::Success("a".into()));
        result.merge(ProcessResult::Skipped("b".into()));
        result.merge(ProcessResult::Failed("c.cif".into(), "bad cell".into()));
        assert_eq!(result.total(), 3);
        assert_eq!(result.failures, vec![("c.cif".to_string(), "bad cell".to_string())]);
    }

    #[test]
    fn test_run_processes_every_file() {
        let files: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("p{}.cif", i))).collect();
        let result = BatchRunner::new(2).run(files, |path| {
            if path.to_string_lossy().contains('3') {
                ProcessResult::Failed(path.display().to_string(), "boom".into())
            } else {
                ProcessResult::Success(path.display().to_string())
            }
        });
        assert_eq!(result.success, 7);
        assert_eq!(result.failed, 1);
    }
}
