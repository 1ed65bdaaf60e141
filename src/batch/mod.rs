//! # 批量处理模块
//!
//! 对目录中的 CIF 文件逐个生成 Bragg 位置。
//!
//! ## 功能
//! - 自动检测输入类型（文件/目录）
//! - 按 glob 模式收集结构文件
//! - rayon 并行处理，进度条反馈与失败汇总
//!
//! ## 依赖关系
//! - 被 `commands/bragg.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
