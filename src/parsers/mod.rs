//! # 解析器模块
//!
//! 提供晶体结构文件的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: cif

pub mod cif;

use crate::error::{QdiffractError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 从文件路径推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "cif" | "mcif" => cif::parse_cif_file(path),
        _ => Err(QdiffractError::InvalidArgument(format!(
            "Cannot determine structure format for: {} (expected .cif)",
            path.display()
        ))),
    }
}
