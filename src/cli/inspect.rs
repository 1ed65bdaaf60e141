//! # 结构检查子命令 CLI 定义
//!
//! - `symmetry`: 列出操作
//! - `atoms`: 列出轨道
//! - `star`: 列出单个 hkl 的等价星
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inspect.rs`

use crate::cli::common::ToleranceArgs;
use crate::config::HklMode;

use clap::Args;
use std::path::PathBuf;

/// symmetry 子命令参数
#[derive(Args, Debug)]
pub struct SymmetryArgs {
    /// Input CIF file
    pub input: PathBuf,

    /// Also list the reciprocal-space (point group + inversion) operations
    #[arg(long, default_value_t = false)]
    pub reciprocal: bool,

    #[command(flatten)]
    pub tolerance: ToleranceArgs,
}

/// atoms 子命令参数
#[derive(Args, Debug)]
pub struct AtomsArgs {
    /// Input CIF file
    pub input: PathBuf,

    /// Only print the orbit summary, not every position
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    #[command(flatten)]
    pub tolerance: ToleranceArgs,
}

/// star 子命令参数
#[derive(Args, Debug)]
pub struct StarArgs {
    /// Input CIF file
    pub input: PathBuf,

    /// Miller indices, e.g., "1,1,0"
    #[arg(long, allow_hyphen_values = true)]
    pub hkl: String,

    /// Wavelength: line name (cu-ka, mo-ka, ...), electron energy (200kev) or value in Å
    #[arg(short, long, default_value = "cu-ka")]
    pub wavelength: String,

    /// Extinction handling: allowed drops absent members, forbidden/all keep them
    #[arg(long, value_enum, default_value = "allowed")]
    pub mode: HklMode,

    #[command(flatten)]
    pub tolerance: ToleranceArgs,
}
