//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `symmetry`: 空间群操作与倒易空间操作
//! - `atoms`: 原子轨道展开
//! - `star`: 单个 hkl 的等价星
//! - `bragg`: 生成衍射组并写出 Bragg 位置文件（支持批量目录）
//! - `pattern`: 由 Bragg 位置文件生成展宽图谱
//! - `params`: 构建并列出精修参数表
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, inspect, bragg, pattern, params

pub mod bragg;
pub mod common;
pub mod inspect;
pub mod params;
pub mod pattern;

use clap::{Parser, Subcommand};

/// Qdiffract - 晶体衍射 Bragg 位置与强度计算工具
#[derive(Parser)]
#[command(name = "qdiffract")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Crystallographic diffraction toolkit: symmetry, structure factors and Bragg positions", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Show space-group and reciprocal-space operations of a CIF phase
    Symmetry(inspect::SymmetryArgs),

    /// Expand asymmetric-unit sites into full orbits
    Atoms(inspect::AtomsArgs),

    /// Show the symmetry-equivalent star of one reflection
    Star(inspect::StarArgs),

    /// Generate reflection groups and write the Bragg-position file
    Bragg(bragg::BraggArgs),

    /// Broaden a Bragg-position file with a peak profile
    Pattern(pattern::PatternArgs),

    /// Build and list the refinement parameter registry of a phase
    Params(params::ParamsArgs),
}
