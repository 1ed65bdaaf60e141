//! # pattern 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/pattern.rs`

use crate::diffraction::ProfileKind;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 图谱输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PatternFormat {
    /// CSV data file (2θ, intensity)
    Csv,
    /// XY text file with a commented header
    Xy,
}

/// pattern 子命令参数
#[derive(Args, Debug)]
pub struct PatternArgs {
    /// Input Bragg-position file
    pub input: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "pattern.xy")]
    pub output: PathBuf,

    /// Output format (auto-detected from extension if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<PatternFormat>,

    /// Peak profile
    #[arg(long, value_enum, default_value = "gaussian")]
    pub profile: ProfileKind,

    /// Full width at half maximum, in degrees 2θ
    #[arg(long, default_value_t = 0.1)]
    pub fwhm: f64,

    /// Explicit shape parameters in profile order (overrides --fwhm)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub shape: Vec<f64>,

    /// Step size in degrees 2θ
    #[arg(long, default_value_t = 0.02)]
    pub step: f64,

    /// 2θ range in degrees (e.g., "5-90")
    #[arg(short, long, default_value = "5-90")]
    pub range: String,

    /// Only broaden rows of this phase
    #[arg(long)]
    pub phase_id: Option<u32>,

    /// Wavelength recorded in the XY header
    #[arg(short, long)]
    pub wavelength: Option<String>,

    /// Title recorded in the XY header (default: input file stem)
    #[arg(long)]
    pub title: Option<String>,
}
