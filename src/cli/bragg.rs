//! # bragg 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/bragg.rs`

use crate::batch::collector::DEFAULT_PATTERN;
use crate::cli::common::ToleranceArgs;
use crate::config::{HklMode, Radiation};

use clap::Args;
use std::path::PathBuf;

/// bragg 子命令参数
#[derive(Args, Debug)]
pub struct BraggArgs {
    /// Input: CIF file or directory containing CIF files
    pub input: PathBuf,

    /// Output: file path (single mode, default "Phase<N>_bragg_positions.txt") or directory (batch mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Wavelength: line name (cu-ka, mo-ka, ...), electron energy (200kev) or value in Å
    #[arg(short, long, default_value = "cu-ka")]
    pub wavelength: String,

    /// Maximum |h|, |k|, |l|
    #[arg(long, default_value_t = 10)]
    pub hkl_max: i32,

    /// Maximum diffraction angle 2θ in degrees
    #[arg(long)]
    pub two_theta_max: Option<f64>,

    /// Which reflections to generate
    #[arg(long, value_enum, default_value = "allowed")]
    pub mode: HklMode,

    /// Keep every hkl as its own group instead of merging symmetry equivalents
    #[arg(long, default_value_t = false)]
    pub individual: bool,

    /// Include the (0,0,0) reflection
    #[arg(long, default_value_t = false)]
    pub include_origin: bool,

    /// Scattering factors to use
    #[arg(long, value_enum, default_value = "x-ray")]
    pub radiation: Radiation,

    /// Phase number written to column 5
    #[arg(long, default_value_t = 1)]
    pub phase_id: u32,

    /// Overall isotropic displacement parameter added to every atom
    #[arg(long, default_value_t = 0.0)]
    pub biso_overall: f64,

    /// Coppens-format files enabling the κ model for their elements
    #[arg(long, num_args = 1..)]
    pub coppens: Vec<PathBuf>,

    /// Also export the stick pattern as CSV next to the Bragg file
    #[arg(long, default_value_t = false)]
    pub csv: bool,

    /// Number of groups to print in the summary table
    #[arg(long, default_value_t = 15)]
    pub top: usize,

    #[command(flatten)]
    pub tolerance: ToleranceArgs,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode, e.g., "*.cif,*.mcif")
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
