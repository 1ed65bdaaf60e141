//! # params 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/params.rs`

use crate::cli::common::ToleranceArgs;
use crate::config::Radiation;
use crate::diffraction::ProfileKind;

use clap::Args;
use std::path::PathBuf;

/// params 子命令参数
#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Input CIF file
    pub input: PathBuf,

    /// Phase number used in parameter names
    #[arg(long, default_value_t = 1)]
    pub phase_id: u32,

    /// Bragg-position file providing per-reflection intensities and deltas
    #[arg(long)]
    pub bragg: Option<PathBuf>,

    /// Add anisotropic B tensors for every site
    #[arg(long, default_value_t = false)]
    pub anisotropic: bool,

    /// Anharmonic order (3..6) adding C, D, E, F tensors
    #[arg(long, default_value_t = 0)]
    pub anharmonic: u8,

    /// Coppens-format files adding κ-model parameters for matching sites
    #[arg(long, num_args = 1..)]
    pub coppens: Vec<PathBuf>,

    /// Add shape parameters of this peak profile
    #[arg(long, value_enum)]
    pub profile: Option<ProfileKind>,

    /// Number of background Legendre coefficients
    #[arg(long, default_value_t = 0)]
    pub background: usize,

    /// Parameters to mark as free, by name (e.g., "Phase1_a,Phase1_scale")
    #[arg(long, value_delimiter = ',')]
    pub vary: Vec<String>,

    /// Override values, clamped to bounds (e.g., "Phase1_Biso_overall=0.3")
    #[arg(long = "set", value_delimiter = ',')]
    pub assignments: Vec<String>,

    /// Evaluate |F|² of this reflection from the registry values, e.g., "1,1,1"
    #[arg(long, allow_hyphen_values = true)]
    pub hkl: Option<String>,

    /// Scattering factors used with --hkl
    #[arg(long, value_enum, default_value = "x-ray")]
    pub radiation: Radiation,

    /// Only list parameters marked to vary
    #[arg(long, default_value_t = false)]
    pub free: bool,

    #[command(flatten)]
    pub tolerance: ToleranceArgs,
}
