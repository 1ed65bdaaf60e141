//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `symmetry/`, `diffraction/`, `models/`, `utils/`
//! - 子模块: inspect, bragg, pattern, params

pub mod bragg;
pub mod inspect;
pub mod params;
pub mod pattern;

use crate::cli::Commands;
use crate::error::Result;
use crate::models::Crystal;
use crate::parsers;
use crate::scattering::coppens::read_coppens_file;
use crate::scattering::electron::KappaAtom;
use crate::symmetry::SymmetryStore;
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Symmetry(args) => inspect::execute_symmetry(args),
        Commands::Atoms(args) => inspect::execute_atoms(args),
        Commands::Star(args) => inspect::execute_star(args),
        Commands::Bragg(args) => bragg::execute(args),
        Commands::Pattern(args) => pattern::execute(args),
        Commands::Params(args) => params::execute(args),
    }
}

/// 读取晶相并构建对称操作集合
fn load_phase(input: &Path, matrix_tol: f64) -> Result<(Crystal, SymmetryStore)> {
    let crystal = parsers::parse_structure_file(input)?;
    let store = SymmetryStore::from_crystal(&crystal, matrix_tol)?;
    Ok((crystal, store))
}

/// 读取 Coppens 文件并转换为 κ 模型原子
fn load_kappa_atoms(paths: &[PathBuf]) -> Result<Vec<KappaAtom>> {
    paths
        .iter()
        .map(|path| -> Result<KappaAtom> {
            let atom = KappaAtom::from_coppens(&read_coppens_file(path)?);
            output::print_info(&format!(
                "κ model for {} from '{}' ({} valence shells)",
                atom.element,
                path.display(),
                atom.shells.len()
            ));
            Ok(atom)
        })
        .collect()
}

/// 格式化 Miller 指数
fn format_hkl(hkl: [i32; 3]) -> String {
    format!("({} {} {})", hkl[0], hkl[1], hkl[2])
}
