//! # Qdiffract - 晶体衍射计算工具
//!
//! 从 CIF 出发：对称操作 → 原子轨道与 hkl 星 → 结构因子 → Bragg 位置，
//! 并提供峰形展宽、图谱导出与精修参数表。
//!
//! ## 子命令
//! - `symmetry` - 空间群与倒易空间操作
//! - `atoms`    - 原子轨道展开
//! - `star`     - 单个 hkl 的等价星
//! - `bragg`    - 衍射分组与 Bragg 位置文件（支持批量）
//! - `pattern`  - 展宽图谱导出 (CSV/XY)
//! - `params`   - 精修参数表
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/     (CIF 解析)
//!   │     ├── symmetry/    (操作、轨道、消光)
//!   │     ├── scattering/  (原子散射因子)
//!   │     ├── diffraction/ (结构因子、分组、Bragg 位置、峰形)
//!   │     └── models/      (晶体结构与参数表)
//!   ├── batch/      (批量并行处理)
//!   ├── config.rs   (容差与生成配置)
//!   ├── utils/      (输出与进度条)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod config;
mod diffraction;
mod error;
mod models;
mod parsers;
mod scattering;
mod symmetry;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
