//! # 对称性模块
//!
//! 从 CIF 显式操作或空间群编号推导空间群操作，并提供原子轨道展开、
//! 倒易空间（点群）操作和系统消光规则。
//!
//! ## 子模块
//! - `operation`: 对称操作值对象与 `x,y,z` 字符串解析器
//! - `spacegroups`: 内置空间群数据库（生成元 + 心化平移，闭包生成）
//! - `store`: 空间群操作集合、去重与倒易操作推导
//! - `orbit`: 原子位置展开与周期性边界去重
//! - `extinction`: 由操作推导的系统消光规则
//!
//! ## 依赖关系
//! - 被 `diffraction/` 和 `commands/` 使用
//! - 使用 `config.rs` 的容差

pub mod extinction;
pub mod operation;
pub mod orbit;
pub mod spacegroups;
pub mod store;

pub use extinction::ExtinctionRule;
pub use operation::SymmetryOperation;
pub use orbit::{expand_position, pbc_distance, Orbit};
pub use store::{dedup_operations, reciprocal_operations, SymmetryStore};

use std::fmt;

/// 数值容差提示
///
/// 等价性判定落在容差边界附近，或轨道大小与群阶不整除时产生；
/// 不中断计算，由命令层以警告形式输出。
#[derive(Debug, Clone, PartialEq)]
pub enum ToleranceAdvisory {
    /// 两个位置的最小像距离落在 `tol·(1 ± band)` 内
    AmbiguousEquivalence {
        context: String,
        distance: f64,
        tolerance: f64,
    },
    /// 轨道大小不整除群阶（通常意味着坐标精度不足或容差不当）
    OrbitSizeMismatch {
        context: String,
        orbit_size: usize,
        group_order: usize,
    },
}

impl fmt::Display for ToleranceAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToleranceAdvisory::AmbiguousEquivalence {
                context,
                distance,
                tolerance,
            } => write!(
                f,
                "{}: distance {:.6} is within the boundary band of tolerance {}",
                context, distance, tolerance
            ),
            ToleranceAdvisory::OrbitSizeMismatch {
                context,
                orbit_size,
                group_order,
            } => write!(
                f,
                "{}: orbit size {} does not divide group order {}",
                context, orbit_size, group_order
            ),
        }
    }
}
