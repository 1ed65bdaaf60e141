//! # 对称操作集合
//!
//! 每个晶相构建一次、之后只读的空间群操作集合：
//! - 来源：CIF 显式操作优先，其次按空间群编号查询内置数据库
//! - 去重：旋转与平移逐元素比较（矩阵容差）
//! - 倒易空间操作：清零平移 → 去重 → 并入 `R·(−I)` → 再去重
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `diffraction/` 使用
//! - 使用 `symmetry/operation.rs`、`symmetry/spacegroups.rs`、`symmetry/extinction.rs`

use crate::error::{QdiffractError, Result};
use crate::models::Crystal;
use crate::symmetry::extinction::ExtinctionRule;
use crate::symmetry::operation::SymmetryOperation;
use crate::symmetry::spacegroups;

/// 操作来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSource {
    /// CIF 中显式列出的操作
    Explicit,
    /// 内置数据库（空间群编号）
    Database(u32),
}

/// 空间群操作集合
#[derive(Debug, Clone)]
pub struct SymmetryStore {
    operations: Vec<SymmetryOperation>,
    reciprocal: Vec<SymmetryOperation>,
    source: OperationSource,
    tolerance: f64,
}

impl SymmetryStore {
    /// 由显式操作字符串构建
    pub fn from_strings<S: AsRef<str>>(operations: &[S], tol: f64) -> Result<Self> {
        if operations.is_empty() {
            return Err(QdiffractError::NoSymmetry);
        }
        let parsed = operations
            .iter()
            .map(|s| SymmetryOperation::parse(s.as_ref()).map(|op| op.normalized()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_operations(parsed, OperationSource::Explicit, tol))
    }

    /// 由空间群编号构建
    pub fn from_space_group(number: u32, tol: f64) -> Result<Self> {
        let ops = spacegroups::operations_for(number, tol)?;
        Ok(Self::from_operations(ops, OperationSource::Database(number), tol))
    }

    /// 由晶相构建：显式操作优先，否则使用空间群编号
    pub fn from_crystal(crystal: &Crystal, tol: f64) -> Result<Self> {
        if !crystal.symmetry_operations.is_empty() {
            return Self::from_strings(&crystal.symmetry_operations, tol);
        }
        match crystal.space_group_number {
            Some(number) => Self::from_space_group(number, tol),
            None => Err(QdiffractError::NoSymmetry),
        }
    }

    fn from_operations(ops: Vec<SymmetryOperation>, source: OperationSource, tol: f64) -> Self {
        let operations = dedup_operations(&ops, tol);
        let reciprocal = reciprocal_operations(&operations, tol);
        Self {
            operations,
            reciprocal,
            source,
            tolerance: tol,
        }
    }

    /// 空间群操作（已去重）
    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    /// 倒易空间操作（点群 + 反演，无平移）
    pub fn reciprocal_operations(&self) -> &[SymmetryOperation] {
        &self.reciprocal
    }

    pub fn source(&self) -> OperationSource {
        self.source
    }

    /// 晶胞内操作集的阶（晶格平移取模）
    ///
    /// 原胞设置下等于点群阶；心化设置下包含心化平移的倍数。
    pub fn group_order(&self) -> usize {
        self.operations.len()
    }

    /// 点群阶（不同旋转部分的数量）
    pub fn point_group_order(&self) -> usize {
        let rotations: Vec<SymmetryOperation> = self
            .operations
            .iter()
            .map(SymmetryOperation::without_translation)
            .collect();
        dedup_operations(&rotations, self.tolerance).len()
    }

    /// 是否含有反演中心（某操作旋转部分为 −I）
    pub fn is_centrosymmetric(&self) -> bool {
        self.operations.iter().any(SymmetryOperation::is_inversion)
    }

    /// 由操作推导的系统消光规则
    pub fn extinction_rule(&self) -> ExtinctionRule {
        ExtinctionRule::from_operations(&self.operations, self.tolerance)
    }
}

/// 去除重复操作（先出现者保留）
pub fn dedup_operations(ops: &[SymmetryOperation], tol: f64) -> Vec<SymmetryOperation> {
    let mut unique: Vec<SymmetryOperation> = Vec::with_capacity(ops.len());
    for op in ops {
        if !unique.iter().any(|u| u.approx_eq(op, tol)) {
            unique.push(*op);
        }
    }
    unique
}

/// 推导倒易空间（点群）操作：清零平移、去重、并入 `R·(−I)`、再去重
///
/// 结果总是对取负封闭，且对自身再次推导不变。
pub fn reciprocal_operations(ops: &[SymmetryOperation], tol: f64) -> Vec<SymmetryOperation> {
    let zeroed: Vec<SymmetryOperation> = ops
        .iter()
        .map(SymmetryOperation::without_translation)
        .collect();
    let mut combined = dedup_operations(&zeroed, tol);
    let inverted: Vec<SymmetryOperation> =
        combined.iter().map(SymmetryOperation::times_inversion).collect();
    combined.extend(inverted);
    dedup_operations(&combined, tol)
}
