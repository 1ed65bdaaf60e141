//! # 系统消光规则
//!
//! 由空间群操作推导一般衍射条件：若存在操作 (R, t) 使 `Rᵀh = h` 且 `h·t` 不是整数，
//! 则 F(h) = exp(2πi h·t)·F(h) 迫使 F(h) = 0，该衍射系统消光。
//!
//! 心化平移（R = I）给出整体条件（如 F 心 h+k, h+l, k+l 全偶），
//! 螺旋轴与滑移面给出带状与轴向条件。
//!
//! ## 依赖关系
//! - 被 `symmetry/store.rs` 构造
//! - 被 `diffraction/hkl.rs` 使用

use crate::symmetry::operation::SymmetryOperation;

/// 一条消光条件：在 `Rᵀh = h` 的衍射上要求 `h·t ∈ ℤ`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Condition {
    rotation_t: [[i32; 3]; 3],
    translation: [f64; 3],
}

/// 由操作推导的消光规则
#[derive(Debug, Clone, Default)]
pub struct ExtinctionRule {
    conditions: Vec<Condition>,
    tolerance: f64,
}

impl ExtinctionRule {
    /// 不限制任何衍射的规则
    pub fn none() -> Self {
        Self::default()
    }

    /// 由空间群操作构建
    ///
    /// 平移为零（取模后）的操作不产生条件，被忽略。
    pub fn from_operations(ops: &[SymmetryOperation], tol: f64) -> Self {
        let tolerance = tol.max(1e-6);
        let mut conditions: Vec<Condition> = Vec::new();

        for op in ops {
            let op = op.normalized();
            if op.translation.iter().all(|t| t.abs() < tolerance) {
                continue;
            }
            let mut rotation_t = [[0i32; 3]; 3];
            for (i, row) in rotation_t.iter_mut().enumerate() {
                for (j, value) in row.iter_mut().enumerate() {
                    *value = op.rotation[j][i].round() as i32;
                }
            }
            let condition = Condition {
                rotation_t,
                translation: op.translation,
            };
            if !conditions.contains(&condition) {
                conditions.push(condition);
            }
        }

        Self {
            conditions,
            tolerance,
        }
    }

    /// 规则是否不含任何条件（P 格子、无螺旋轴和滑移面）
    pub fn is_trivial(&self) -> bool {
        self.conditions.is_empty()
    }

    /// 条件数量
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// 衍射 hkl 是否允许（未被系统消光）
    pub fn allows(&self, hkl: [i32; 3]) -> bool {
        !self.conditions.iter().any(|c| c.extinguishes(hkl, self.tolerance))
    }
}

impl Condition {
    fn extinguishes(&self, hkl: [i32; 3], tol: f64) -> bool {
        let m = &self.rotation_t;
        let image = [
            m[0][0] * hkl[0] + m[0][1] * hkl[1] + m[0][2] * hkl[2],
            m[1][0] * hkl[0] + m[1][1] * hkl[1] + m[1][2] * hkl[2],
            m[2][0] * hkl[0] + m[2][1] * hkl[1] + m[2][2] * hkl[2],
        ];
        if image != hkl {
            return false;
        }
        let phase = hkl[0] as f64 * self.translation[0]
            + hkl[1] as f64 * self.translation[1]
            + hkl[2] as f64 * self.translation[2];
        (phase - phase.round()).abs() > tol
    }
}
