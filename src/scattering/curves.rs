//! # 表格化散射曲线
//!
//! `{x: sin θ/λ, y: 振幅}` 曲线，二次插值：取离查询点最近的三个节点做局部
//! Lagrange 插值，超出范围时用端部三点外推（κ < 1 时需要）。

use crate::error::{QdiffractError, Result};

/// Coppens 数据的网格步长（Å⁻¹）
pub const GRID_STEP: f64 = 0.05;

/// 表格化曲线
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedCurve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TabulatedCurve {
    /// 由节点构建，要求 x 严格递增且至少 3 个点
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(QdiffractError::InvalidArgument(format!(
                "curve has {} x values but {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 3 {
            return Err(QdiffractError::InvalidArgument(
                "quadratic interpolation needs at least 3 points".to_string(),
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(QdiffractError::InvalidArgument(
                "curve x values must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { x, y })
    }

    /// 等间距网格 `x = step·i`
    pub fn on_grid(y: Vec<f64>, step: f64) -> Result<Self> {
        let x = (0..y.len()).map(|i| step * i as f64).collect();
        Self::new(x, y)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 二次插值（含外推）
    pub fn evaluate(&self, s: f64) -> f64 {
        let n = self.x.len();
        // 第一个 x > s 的位置
        let upper = self.x.partition_point(|&xi| xi <= s);
        let start = upper.saturating_sub(2).min(n - 3);

        let (x0, x1, x2) = (self.x[start], self.x[start + 1], self.x[start + 2]);
        let (y0, y1, y2) = (self.y[start], self.y[start + 1], self.y[start + 2]);

        let l0 = (s - x1) * (s - x2) / ((x0 - x1) * (x0 - x2));
        let l1 = (s - x0) * (s - x2) / ((x1 - x0) * (x1 - x2));
        let l2 = (s - x0) * (s - x1) / ((x2 - x0) * (x2 - x1));
        y0 * l0 + y1 * l1 + y2 * l2
    }
}
