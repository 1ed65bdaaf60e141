//! # 计算配置
//!
//! 集中管理数值容差与 hkl 生成参数，避免在各调用点散落硬编码默认值。
//!
//! ## 默认容差
//! - 原子位置等价：最小像欧氏距离 < 0.005（分数坐标）
//! - d 间距分组：1e-5 Å
//! - 对称操作矩阵比较：1e-8
//! - 容差边界提示带宽：容差的 ±1%
//!
//! ## 依赖关系
//! - 被 `symmetry/`、`diffraction/` 和 `commands/` 使用
//! - 无外部模块依赖

use crate::error::{QdiffractError, Result};

/// 数值容差
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// 原子位置等价判据（分数坐标）
    pub position: f64,
    /// d 间距分组量化步长（Å）
    pub d_spacing: f64,
    /// 对称操作矩阵元素比较精度
    pub matrix: f64,
    /// 相对带宽：距离落在 `tol·(1 ± band)` 内时记录边界歧义提示
    pub boundary_band: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            position: 0.005,
            d_spacing: 1e-5,
            matrix: 1e-8,
            boundary_band: 0.01,
        }
    }
}

impl Tolerances {
    /// 检查容差是否有效（必须为正）
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("position", self.position),
            ("d-spacing", self.d_spacing),
            ("matrix", self.matrix),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(QdiffractError::InvalidArgument(format!(
                    "{} tolerance must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.boundary_band < 0.0 {
            return Err(QdiffractError::InvalidArgument(format!(
                "boundary band must be non-negative, got {}",
                self.boundary_band
            )));
        }
        Ok(())
    }
}

/// hkl 生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HklMode {
    /// 仅允许的衍射（应用消光规则）
    #[default]
    Allowed,
    /// 仅被消光规则禁止的衍射
    Forbidden,
    /// 不检查消光规则
    All,
}

/// 散射类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Radiation {
    /// X 射线（Cromer–Mann 参数化）
    #[default]
    XRay,
    /// 电子（Mott–Bethe 公式）
    Electron,
}

/// Bragg 位置生成配置
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// 波长（Å）
    pub wavelength: f64,
    /// |h|, |k|, |l| 的最大值
    pub hkl_max: i32,
    /// 最大衍射角 2θ（度），None 表示不限制
    pub two_theta_max: Option<f64>,
    /// 生成模式
    pub mode: HklMode,
    /// 每个 hkl 单独成组（不合并对称等价衍射）
    pub individual: bool,
    /// 是否包含 (0,0,0)
    pub include_origin: bool,
    /// 散射类型
    pub radiation: Radiation,
    /// 相编号（写入 Bragg 行第 5 列）
    pub phase_id: u32,
    /// 全局各向同性温度因子
    pub biso_overall: f64,
    /// 数值容差
    pub tolerances: Tolerances,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            wavelength: 1.5418,
            hkl_max: 10,
            two_theta_max: None,
            mode: HklMode::Allowed,
            individual: false,
            include_origin: false,
            radiation: Radiation::XRay,
            phase_id: 1,
            biso_overall: 0.0,
            tolerances: Tolerances::default(),
        }
    }
}

impl GenerationConfig {
    /// 检查配置合法性
    pub fn validate(&self) -> Result<()> {
        if !(self.wavelength > 0.0) || !self.wavelength.is_finite() {
            return Err(QdiffractError::InvalidArgument(format!(
                "wavelength must be positive, got {}",
                self.wavelength
            )));
        }
        if self.hkl_max < 1 {
            return Err(QdiffractError::InvalidArgument(format!(
                "hkl_max must be at least 1, got {}",
                self.hkl_max
            )));
        }
        if let Some(max) = self.two_theta_max {
            if !(max > 0.0 && max <= 180.0) {
                return Err(QdiffractError::InvalidRange(format!(
                    "2θ max {} (must be 0 < max <= 180)",
                    max
                )));
            }
        }
        self.tolerances.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerances() {
        let tol = Tolerances::default();
        assert_eq!(tol.position, 0.005);
        assert_eq!(tol.d_spacing, 1e-5);
        assert!(tol.validate().is_ok());
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let tol = Tolerances {
            position: 0.0,
            ..Tolerances::default()
        };
        assert!(tol.validate().is_err());
    }

    #[test]
    fn test_generation_config_validation() {
        let mut config = GenerationConfig::default();
        assert!(config.validate().is_ok());

        config.wavelength = -1.0;
        assert!(config.validate().is_err());

        config.wavelength = 1.0;
        config.two_theta_max = Some(200.0);
        assert!(config.validate().is_err());
    }
}
