//! # 电子散射因子
//!
//! Mott–Bethe 公式：`f_e(s) = (Z − f_x(s)) / (8π² a₀ s²)`，s = sin θ/λ。
//!
//! κ 模型：X 射线因子由核心曲线与价层曲线组成，
//! `f_x(s) = f_core(s) + Σ Pᵢ·f_val,ᵢ(s/κᵢ)`。
//!
//! s = 0 时 Mott–Bethe 发散，作为前置条件违规报错（(0,0,0) 衍射不参与计算）。
//!
//! ## 依赖关系
//! - 使用 `scattering/xray.rs`、`scattering/curves.rs`、`scattering/coppens.rs`

use crate::error::{QdiffractError, Result};
use crate::scattering::coppens::CoppensAtom;
use crate::scattering::curves::TabulatedCurve;
use crate::scattering::xray;

use std::f64::consts::PI;

/// Bohr 半径（Å）
pub const BOHR_RADIUS: f64 = 0.529177210544;

/// Mott–Bethe 变换
pub fn mott_bethe(z: f64, f_x: f64, stl: f64) -> Result<f64> {
    if !(stl > 0.0) {
        return Err(QdiffractError::ZeroScatteringVector { stl });
    }
    Ok((z - f_x) / (8.0 * PI * PI * BOHR_RADIUS * stl * stl))
}

/// 由 Cromer–Mann X 射线因子得到的电子散射因子
pub fn electron_factor(element: &str, stl: f64) -> Result<f64> {
    let params = xray::lookup(element)?;
    mott_bethe(params.z as f64, params.evaluate(stl), stl)
}

/// κ 模型中的一个价层
#[derive(Debug, Clone)]
pub struct KappaShell {
    pub name: String,
    pub curve: TabulatedCurve,
    /// 布居数 P
    pub population: f64,
    /// 膨胀/收缩系数 κ
    pub kappa: f64,
}

/// κ 模型原子
#[derive(Debug, Clone)]
pub struct KappaAtom {
    pub element: String,
    pub z: f64,
    pub core: TabulatedCurve,
    pub shells: Vec<KappaShell>,
}

impl KappaAtom {
    /// 由 Coppens 数据构建：P 取合并价层布居数，κ = 1
    pub fn from_coppens(atom: &CoppensAtom) -> Self {
        let z = xray::atomic_number(&atom.element)
            .map(|z| z as f64)
            .unwrap_or_else(|_| atom.total_population());
        let shells = atom
            .valence
            .iter()
            .map(|(name, curve)| KappaShell {
                name: name.clone(),
                curve: curve.clone(),
                population: atom.valence_population(name),
                kappa: 1.0,
            })
            .collect();
        Self {
            element: atom.element.clone(),
            z,
            core: atom.core.clone(),
            shells,
        }
    }

    fn shell_mut(&mut self, name: &str) -> Result<&mut KappaShell> {
        let element = self.element.clone();
        self.shells
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                QdiffractError::InvalidArgument(format!(
                    "no valence shell '{}' for {}",
                    name, element
                ))
            })
    }

    pub fn set_population(&mut self, shell: &str, population: f64) -> Result<()> {
        self.shell_mut(shell)?.population = population;
        Ok(())
    }

    pub fn set_kappa(&mut self, shell: &str, kappa: f64) -> Result<()> {
        if !(kappa > 0.0) {
            return Err(QdiffractError::InvalidArgument(format!(
                "kappa must be positive, got {}",
                kappa
            )));
        }
        self.shell_mut(shell)?.kappa = kappa;
        Ok(())
    }

    /// X 射线因子 `f_core(s) + Σ P·f_val(s/κ)`
    pub fn xray_factor(&self, stl: f64) -> f64 {
        self.shells.iter().fold(self.core.evaluate(stl), |f, shell| {
            f + shell.population * shell.curve.evaluate(stl / shell.kappa)
        })
    }

    /// 电子散射因子（Mott–Bethe）
    pub fn electron_factor(&self, stl: f64) -> Result<f64> {
        mott_bethe(self.z, self.xray_factor(stl), stl)
    }
}
