//! # 原子散射因子
//!
//! ## 子模块
//! - `xray`: Cromer–Mann X 射线散射因子与原子序数
//! - `electron`: Mott–Bethe 电子散射因子与 κ 模型
//! - `curves`: 表格化曲线与二次插值
//! - `coppens`: Coppens 格式数据读取
//!
//! ## 依赖关系
//! - 被 `diffraction/structure_factor.rs` 使用

pub mod coppens;
pub mod curves;
pub mod electron;
pub mod xray;

use crate::config::Radiation;
use crate::error::Result;
use crate::models::structure::clean_element_symbol;
use electron::KappaAtom;

use std::collections::HashMap;

/// 散射因子来源
///
/// κ 模型原子可按位点标签或元素符号登记。查找顺序：位点 → 元素 → Cromer–Mann 参数化。
#[derive(Debug, Clone, Default)]
pub struct ScatteringModel {
    radiation: Radiation,
    kappa_atoms: HashMap<String, KappaAtom>,
    site_atoms: HashMap<String, KappaAtom>,
}

impl ScatteringModel {
    pub fn new(radiation: Radiation) -> Self {
        Self {
            radiation,
            kappa_atoms: HashMap::new(),
            site_atoms: HashMap::new(),
        }
    }

    /// 登记 κ 模型原子
    pub fn with_kappa_atom(mut self, atom: KappaAtom) -> Self {
        self.kappa_atoms
            .insert(clean_element_symbol(&atom.element), atom);
        self
    }

    pub fn radiation(&self) -> Radiation {
        self.radiation
    }

    /// 为单个位点登记 κ 模型原子，优先于按元素登记的原子
    pub fn with_site_atom(mut self, label: &str, atom: KappaAtom) -> Self {
        self.site_atoms.insert(label.to_string(), atom);
        self
    }

    /// 按元素登记的 κ 模型原子
    pub fn kappa_atom(&self, element: &str) -> Option<&KappaAtom> {
        self.kappa_atoms.get(&clean_element_symbol(element))
    }

    /// 位点在 sin θ/λ 处的散射因子
    pub fn factor(&self, label: &str, element: &str, stl: f64) -> Result<f64> {
        let kappa = self
            .site_atoms
            .get(label)
            .or_else(|| self.kappa_atom(element));
        match (self.radiation, kappa) {
            (Radiation::XRay, Some(atom)) => Ok(atom.xray_factor(stl)),
            (Radiation::XRay, None) => xray::xray_factor(element, stl),
            (Radiation::Electron, Some(atom)) => atom.electron_factor(stl),
            (Radiation::Electron, None) => electron::electron_factor(element, stl),
        }
    }
}
