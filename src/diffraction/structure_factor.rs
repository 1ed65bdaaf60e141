//! # 结构因子计算
//!
//! `F(hkl) = Σ_原子 Σ_轨道 f_j(s)·occ_j·exp(2πi(hx + ky + lz))·DW_j·ADP_j`
//!
//! 原子轨道在构建时由对称操作展开一次；之后对每个 hkl 的计算只读，
//! 可在 rayon 线程间共享。
//!
//! ## 依赖关系
//! - 被 `diffraction/hkl.rs` 和 `commands/` 使用
//! - 使用 `symmetry/orbit.rs` 展开位置
//! - 使用 `scattering/` 获取原子散射因子
//! - 使用 `num_complex` 进行复数运算

use crate::config::Tolerances;
use crate::diffraction::adp::DisplacementParameters;
use crate::diffraction::lattice::sin_theta_over_lambda;
use crate::error::Result;
use crate::models::{CellParameters, Crystal, ParameterRegistry};
use crate::scattering::ScatteringModel;
use crate::symmetry::{Orbit, SymmetryStore, ToleranceAdvisory};

use num_complex::Complex64;
use std::f64::consts::PI;

/// 展开后的原子位点
#[derive(Debug, Clone)]
pub struct ExpandedSite {
    pub label: String,
    pub element: String,
    pub occupancy: f64,
    pub adp: DisplacementParameters,
    pub positions: Vec<[f64; 3]>,
}

/// 结构因子模型：晶胞 + 展开后的全部原子
#[derive(Debug, Clone)]
pub struct StructureModel {
    pub cell: CellParameters,
    pub sites: Vec<ExpandedSite>,
    pub biso_overall: f64,
}

impl StructureModel {
    /// 用对称操作展开晶相中的所有位点，返回模型与容差提示
    pub fn build(
        crystal: &Crystal,
        store: &SymmetryStore,
        tolerances: &Tolerances,
    ) -> (Self, Vec<ToleranceAdvisory>) {
        let mut advisories = Vec::new();
        let sites = crystal
            .atoms
            .iter()
            .map(|atom| {
                let (orbit, notes) =
                    Orbit::from_site(atom, store.operations(), store.group_order(), tolerances);
                advisories.extend(notes);
                ExpandedSite {
                    label: atom.label.clone(),
                    element: atom.element.clone(),
                    occupancy: atom.occupancy,
                    adp: atom.adp.clone(),
                    positions: orbit.positions,
                }
            })
            .collect();

        (
            Self {
                cell: crystal.cell,
                sites,
                biso_overall: 0.0,
            },
            advisories,
        )
    }

    /// 以参数注册表中的值重建模型（晶胞、位置、占有率、ADP、全局 Biso）
    pub fn from_registry(
        crystal: &Crystal,
        store: &SymmetryStore,
        registry: &ParameterRegistry,
        phase: u32,
        tolerances: &Tolerances,
    ) -> (Self, Vec<ToleranceAdvisory>) {
        let updated = registry.apply_to_crystal(crystal, phase);
        let (mut model, advisories) = Self::build(&updated, store, tolerances);
        if let Some(biso) = registry.global_value(phase, crate::models::GlobalAttribute::BisoOverall)
        {
            model.biso_overall = biso;
        }
        (model, advisories)
    }

    pub fn with_biso_overall(mut self, biso_overall: f64) -> Self {
        self.biso_overall = biso_overall;
        self
    }

    /// 晶胞内原子总数
    pub fn atom_count(&self) -> usize {
        self.sites.iter().map(|s| s.positions.len()).sum()
    }

    /// 复结构因子 F(hkl)
    pub fn structure_factor(&self, hkl: [i32; 3], scattering: &ScatteringModel) -> Result<Complex64> {
        let stl = if hkl == [0, 0, 0] {
            0.0
        } else {
            sin_theta_over_lambda(self.cell.d_spacing(hkl)?)
        };
        self.structure_factor_at(hkl, stl, scattering)
    }

    /// 已知 sin θ/λ 时的复结构因子
    pub fn structure_factor_at(
        &self,
        hkl: [i32; 3],
        stl: f64,
        scattering: &ScatteringModel,
    ) -> Result<Complex64> {
        let h = [hkl[0] as f64, hkl[1] as f64, hkl[2] as f64];
        let mut total = Complex64::new(0.0, 0.0);

        for site in &self.sites {
            let f = scattering.factor(&site.label, &site.element, stl)?;
            let geometric: Complex64 = site
                .positions
                .iter()
                .map(|r| Complex64::from_polar(1.0, 2.0 * PI * (h[0] * r[0] + h[1] * r[1] + h[2] * r[2])))
                .sum();
            let displacement = site.adp.factor(hkl, stl, self.biso_overall);
            total += geometric * displacement * (f * site.occupancy);
        }

        Ok(total)
    }

    /// |F(hkl)|²
    pub fn intensity(&self, hkl: [i32; 3], scattering: &ScatteringModel) -> Result<f64> {
        Ok(self.structure_factor(hkl, scattering)?.norm_sqr())
    }
}
