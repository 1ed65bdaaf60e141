//! # 晶体结构数据模型
//!
//! 定义由 CIF 解析得到的晶相表示：晶胞参数、原子位点以及显式对称操作。
//!
//! ## 依赖关系
//! - 被 `parsers/cif.rs` 构造
//! - 被 `symmetry/`、`diffraction/` 和 `commands/` 使用
//! - 使用 `diffraction/lattice.rs` 计算几何量

use crate::diffraction::adp::DisplacementParameters;
use crate::diffraction::lattice;
use crate::error::Result;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 晶胞参数 (a, b, c, alpha, beta, gamma)
/// 长度单位：Å，角度单位：度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl CellParameters {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        CellParameters {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    /// 立方晶胞
    pub fn cubic(a: f64) -> Self {
        Self::new(a, a, a, 90.0, 90.0, 90.0)
    }

    /// 六方晶胞
    pub fn hexagonal(a: f64, c: f64) -> Self {
        Self::new(a, a, c, 90.0, 90.0, 120.0)
    }

    /// 按 (a, b, c, alpha, beta, gamma) 顺序返回
    pub fn as_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.alpha, self.beta, self.gamma]
    }

    /// 晶面间距 d(hkl)
    pub fn d_spacing(&self, hkl: [i32; 3]) -> Result<f64> {
        lattice::d_spacing(
            hkl[0], hkl[1], hkl[2], self.a, self.b, self.c, self.alpha, self.beta, self.gamma,
        )
    }

    /// 晶胞体积（Å³）
    pub fn volume(&self) -> Result<f64> {
        lattice::cell_volume(self.a, self.b, self.c, self.alpha, self.beta, self.gamma)
    }
}

/// 原子位点（CIF 中给出的非对称单元位置）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomSite {
    /// 位点标签（如 "Ca1"）
    pub label: String,

    /// 元素符号（已去除氧化态与编号，如 "Ca2+" -> "Ca"）
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],

    /// 占有率
    pub occupancy: f64,

    /// 原子位移参数
    pub adp: DisplacementParameters,
}

impl AtomSite {
    pub fn new(label: impl Into<String>, element: &str, position: [f64; 3]) -> Self {
        AtomSite {
            label: label.into(),
            element: clean_element_symbol(element),
            position,
            occupancy: 1.0,
            adp: DisplacementParameters::default(),
        }
    }

    pub fn with_occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_biso(mut self, biso: f64) -> Self {
        self.adp.biso = biso;
        self
    }
}

/// 晶相
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶胞参数
    pub cell: CellParameters,

    /// 国际表空间群编号
    pub space_group_number: Option<u32>,

    /// 空间群符号（仅用于显示）
    pub space_group_symbol: Option<String>,

    /// CIF 中显式给出的对称操作（"x,y,z" 形式）
    pub symmetry_operations: Vec<String>,

    /// 非对称单元原子
    pub atoms: Vec<AtomSite>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, cell: CellParameters, atoms: Vec<AtomSite>) -> Self {
        Crystal {
            name: name.into(),
            cell,
            space_group_number: None,
            space_group_symbol: None,
            symmetry_operations: Vec::new(),
            atoms,
        }
    }

    pub fn with_space_group(mut self, number: u32) -> Self {
        self.space_group_number = Some(number);
        self
    }

    pub fn with_operations<S: AsRef<str>>(mut self, operations: &[S]) -> Self {
        self.symmetry_operations = operations.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }
}

static NON_LETTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z]").unwrap());

/// 去除元素符号中的非字母字符（编号、氧化态），如 "Ca2+" -> "Ca"，"O1" -> "O"
pub fn clean_element_symbol(raw: &str) -> String {
    NON_LETTERS.replace_all(raw, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_element_symbol() {
        assert_eq!(clean_element_symbol("Ca2+"), "Ca");
        assert_eq!(clean_element_symbol("O2-"), "O");
        assert_eq!(clean_element_symbol("Fe1"), "Fe");
        assert_eq!(clean_element_symbol("Si"), "Si");
    }

    #[test]
    fn test_cell_volume_cubic() {
        let cell = CellParameters::cubic(5.0);
        let vol = cell.volume().unwrap();

        // 5^3 = 125
        assert!((vol - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_cell_d_spacing_delegates() {
        let cell = CellParameters::cubic(5.0);
        let d = cell.d_spacing([1, 1, 1]).unwrap();
        assert!((d - 5.0 / 3.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_atom_site_builder() {
        let atom = AtomSite::new("Ca1", "Ca2+", [0.0, 0.0, 0.0])
            .with_occupancy(0.5)
            .with_biso(0.8);
        assert_eq!(atom.element, "Ca");
        assert_eq!(atom.label, "Ca1");
        assert!((atom.occupancy - 0.5).abs() < 1e-12);
        assert!((atom.adp.biso - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_crystal_builders() {
        let crystal = Crystal::new("NaCl", CellParameters::cubic(5.64), vec![])
            .with_space_group(225)
            .with_operations(&["x,y,z", "-x,-y,-z"]);
        assert_eq!(crystal.space_group_number, Some(225));
        assert_eq!(crystal.symmetry_operations.len(), 2);
    }
}
